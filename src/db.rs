use std::{future::Future, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::warn;

use crate::{config::AppConfig, error::StoreError};

const READ_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(50);

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("connect to database")
}

/// Maps unique-constraint names from `migrations/` to the user-facing field.
fn constraint_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("username") => "username",
        Some(c) if c.contains("email") => "email",
        _ => "record",
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            StoreError::DuplicateKey {
                field: constraint_field(db.constraint()),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Query(other.to_string()),
    }
}

/// Runs one store call under a deadline.
pub(crate) async fn bounded<T, Fut>(timeout: Duration, fut: Fut) -> Result<T, StoreError>
where
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res.map_err(map_sqlx_error),
        Err(_) => Err(StoreError::Unavailable(format!(
            "store call exceeded {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Retries an idempotent read on transient failures with exponential backoff.
pub(crate) async fn retry_read<T, F, Fut>(timeout: Duration, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut attempt = 0;
    loop {
        match bounded(timeout, op()).await {
            Err(e) if e.is_retryable() && attempt + 1 < READ_ATTEMPTS => {
                let delay = BACKOFF_BASE * 2u32.pow(attempt);
                warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying store read");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            res => return res,
        }
    }
}
