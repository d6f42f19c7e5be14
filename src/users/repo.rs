use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{bounded, retry_read},
    error::StoreError,
    users::repo_types::{ProfileUpdate, User},
};

/// Credential store. Uniqueness of `username` and `email` is enforced here,
/// never by a read-then-write in the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError>;
}

const USER_COLUMNS: &str = "id, username, email, image_file, password_hash";

pub struct PgUserStore {
    db: PgPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn find_one(&self, column: &str, value: String) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = $1");
        retry_read(self.timeout, || {
            sqlx::query_as::<_, User>(&sql)
                .bind(value.clone())
                .fetch_optional(&self.db)
        })
        .await
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        bounded(
            self.timeout,
            sqlx::query_as::<_, User>(&sql)
                .bind(username)
                .bind(email)
                .bind(password_hash)
                .fetch_one(&self.db),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        retry_read(self.timeout, || {
            sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.db)
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.find_one("email", email.to_string()).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.find_one("username", username.to_string()).await
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let res = bounded(
            self.timeout,
            sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.db),
        )
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User, StoreError> {
        // unique constraints re-check the changed columns against every other row
        let sql = format!(
            r#"
            UPDATE users
               SET username   = COALESCE($2, username),
                   email      = COALESCE($3, email),
                   image_file = COALESCE($4, image_file)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        bounded(
            self.timeout,
            sqlx::query_as::<_, User>(&sql)
                .bind(id)
                .bind(update.username)
                .bind(update.email)
                .bind(update.image_file)
                .fetch_one(&self.db),
        )
        .await
    }
}
