use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{bounded, retry_read},
    error::StoreError,
    posts::repo_types::Post,
};

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, author: Uuid, title: &str, content: &str)
        -> Result<Post, StoreError>;
    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError>;
    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> Result<Post, StoreError>;
    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError>;
    /// Newest first. Returns the slice and the total row count.
    async fn list_recent(&self, offset: u64, limit: u64) -> Result<(Vec<Post>, u64), StoreError>;
    async fn list_by_author(
        &self,
        author: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Post>, u64), StoreError>;
}

const POST_COLUMNS: &str = "id, title, content, date_posted, user_id";

pub struct PgPostStore {
    db: PgPool,
    timeout: Duration,
}

impl PgPostStore {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl PostStore for PgPostStore {
    async fn create_post(
        &self,
        author: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Post, StoreError> {
        let sql = format!(
            "INSERT INTO posts (title, content, user_id) VALUES ($1, $2, $3) RETURNING {POST_COLUMNS}"
        );
        bounded(
            self.timeout,
            sqlx::query_as::<_, Post>(&sql)
                .bind(title)
                .bind(content)
                .bind(author)
                .fetch_one(&self.db),
        )
        .await
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        retry_read(self.timeout, || {
            sqlx::query_as::<_, Post>(&sql).bind(id).fetch_optional(&self.db)
        })
        .await
    }

    async fn update_post(&self, id: Uuid, title: &str, content: &str) -> Result<Post, StoreError> {
        let sql = format!(
            "UPDATE posts SET title = $2, content = $3 WHERE id = $1 RETURNING {POST_COLUMNS}"
        );
        bounded(
            self.timeout,
            sqlx::query_as::<_, Post>(&sql)
                .bind(id)
                .bind(title)
                .bind(content)
                .fetch_one(&self.db),
        )
        .await
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError> {
        let res = bounded(
            self.timeout,
            sqlx::query("DELETE FROM posts WHERE id = $1")
                .bind(id)
                .execute(&self.db),
        )
        .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_recent(&self, offset: u64, limit: u64) -> Result<(Vec<Post>, u64), StoreError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
              FROM posts
             ORDER BY date_posted DESC
             LIMIT $1 OFFSET $2
            "#
        );
        let rows = retry_read(self.timeout, || {
            sqlx::query_as::<_, Post>(&sql)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.db)
        })
        .await?;
        let total: i64 = retry_read(self.timeout, || {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts").fetch_one(&self.db)
        })
        .await?;
        Ok((rows, total as u64))
    }

    async fn list_by_author(
        &self,
        author: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Post>, u64), StoreError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
              FROM posts
             WHERE user_id = $1
             ORDER BY date_posted DESC
             LIMIT $2 OFFSET $3
            "#
        );
        let rows = retry_read(self.timeout, || {
            sqlx::query_as::<_, Post>(&sql)
                .bind(author)
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.db)
        })
        .await?;
        let total: i64 = retry_read(self.timeout, || {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE user_id = $1")
                .bind(author)
                .fetch_one(&self.db)
        })
        .await?;
        Ok((rows, total as u64))
    }
}
