// src/repositories/sqlite/link.rs

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::models::Link;
use crate::utils::time::{from_epoch, to_epoch};
use crate::Error;

/// Repository for distributable link tokens.
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Insert a freshly generated link. A token collision surfaces as a
    /// unique-violation database error; the issuance layer decides what to
    /// do about it.
    async fn insert(&self, link: &Link) -> Result<(), Error>;
    async fn get_by_token(&self, token: &str) -> Result<Option<Link>, Error>;
    async fn count(&self) -> Result<i64, Error>;
    /// Bulk reset. Solves must be cleared first by the caller.
    async fn delete_all(&self) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct SqliteLinkRepository {
    pool: Pool<Sqlite>,
}

impl SqliteLinkRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LinkRepository for SqliteLinkRepository {
    async fn insert(&self, link: &Link) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO links (token, label, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&link.token)
        .bind(&link.label)
        .bind(to_epoch(link.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Link>, Error> {
        let row = sqlx::query(
            r#"
            SELECT token, label, created_at
            FROM links
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(r) = row {
            Ok(Some(Link {
                token: r.try_get("token")?,
                label: r.try_get("label")?,
                created_at: from_epoch(r.try_get::<i64, _>("created_at")?),
            }))
        } else {
            Ok(None)
        }
    }

    async fn count(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM links")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    async fn delete_all(&self) -> Result<(), Error> {
        sqlx::query("DELETE FROM links").execute(&self.pool).await?;
        Ok(())
    }
}
