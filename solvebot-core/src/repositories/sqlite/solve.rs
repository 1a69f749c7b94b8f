// src/repositories/sqlite/solve.rs

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::models::{Solve, SolveDetail, SolveLogEntry};
use crate::utils::time::{from_epoch, to_epoch};
use crate::Error;

/// Repository for solve logs. At most one row per (user, token), enforced by
/// the unique constraint in the schema.
#[async_trait]
pub trait SolveRepository: Send + Sync {
    async fn insert(&self, solve: &Solve) -> Result<(), Error>;
    async fn exists(&self, user_id: &str, token: &str) -> Result<bool, Error>;
    async fn count_for_user(&self, user_id: &str) -> Result<i64, Error>;
    async fn count(&self) -> Result<i64, Error>;
    /// A user's solve history, oldest first, joined to the link label.
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SolveDetail>, Error>;
    /// The most recent solves across all users, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<SolveLogEntry>, Error>;
    async fn delete_all(&self) -> Result<(), Error>;
}

#[derive(Clone)]
pub struct SqliteSolveRepository {
    pool: Pool<Sqlite>,
}

impl SqliteSolveRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SolveRepository for SqliteSolveRepository {
    async fn insert(&self, solve: &Solve) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO solves (solve_id, user_id, token, solved_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&solve.solve_id)
        .bind(&solve.user_id)
        .bind(&solve.token)
        .bind(to_epoch(solve.solved_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn exists(&self, user_id: &str, token: &str) -> Result<bool, Error> {
        let row = sqlx::query(
            r#"
            SELECT 1 AS one FROM solves
            WHERE user_id = ? AND token = ?
            "#,
        )
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn count_for_user(&self, user_id: &str) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM solves WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    async fn count(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM solves")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<SolveDetail>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT s.token, l.label, s.solved_at
            FROM solves s
            LEFT JOIN links l ON l.token = s.token
            WHERE s.user_id = ?
            ORDER BY s.solved_at ASC, s.rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::new();
        for row in rows {
            result.push(SolveDetail {
                token: row.try_get("token")?,
                label: row.try_get("label")?,
                solved_at: from_epoch(row.try_get::<i64, _>("solved_at")?),
            });
        }
        Ok(result)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<SolveLogEntry>, Error> {
        let rows = sqlx::query(
            r#"
            SELECT s.solved_at, u.telegram_id, u.username, s.token, l.label
            FROM solves s
            JOIN users u ON u.user_id = s.user_id
            LEFT JOIN links l ON l.token = s.token
            ORDER BY s.solved_at DESC, s.rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::new();
        for row in rows {
            result.push(SolveLogEntry {
                solved_at: from_epoch(row.try_get::<i64, _>("solved_at")?),
                telegram_id: row.try_get("telegram_id")?,
                username: row.try_get("username")?,
                token: row.try_get("token")?,
                label: row.try_get("label")?,
            });
        }
        Ok(result)
    }

    async fn delete_all(&self) -> Result<(), Error> {
        sqlx::query("DELETE FROM solves").execute(&self.pool).await?;
        Ok(())
    }
}
