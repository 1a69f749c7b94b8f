// src/repositories/sqlite/user.rs

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::models::User;
use crate::utils::time::{from_epoch, to_epoch};
use crate::Error;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), Error>;
    async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, Error>;
    /// Case-insensitive lookup; the caller strips any leading `@`.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error>;
    async fn update_username(&self, user_id: &str, username: Option<&str>) -> Result<(), Error>;
    async fn count(&self) -> Result<i64, Error>;
}

#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: Pool<Sqlite>,
}

impl SqliteUserRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    fn map_row(r: &sqlx::sqlite::SqliteRow) -> Result<User, Error> {
        Ok(User {
            user_id: r.try_get("user_id")?,
            telegram_id: r.try_get("telegram_id")?,
            username: r.try_get("username")?,
            first_seen: from_epoch(r.try_get::<i64, _>("first_seen")?),
        })
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: &User) -> Result<(), Error> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, telegram_id, username, first_seen)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&user.user_id)
        .bind(user.telegram_id)
        .bind(&user.username)
        .bind(to_epoch(user.first_seen))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, telegram_id, username, first_seen
            FROM users
            WHERE telegram_id = ?
            "#,
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query(
            r#"
            SELECT user_id, telegram_id, username, first_seen
            FROM users
            WHERE username = ? COLLATE NOCASE
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn update_username(&self, user_id: &str, username: Option<&str>) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = ?
            WHERE user_id = ?
            "#,
        )
        .bind(username)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count(&self) -> Result<i64, Error> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("cnt")?)
    }
}
