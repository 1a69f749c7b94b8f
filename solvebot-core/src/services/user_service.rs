use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::User;
use crate::repositories::UserRepository;
use crate::Error;

pub struct UserService {
    user_repo: Arc<dyn UserRepository + Send + Sync>,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository + Send + Sync>) -> Self {
        Self { user_repo }
    }

    /// Looks up or creates the user record for a platform identity.
    /// `first_seen` is set only on creation; the username is refreshed
    /// whenever the platform reports a different one.
    pub async fn get_or_create(
        &self,
        telegram_id: i64,
        username: Option<&str>,
    ) -> Result<User, Error> {
        if let Some(mut existing) = self.user_repo.get_by_telegram_id(telegram_id).await? {
            if existing.username.as_deref() != username {
                self.user_repo
                    .update_username(&existing.user_id, username)
                    .await?;
                existing.username = username.map(|s| s.to_string());
            }
            return Ok(existing);
        }

        let user = User {
            user_id: Uuid::new_v4().to_string(),
            telegram_id,
            username: username.map(|s| s.to_string()),
            first_seen: Utc::now(),
        };
        self.user_repo.create(&user).await?;
        debug!("Created user {} for telegram id {}", user.user_id, telegram_id);
        Ok(user)
    }

    /// Resolves an operator-supplied identifier: all digits means a telegram
    /// id, anything else is a username with any leading `@` stripped.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, Error> {
        if !identifier.is_empty() && identifier.chars().all(|c| c.is_ascii_digit()) {
            // A digit string too large for i64 cannot match any stored user.
            let telegram_id: i64 = match identifier.parse() {
                Ok(id) => id,
                Err(_) => return Ok(None),
            };
            self.user_repo.get_by_telegram_id(telegram_id).await
        } else {
            let name = identifier.trim_start_matches('@');
            self.user_repo.get_by_username(name).await
        }
    }
}
