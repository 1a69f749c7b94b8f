use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{Solve, SolveOutcome};
use crate::repositories::{LinkRepository, SolveRepository};
use crate::services::user_service::UserService;
use crate::Error;

/// Validates and records solve attempts. A token may be solved once by each
/// distinct user; the second attempt by the same user is a defined outcome,
/// not an error, and writes nothing.
pub struct RedemptionService {
    user_service: Arc<UserService>,
    link_repo: Arc<dyn LinkRepository + Send + Sync>,
    solve_repo: Arc<dyn SolveRepository + Send + Sync>,
}

impl RedemptionService {
    pub fn new(
        user_service: Arc<UserService>,
        link_repo: Arc<dyn LinkRepository + Send + Sync>,
        solve_repo: Arc<dyn SolveRepository + Send + Sync>,
    ) -> Self {
        Self {
            user_service,
            link_repo,
            solve_repo,
        }
    }

    pub async fn redeem(
        &self,
        telegram_id: i64,
        username: Option<&str>,
        token: &str,
    ) -> Result<SolveOutcome, Error> {
        let user = self.user_service.get_or_create(telegram_id, username).await?;

        let link = match self.link_repo.get_by_token(token).await? {
            Some(l) => l,
            None => {
                debug!("Unknown token presented by telegram id {}", telegram_id);
                return Ok(SolveOutcome::InvalidToken);
            }
        };

        if self.solve_repo.exists(&user.user_id, &link.token).await? {
            return Ok(SolveOutcome::AlreadySolved);
        }

        let solve = Solve {
            solve_id: Uuid::new_v4().to_string(),
            user_id: user.user_id.clone(),
            token: link.token.clone(),
            solved_at: Utc::now(),
        };
        self.solve_repo.insert(&solve).await?;

        let total = self.solve_repo.count_for_user(&user.user_id).await?;
        info!(
            "Recorded solve of {} by telegram id {} (total {})",
            link.label, telegram_id, total
        );

        if total == 1 {
            Ok(SolveOutcome::FirstSolve)
        } else {
            Ok(SolveOutcome::Solved { total })
        }
    }
}
