use std::sync::Arc;

use crate::models::{Overview, SolveLogEntry, UserDetail};
use crate::repositories::{LinkRepository, SolveRepository, UserRepository};
use crate::services::user_service::UserService;
use crate::Error;

/// Read-only aggregations over the store.
pub struct ReportService {
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    link_repo: Arc<dyn LinkRepository + Send + Sync>,
    solve_repo: Arc<dyn SolveRepository + Send + Sync>,
    user_service: Arc<UserService>,
}

impl ReportService {
    pub fn new(
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        link_repo: Arc<dyn LinkRepository + Send + Sync>,
        solve_repo: Arc<dyn SolveRepository + Send + Sync>,
        user_service: Arc<UserService>,
    ) -> Self {
        Self {
            user_repo,
            link_repo,
            solve_repo,
            user_service,
        }
    }

    pub async fn overview(&self) -> Result<Overview, Error> {
        Ok(Overview {
            total_users: self.user_repo.count().await?,
            total_solves: self.solve_repo.count().await?,
            total_links: self.link_repo.count().await?,
        })
    }

    /// Per-user report. A user with zero solves gets an empty history, not
    /// an error; an unknown identifier is `Error::UserNotFound`.
    pub async fn user_detail(&self, identifier: &str) -> Result<UserDetail, Error> {
        let user = self
            .user_service
            .find_by_identifier(identifier)
            .await?
            .ok_or_else(|| Error::UserNotFound(identifier.to_string()))?;

        let solves = self.solve_repo.list_for_user(&user.user_id).await?;
        Ok(UserDetail { user, solves })
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<SolveLogEntry>, Error> {
        self.solve_repo.list_recent(limit).await
    }
}
