use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::Link;
use crate::repositories::{LinkRepository, SolveRepository};
use crate::Error;

/// Retries per token before a batch is abandoned. A uuid-v4 collision is
/// already negligible, so hitting this bound means something is broken.
const MAX_TOKEN_ATTEMPTS: u32 = 5;

pub struct IssuanceService {
    link_repo: Arc<dyn LinkRepository + Send + Sync>,
    solve_repo: Arc<dyn SolveRepository + Send + Sync>,
}

impl IssuanceService {
    pub fn new(
        link_repo: Arc<dyn LinkRepository + Send + Sync>,
        solve_repo: Arc<dyn SolveRepository + Send + Sync>,
    ) -> Self {
        Self {
            link_repo,
            solve_repo,
        }
    }

    /// Generate and persist `count` fresh links, labeled `Link-1` through
    /// `Link-<count>`. Previously issued links stay valid.
    ///
    /// A token that collides with an existing one is regenerated rather than
    /// silently dropped; the operator always gets exactly `count` links back.
    pub async fn issue_batch(&self, count: usize) -> Result<Vec<Link>, Error> {
        let now = Utc::now();
        let mut links = Vec::with_capacity(count);

        for i in 0..count {
            let label = format!("Link-{}", i + 1);
            let mut attempts = 0u32;
            let link = loop {
                let candidate = Link {
                    token: Uuid::new_v4().simple().to_string(),
                    label: label.clone(),
                    created_at: now,
                };
                match self.link_repo.insert(&candidate).await {
                    Ok(()) => break candidate,
                    Err(e) if is_unique_violation(&e) => {
                        attempts += 1;
                        warn!("Token collision for {}, regenerating ({} so far)", label, attempts);
                        if attempts >= MAX_TOKEN_ATTEMPTS {
                            return Err(Error::TokenCollision(attempts));
                        }
                    }
                    Err(e) => return Err(e),
                }
            };
            links.push(link);
        }

        info!("Issued batch of {} links", links.len());
        Ok(links)
    }

    /// Destructive bulk reset: delete every solve and every link (users are
    /// kept), then issue a fresh batch. No confirmation step.
    pub async fn reset_all(&self, count: usize) -> Result<Vec<Link>, Error> {
        self.solve_repo.delete_all().await?;
        self.link_repo.delete_all().await?;
        info!("Cleared all links and solves");
        self.issue_batch(count).await
    }
}

fn is_unique_violation(err: &Error) -> bool {
    match err {
        Error::Database(sqlx::Error::Database(db)) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}
