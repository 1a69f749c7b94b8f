use std::sync::Arc;

use tracing::debug;

use crate::models::{Link, SolveOutcome};
use crate::services::issuance_service::IssuanceService;
use crate::services::redemption_service::RedemptionService;
use crate::services::report_service::ReportService;
use crate::Error;

/// Links issued per batch, matching the original operator workflow of
/// shortening ten links at a time.
const BATCH_SIZE: usize = 10;

/// Recent-solve entries shown by `/latest`.
const RECENT_LIMIT: i64 = 10;

const UNAUTHORIZED_REPLY: &str = "Unauthorized.";
const USER_NOT_FOUND_REPLY: &str = "User not found in DB.";
const NON_OPERATOR_REPLY: &str =
    "This bot does not accept messages or commands. Use the links provided.";
const WELCOME_REPLY: &str = "Welcome. This bot only records solves via special links.";

/// The identity attached to an inbound chat line.
#[derive(Debug, Clone)]
pub struct Sender {
    pub telegram_id: i64,
    pub username: Option<String>,
}

/// Routes inbound chat lines to the issuance, redemption and reporting
/// services and renders plain-text replies. `Ok(None)` means no reply.
pub struct CommandService {
    /// `None` when the operator identity is unconfigured; every privileged
    /// command is then rejected rather than silently granted.
    operator_id: Option<i64>,
    /// Deep-link base, e.g. `https://t.me/MyBot`.
    link_base: String,
    issuance: Arc<IssuanceService>,
    redemption: Arc<RedemptionService>,
    report: Arc<ReportService>,
}

impl CommandService {
    pub fn new(
        operator_id: Option<i64>,
        link_base: String,
        issuance: Arc<IssuanceService>,
        redemption: Arc<RedemptionService>,
        report: Arc<ReportService>,
    ) -> Self {
        debug!("Initializing CommandService (operator configured: {})", operator_id.is_some());
        Self {
            operator_id,
            link_base,
            issuance,
            redemption,
            report,
        }
    }

    /// Guard for privileged handlers. Kept as an explicit call at the top of
    /// each handler so the check is visible and testable on its own.
    fn require_operator(&self, sender: &Sender) -> Result<(), Error> {
        match self.operator_id {
            Some(id) if id == sender.telegram_id => Ok(()),
            _ => Err(Error::Unauthorized),
        }
    }

    /// Processes one inbound chat line and returns the reply, if any.
    pub async fn handle_chat_line(
        &self,
        sender: &Sender,
        text: &str,
    ) -> Result<Option<String>, Error> {
        let trimmed = text.trim();
        if !trimmed.starts_with('/') {
            return Ok(self.plain_message_reply(sender));
        }

        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        let cmd_part = parts[0].trim_start_matches('/');
        // Strip an `@botname` suffix as sent in group chats.
        let cmd = cmd_part.split('@').next().unwrap_or(cmd_part).to_lowercase();
        let args: Vec<&str> = parts[1..].to_vec();
        debug!("Parsed command '{}' with {} arg(s)", cmd, args.len());

        match self.dispatch(sender, &cmd, &args).await {
            Ok(reply) => Ok(reply),
            Err(Error::Unauthorized) => Ok(Some(UNAUTHORIZED_REPLY.to_string())),
            Err(Error::UserNotFound(_)) => Ok(Some(USER_NOT_FOUND_REPLY.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn dispatch(
        &self,
        sender: &Sender,
        cmd: &str,
        args: &[&str],
    ) -> Result<Option<String>, Error> {
        match cmd {
            "start" => Ok(Some(self.handle_start(sender, args.first().copied()).await?)),
            "generate" | "issue" => {
                self.require_operator(sender)?;
                Ok(Some(self.handle_generate().await?))
            }
            "restart" | "reset" => {
                self.require_operator(sender)?;
                Ok(Some(self.handle_restart().await?))
            }
            "stats" | "overview" => {
                self.require_operator(sender)?;
                Ok(Some(self.handle_stats().await?))
            }
            "user" => {
                self.require_operator(sender)?;
                Ok(Some(self.handle_user(args).await?))
            }
            "latest" | "recent" => {
                self.require_operator(sender)?;
                Ok(Some(self.handle_latest().await?))
            }
            _ => Ok(self.plain_message_reply(sender)),
        }
    }

    /// Unknown commands and plain messages: the operator gets no reply,
    /// everyone else gets a fixed notice.
    fn plain_message_reply(&self, sender: &Sender) -> Option<String> {
        if self.operator_id == Some(sender.telegram_id) {
            None
        } else {
            Some(NON_OPERATOR_REPLY.to_string())
        }
    }

    async fn handle_start(&self, sender: &Sender, token: Option<&str>) -> Result<String, Error> {
        let token = match token {
            Some(t) => t,
            None => return Ok(WELCOME_REPLY.to_string()),
        };

        let outcome = self
            .redemption
            .redeem(sender.telegram_id, sender.username.as_deref(), token)
            .await?;

        Ok(match outcome {
            SolveOutcome::InvalidToken => "Invalid or expired link token.".to_string(),
            SolveOutcome::AlreadySolved => "You have already solved this link.".to_string(),
            SolveOutcome::FirstSolve => "First link solved ✅\nThank you!".to_string(),
            SolveOutcome::Solved { total } => {
                format!("Link solved ✅\nYou have solved {total} links so far.")
            }
        })
    }

    async fn handle_generate(&self) -> Result<String, Error> {
        let links = self.issuance.issue_batch(BATCH_SIZE).await?;
        Ok(format!(
            "Generated {} deep links (manually shorten these with your urlshortener):\n\n{}",
            links.len(),
            self.render_links(&links)
        ))
    }

    async fn handle_restart(&self) -> Result<String, Error> {
        let links = self.issuance.reset_all(BATCH_SIZE).await?;
        Ok(format!(
            "Old links and solves cleared. Generated {} new links:\n\n{}",
            links.len(),
            self.render_links(&links)
        ))
    }

    async fn handle_stats(&self) -> Result<String, Error> {
        let overview = self.report.overview().await?;
        Ok(format!(
            "Total users: {}\nTotal links solved: {}\nActive links: {}",
            overview.total_users, overview.total_solves, overview.total_links
        ))
    }

    async fn handle_user(&self, args: &[&str]) -> Result<String, Error> {
        let identifier = match args.first() {
            Some(id) => *id,
            None => return Ok("Usage: /user <telegram_id_or_username>".to_string()),
        };

        let detail = self.report.user_detail(identifier).await?;
        let mut lines = vec![format!(
            "User: {} ({})\nFirst seen: {}\n\nSolved links:",
            detail.user.username.as_deref().unwrap_or(""),
            detail.user.telegram_id,
            detail.user.first_seen.to_rfc3339(),
        )];
        if detail.solves.is_empty() {
            lines.push("No solves yet".to_string());
        } else {
            for s in &detail.solves {
                let label = s.label.as_deref().unwrap_or(&s.token);
                lines.push(format!(
                    "- {} | token: {} | at: {}",
                    label,
                    s.token,
                    s.solved_at.to_rfc3339()
                ));
            }
        }
        Ok(lines.join("\n"))
    }

    async fn handle_latest(&self) -> Result<String, Error> {
        let entries = self.report.recent(RECENT_LIMIT).await?;
        if entries.is_empty() {
            return Ok("No recent solves".to_string());
        }
        let lines: Vec<String> = entries
            .iter()
            .map(|e| {
                let label = e.label.as_deref().unwrap_or(&e.token);
                format!(
                    "{} | {} ({}) | {} | {}",
                    e.solved_at.to_rfc3339(),
                    e.username.as_deref().unwrap_or(""),
                    e.telegram_id,
                    label,
                    e.token
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn render_links(&self, links: &[Link]) -> String {
        links
            .iter()
            .map(|l| format!("{}: {}?start={}", l.label, self.link_base, l.token))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
