// solvebot-server/src/main.rs

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use solvebot_core::repositories::{
    LinkRepository, SolveRepository, SqliteLinkRepository, SqliteSolveRepository,
    SqliteUserRepository, UserRepository,
};
use solvebot_core::services::{
    CommandService, IssuanceService, RedemptionService, ReportService, Sender, UserService,
};
use solvebot_core::Database;

mod config;
mod telegram;

use config::Config;
use telegram::TelegramClient;

#[derive(Parser, Debug, Clone)]
#[command(name = "solvebot")]
#[command(author, version, about = "solvebot - link-token solve tracker over Telegram")]
struct Args {
    /// SQLite database URL
    #[arg(long, default_value = "sqlite://bot.db")]
    db_path: String,

    /// Long-poll timeout in seconds for getUpdates
    #[arg(long, default_value_t = 30)]
    poll_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // BOT_TOKEN and OWNER_ID are required; exit with a diagnostic, not a
    // panic, if either is absent.
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let db = Database::new(&args.db_path).await?;
    db.migrate().await?;

    let link_repo: Arc<dyn LinkRepository + Send + Sync> =
        Arc::new(SqliteLinkRepository::new(db.pool().clone()));
    let user_repo: Arc<dyn UserRepository + Send + Sync> =
        Arc::new(SqliteUserRepository::new(db.pool().clone()));
    let solve_repo: Arc<dyn SolveRepository + Send + Sync> =
        Arc::new(SqliteSolveRepository::new(db.pool().clone()));

    let user_service = Arc::new(UserService::new(user_repo.clone()));
    let issuance = Arc::new(IssuanceService::new(link_repo.clone(), solve_repo.clone()));
    let redemption = Arc::new(RedemptionService::new(
        user_service.clone(),
        link_repo.clone(),
        solve_repo.clone(),
    ));
    let report = Arc::new(ReportService::new(
        user_repo,
        link_repo,
        solve_repo,
        user_service,
    ));

    let client = TelegramClient::new(&config.bot_token);
    let me = client.get_me().await?;
    let bot_username = me
        .username
        .ok_or_else(|| anyhow!("getMe returned no bot username"))?;
    let link_base = format!("https://t.me/{bot_username}");

    let commands = CommandService::new(
        Some(config.operator_id),
        link_base,
        issuance,
        redemption,
        report,
    );

    info!("Bot is running as @{}", bot_username);
    run_poll_loop(&client, &commands, args.poll_timeout).await
}

/// getUpdates long-poll loop. Transport errors are logged and retried; a
/// failed handler is logged and the update still acknowledged so the loop
/// never wedges on one bad message.
async fn run_poll_loop(
    client: &TelegramClient,
    commands: &CommandService,
    poll_timeout: u64,
) -> anyhow::Result<()> {
    let mut offset = 0i64;
    loop {
        let updates = match client.get_updates(offset, poll_timeout).await {
            Ok(u) => u,
            Err(e) => {
                warn!("getUpdates failed: {:#}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let (Some(from), Some(text)) = (message.from, message.text) else {
                continue;
            };

            let sender = Sender {
                telegram_id: from.id,
                username: from.username,
            };
            match commands.handle_chat_line(&sender, &text).await {
                Ok(Some(reply)) => {
                    if let Err(e) = client.send_message(message.chat.id, &reply).await {
                        warn!("sendMessage to chat {} failed: {:#}", message.chat.id, e);
                    }
                }
                Ok(None) => {}
                Err(e) => error!("Handling update {} failed: {}", update.update_id, e),
            }
        }
    }
}
