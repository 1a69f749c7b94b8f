// solvebot-server/src/config.rs

use solvebot_core::Error;

/// Required out-of-band configuration. Either value missing is fatal at
/// startup; the operator id additionally gates every privileged command.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub operator_id: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let bot_token = std::env::var("BOT_TOKEN")
            .map_err(|_| Error::MissingConfiguration("BOT_TOKEN".to_string()))?;
        let operator_id = std::env::var("OWNER_ID")
            .map_err(|_| Error::MissingConfiguration("OWNER_ID".to_string()))?
            .parse::<i64>()
            .map_err(|_| {
                Error::MissingConfiguration("OWNER_ID must be a numeric telegram id".to_string())
            })?;
        Ok(Self {
            bot_token,
            operator_id,
        })
    }
}
