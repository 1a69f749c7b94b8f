// File: solvebot-core/src/models/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A distributable deep-link token. Tokens are opaque uuid-v4 hex strings;
/// the label (`Link-1`, `Link-2`, ...) exists purely for operator display.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Link {
    pub token: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// An end user, created lazily the first time they talk to the bot.
/// `telegram_id` is the platform identity; `user_id` is our surrogate key.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub user_id: String,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_seen: DateTime<Utc>,
}

/// A recorded solve: one row per (user, token), enforced by the store.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Solve {
    pub solve_id: String,
    pub user_id: String,
    pub token: String,
    pub solved_at: DateTime<Utc>,
}

/// One entry of a user's solve history, joined to the link label.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SolveDetail {
    pub token: String,
    pub label: Option<String>,
    pub solved_at: DateTime<Utc>,
}

/// One entry of the recent-solves log, joined to the solving user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SolveLogEntry {
    pub solved_at: DateTime<Utc>,
    pub telegram_id: i64,
    pub username: Option<String>,
    pub token: String,
    pub label: Option<String>,
}

/// Classified result of a solve attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Token does not exist (or was reset away).
    InvalidToken,
    /// This user already solved this token; nothing was written.
    AlreadySolved,
    /// The user's very first solve.
    FirstSolve,
    /// Any later solve, with the user's running total.
    Solved { total: i64 },
}

/// Aggregate counters for the operator overview.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Overview {
    pub total_users: i64,
    pub total_solves: i64,
    pub total_links: i64,
}

/// Full per-user report: the user record plus their ordered solve history.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserDetail {
    pub user: User,
    pub solves: Vec<SolveDetail>,
}
