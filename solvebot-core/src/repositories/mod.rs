// src/repositories/mod.rs

pub mod sqlite;

pub use sqlite::link::{LinkRepository, SqliteLinkRepository};
pub use sqlite::solve::{SolveRepository, SqliteSolveRepository};
pub use sqlite::user::{SqliteUserRepository, UserRepository};
