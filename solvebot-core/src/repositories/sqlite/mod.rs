pub mod link;
pub mod solve;
pub mod user;
