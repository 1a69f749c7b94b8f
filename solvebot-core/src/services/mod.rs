// src/services/mod.rs

pub mod command_service;
pub mod issuance_service;
pub mod redemption_service;
pub mod report_service;
pub mod user_service;

pub use command_service::{CommandService, Sender};
pub use issuance_service::IssuanceService;
pub use redemption_service::RedemptionService;
pub use report_service::ReportService;
pub use user_service::UserService;
