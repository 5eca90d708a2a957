pub mod models;
pub mod services;

pub use models::{LawyerError, LawyerSummary};
pub use services::directory::LawyerDirectoryService;
