pub mod models;
pub mod services;

pub use models::{ClientError, ClientSummary};
pub use services::client::ClientDirectoryService;
