use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("Client not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}
