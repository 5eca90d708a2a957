use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Directory view of a lawyer account. Accounts are created and approved
/// elsewhere (admin moderation is out of scope); `active` reflects whether
/// the account has been approved and not suspended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawyerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license_number: String,
    pub active: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LawyerError {
    #[error("Lawyer not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}
