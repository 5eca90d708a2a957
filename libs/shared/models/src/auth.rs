use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims carried by the marketplace's bearer tokens. Roles are
/// "client", "lawyer" or "admin"; `sub` is the account id.
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub iat: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_lawyer(&self) -> bool {
        self.role.as_deref() == Some("lawyer")
    }

    pub fn is_client(&self) -> bool {
        self.role.as_deref() == Some("client")
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}
