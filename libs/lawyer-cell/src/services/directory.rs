use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{LawyerError, LawyerSummary};

pub struct LawyerDirectoryService {
    supabase: Arc<SupabaseClient>,
}

impl LawyerDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Look up a lawyer by license number. Returns `None` when no account
    /// carries that license; the caller decides how to treat inactive ones.
    pub async fn find_by_license(
        &self,
        license_number: &str,
        auth_token: &str,
    ) -> Result<Option<LawyerSummary>, LawyerError> {
        debug!("Looking up lawyer by license: {}", license_number);

        let path = format!(
            "/rest/v1/lawyers?license_number=eq.{}",
            urlencoding::encode(license_number)
        );
        self.fetch_one(&path, auth_token).await
    }

    pub async fn find_by_id(
        &self,
        lawyer_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<LawyerSummary>, LawyerError> {
        debug!("Looking up lawyer by id: {}", lawyer_id);

        let path = format!("/rest/v1/lawyers?id=eq.{}", lawyer_id);
        self.fetch_one(&path, auth_token).await
    }

    /// Convenience lookup that only yields approved, non-suspended lawyers.
    pub async fn find_active_by_license(
        &self,
        license_number: &str,
        auth_token: &str,
    ) -> Result<Option<LawyerSummary>, LawyerError> {
        let lawyer = self.find_by_license(license_number, auth_token).await?;
        Ok(lawyer.filter(|l| l.active))
    }

    async fn fetch_one(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Option<LawyerSummary>, LawyerError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| LawyerError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let lawyer: LawyerSummary = serde_json::from_value(row)
                    .map_err(|e| LawyerError::Database(format!("Failed to parse lawyer: {}", e)))?;
                Ok(Some(lawyer))
            }
            None => Ok(None),
        }
    }
}
