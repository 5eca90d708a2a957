use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ClientError, ClientSummary};

pub struct ClientDirectoryService {
    supabase: Arc<SupabaseClient>,
}

impl ClientDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn find_by_id(
        &self,
        client_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<ClientSummary>, ClientError> {
        debug!("Looking up client: {}", client_id);

        let path = format!("/rest/v1/clients?id=eq.{}", client_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ClientError::Database(e.to_string()))?;

        match result.into_iter().next() {
            Some(row) => {
                let client: ClientSummary = serde_json::from_value(row)
                    .map_err(|e| ClientError::Database(format!("Failed to parse client: {}", e)))?;
                Ok(Some(client))
            }
            None => Ok(None),
        }
    }
}
