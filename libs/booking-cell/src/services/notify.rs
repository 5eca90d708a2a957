use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::Appointment;

/// Queues notification rows for delivery by an external worker.
///
/// Notifications are best effort: a failure is logged and never rolls back
/// the booking operation that triggered it.
pub struct NotificationService {
    supabase: Arc<SupabaseClient>,
}

impl NotificationService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn notify(&self, recipient_email: &str, template: &str, data: Value, auth_token: &str) {
        let row = json!({
            "recipient_email": recipient_email,
            "template": template,
            "data": data,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/notifications",
                Some(auth_token),
                Some(row),
                Some(headers),
            )
            .await;

        match result {
            Ok(_) => debug!("Queued {} notification for {}", template, recipient_email),
            Err(e) => warn!(
                "Failed to queue {} notification for {}: {}",
                template, recipient_email, e
            ),
        }
    }

    /// Notify both sides of a booking about a lifecycle event.
    pub async fn notify_parties(&self, appointment: &Appointment, template: &str, auth_token: &str) {
        let data = json!({
            "appointment_id": appointment.id,
            "start_time": appointment.start_time.to_rfc3339(),
            "status": appointment.status.to_string(),
            "lawyer_name": appointment.lawyer_name,
            "client_name": appointment.client_name,
        });

        self.notify(&appointment.client_email, template, data.clone(), auth_token)
            .await;
        self.notify(&appointment.lawyer_email, template, data, auth_token)
            .await;
    }
}
