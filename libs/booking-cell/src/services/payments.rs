use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentStatus, BookingError, PaymentStatus};

/// Polls the payment gateway for appointments with a pending payment and
/// folds the result back into the booking record.
///
/// A successful payment both marks the appointment paid and confirms it in
/// one write, so a paid appointment is never left in `Pending`.
pub struct PaymentSyncService {
    supabase: Arc<SupabaseClient>,
    http: reqwest::Client,
    gateway_url: String,
    poll_interval_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct GatewayPaymentStatus {
    status: String,
}

impl PaymentSyncService {
    pub fn new(config: &AppConfig) -> Option<Self> {
        if !config.is_payment_sync_configured() {
            return None;
        }
        Some(Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            http: reqwest::Client::new(),
            gateway_url: config.payment_gateway_url.clone(),
            poll_interval_seconds: config.payment_poll_interval_seconds,
        })
    }

    pub fn with_client(
        supabase: Arc<SupabaseClient>,
        gateway_url: String,
        poll_interval_seconds: u64,
    ) -> Self {
        Self {
            supabase,
            http: reqwest::Client::new(),
            gateway_url,
            poll_interval_seconds,
        }
    }

    /// Run the poller forever. Errors are logged and the next tick retries.
    pub async fn run(&self) {
        info!(
            "Payment sync started, polling every {}s",
            self.poll_interval_seconds
        );
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(self.poll_interval_seconds));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            match self.sync_once().await {
                Ok(0) => {}
                Ok(updated) => info!("Payment sync updated {} appointments", updated),
                Err(e) => warn!("Payment sync pass failed: {}", e),
            }
        }
    }

    /// One polling pass. Returns how many appointments changed.
    pub async fn sync_once(&self) -> Result<usize, BookingError> {
        let path =
            "/rest/v1/appointments?payment_status=eq.pending&status=in.(pending,confirmed)";
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let mut updated = 0;
        for row in rows {
            let appointment: Appointment = match serde_json::from_value(row) {
                Ok(a) => a,
                Err(e) => {
                    warn!("Skipping unparseable appointment row: {}", e);
                    continue;
                }
            };

            match self.fetch_gateway_status(&appointment).await {
                Ok(Some(status)) => {
                    if let Some(patch) = Self::settlement_patch(&appointment, &status) {
                        self.apply_patch(&appointment, patch).await?;
                        updated += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    // Gateway hiccups should not stall the rest of the batch.
                    warn!(
                        "Payment status lookup failed for appointment {}: {}",
                        appointment.id, e
                    );
                }
            }
        }

        Ok(updated)
    }

    /// The write a gateway answer implies, if any. `paid` settles the
    /// payment and confirms a still-pending booking in the same patch.
    fn settlement_patch(appointment: &Appointment, gateway_status: &str) -> Option<Value> {
        match gateway_status {
            "paid" => {
                let mut patch = json!({
                    "payment_status": PaymentStatus::Paid,
                    "updated_at": Utc::now().to_rfc3339(),
                });
                if appointment.status == AppointmentStatus::Pending {
                    patch["status"] = json!(AppointmentStatus::Confirmed);
                }
                Some(patch)
            }
            "failed" => Some(json!({
                "payment_status": PaymentStatus::Failed,
                "updated_at": Utc::now().to_rfc3339(),
            })),
            _ => None,
        }
    }

    async fn fetch_gateway_status(
        &self,
        appointment: &Appointment,
    ) -> Result<Option<String>, BookingError> {
        let url = format!(
            "{}/api/v1/payments/{}/status",
            self.gateway_url, appointment.id
        );
        debug!("Querying payment gateway: {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // No payment attempt yet for this appointment.
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(BookingError::Store(format!(
                "Payment gateway returned {}",
                response.status()
            )));
        }

        let body: GatewayPaymentStatus = response
            .json()
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;
        Ok(Some(body.status))
    }

    async fn apply_patch(
        &self,
        appointment: &Appointment,
        patch: Value,
    ) -> Result<(), BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, None, Some(patch), Some(headers))
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        info!("Settled payment state for appointment {}", appointment.id);
        Ok(())
    }
}
