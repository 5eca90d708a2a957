use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, SlotLock};

const LOCK_TIMEOUT_SECONDS: i64 = 30;
const LOCK_BUCKET_SECONDS: i64 = 30 * 60;

/// Serializes concurrent booking attempts for the same lawyer and time slot
/// through a `booking_locks` table with a unique `lock_key` column.
///
/// Two requests racing for overlapping times hash to the same half-hour
/// bucket, so only one of them gets to run the availability check and
/// insert. Locks are short-lived and expired ones are reaped on contention.
pub struct SlotGuardService {
    supabase: Arc<SupabaseClient>,
}

impl SlotGuardService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Lock key for a lawyer and the half-hour bucket containing `start`.
    pub fn lock_key(lawyer_id: Uuid, start: DateTime<Utc>) -> String {
        let bucket = start.timestamp() - start.timestamp().rem_euclid(LOCK_BUCKET_SECONDS);
        format!("slot_{}_{}", lawyer_id, bucket)
    }

    /// Try to take the lock. `Ok(false)` means someone else holds a live
    /// lock on the same slot right now.
    pub async fn acquire(
        &self,
        lock_key: &str,
        lawyer_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        if self.try_insert_lock(lock_key, lawyer_id, auth_token).await? {
            return Ok(true);
        }

        // Contention. The holder may have died; reap the row if its lease
        // expired and try once more.
        if self.remove_if_expired(lock_key, auth_token).await? {
            return self.try_insert_lock(lock_key, lawyer_id, auth_token).await;
        }

        Ok(false)
    }

    /// Drop the lock. Best effort: a leaked row expires on its own, so a
    /// failure here is logged and swallowed.
    pub async fn release(&self, lock_key: &str, auth_token: &str) {
        let path = format!("/rest/v1/booking_locks?lock_key=eq.{}", lock_key);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await;

        if let Err(e) = result {
            warn!("Failed to release booking lock {}: {}", lock_key, e);
        }
    }

    /// Remove every lock whose lease has run out. Returns how many rows
    /// were deleted.
    pub async fn cleanup_expired(&self, auth_token: &str) -> Result<usize, BookingError> {
        let path = format!(
            "/rest/v1/booking_locks?expires_at=lt.{}",
            Utc::now().to_rfc3339()
        );
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let deleted: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, Some(auth_token), None, Some(headers))
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        if !deleted.is_empty() {
            debug!("Reaped {} expired booking locks", deleted.len());
        }
        Ok(deleted.len())
    }

    async fn try_insert_lock(
        &self,
        lock_key: &str,
        lawyer_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        let now = Utc::now();
        let lock = SlotLock {
            id: Uuid::new_v4(),
            lock_key: lock_key.to_string(),
            lawyer_id,
            acquired_at: now,
            expires_at: now + Duration::seconds(LOCK_TIMEOUT_SECONDS),
            process_id: format!("booking-{}", Uuid::new_v4()),
        };

        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/booking_locks",
                Some(auth_token),
                Some(serde_json::to_value(&lock).map_err(|e| BookingError::Store(e.to_string()))?),
                Some(headers),
            )
            .await;

        match result {
            Ok(_) => {
                debug!("Acquired booking lock {}", lock_key);
                Ok(true)
            }
            Err(e) if e.to_string().contains("Conflict") => Ok(false),
            Err(e) if e.to_string().contains("duplicate") => Ok(false),
            Err(e) => Err(BookingError::Store(format!(
                "Failed to acquire booking lock: {}",
                e
            ))),
        }
    }

    /// Delete the row behind `lock_key` if its lease has expired. Returns
    /// true when a stale row was removed.
    async fn remove_if_expired(
        &self,
        lock_key: &str,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        let path = format!("/rest/v1/booking_locks?lock_key=eq.{}", lock_key);
        let rows: Vec<SlotLock> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        let Some(existing) = rows.into_iter().next() else {
            // Holder released between our insert attempt and this read.
            return Ok(true);
        };

        if existing.expires_at > Utc::now() {
            return Ok(false);
        }

        debug!("Removing expired booking lock {}", lock_key);
        let delete_path = format!(
            "/rest/v1/booking_locks?lock_key=eq.{}&expires_at=eq.{}",
            lock_key,
            existing.expires_at.to_rfc3339()
        );
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let _: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &delete_path,
                Some(auth_token),
                None,
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        Ok(true)
    }

    /// Insert an appointment row under the protection of an already-held
    /// lock, returning the stored row.
    pub async fn insert_appointment(
        &self,
        appointment_json: Value,
        auth_token: &str,
    ) -> Result<Vec<Value>, BookingError> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        self.supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(json!([appointment_json])),
                Some(headers),
            )
            .await
            .map_err(|e| BookingError::Store(e.to_string()))
    }
}
