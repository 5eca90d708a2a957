use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AvailabilityCheck, BookingError, BookingRules, ConflictRef, PartyRole, TimeRange,
};
use crate::services::timezone;

const MAX_SUGGESTED_SLOTS: usize = 3;

/// Decides whether a party is free at a candidate time, and proposes
/// nearby alternatives when they are not.
pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
    rules: BookingRules,
}

/// The one conflict rule used everywhere. Two bookings for the same party
/// conflict when their intervals overlap after the candidate interval is
/// padded by the buffer on both sides. Boundaries are exclusive, so a slot
/// starting exactly `duration + buffer` after an existing booking is free.
pub fn windows_conflict(
    candidate_start: DateTime<Utc>,
    candidate_duration_minutes: i64,
    buffer_minutes: i64,
    existing_start: DateTime<Utc>,
    existing_duration_minutes: i64,
) -> bool {
    let padded_start = candidate_start - Duration::minutes(buffer_minutes);
    let padded_end =
        candidate_start + Duration::minutes(candidate_duration_minutes + buffer_minutes);
    let existing_end = existing_start + Duration::minutes(existing_duration_minutes);

    existing_start < padded_end && padded_start < existing_end
}

/// First active appointment that blocks the candidate window, if any.
pub fn find_conflict(
    existing: &[Appointment],
    candidate_start: DateTime<Utc>,
    candidate_duration_minutes: i64,
    buffer_minutes: i64,
) -> Option<ConflictRef> {
    existing
        .iter()
        .filter(|a| a.is_active())
        .find(|a| {
            windows_conflict(
                candidate_start,
                candidate_duration_minutes,
                buffer_minutes,
                a.start_time,
                a.duration_minutes,
            )
        })
        .map(|a| ConflictRef {
            appointment_id: a.id,
            start_time: a.start_time,
            status: a.status,
        })
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(SupabaseClient::new(config)), BookingRules::default())
    }

    pub fn with_client(supabase: Arc<SupabaseClient>, rules: BookingRules) -> Self {
        Self { supabase, rules }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    /// Check whether `party_id` can take a booking at `start`.
    ///
    /// Outside working hours counts as unavailable but carries no conflict
    /// reference since no appointment is in the way.
    pub async fn check_party_availability(
        &self,
        party_id: Uuid,
        role: PartyRole,
        start: DateTime<Utc>,
        duration_minutes: i64,
        auth_token: &str,
    ) -> Result<AvailabilityCheck, BookingError> {
        debug!(
            "Checking availability for {} {} at {}",
            role, party_id, start
        );

        let existing = self
            .get_active_appointments(party_id, role, auth_token)
            .await?;

        let conflict = find_conflict(&existing, start, duration_minutes, self.rules.buffer_minutes);
        let within_hours = timezone::is_within_working_hours(
            start,
            self.rules.working_hours_start,
            self.rules.working_hours_end,
        );

        if conflict.is_none() && within_hours {
            return Ok(AvailabilityCheck {
                available: true,
                conflict: None,
                suggested_slots: vec![],
            });
        }

        Ok(AvailabilityCheck {
            available: false,
            conflict,
            suggested_slots: self.suggest_slots(&existing, start, duration_minutes),
        })
    }

    /// All pending or confirmed appointments on the party's calendar.
    async fn get_active_appointments(
        &self,
        party_id: Uuid,
        role: PartyRole,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let id_column = match role {
            PartyRole::Client => "client_id",
            PartyRole::Lawyer => "lawyer_id",
        };
        let path = format!(
            "/rest/v1/appointments?{}=eq.{}&status=in.(pending,confirmed)&order=start_time.asc",
            id_column, party_id
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| BookingError::Store(format!("Failed to parse appointment: {}", e)))
            })
            .collect()
    }

    /// Up to three free half-hour-aligned slots on the same local day as the
    /// requested time, scanning forward from the start of working hours.
    fn suggest_slots(
        &self,
        existing: &[Appointment],
        requested_start: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Vec<TimeRange> {
        let local = timezone::to_addis_local(requested_start);
        let day_start = match local
            .with_hour(self.rules.working_hours_start)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
        {
            Some(t) => timezone::to_utc(t),
            None => return vec![],
        };

        let mut slots = Vec::new();
        let mut candidate = day_start;
        let day_hours = (self.rules.working_hours_end - self.rules.working_hours_start) as i64;
        let day_end = day_start + Duration::hours(day_hours);

        while candidate + Duration::minutes(duration_minutes) <= day_end
            && slots.len() < MAX_SUGGESTED_SLOTS
        {
            let free = candidate != requested_start
                && find_conflict(
                    existing,
                    candidate,
                    duration_minutes,
                    self.rules.buffer_minutes,
                )
                .is_none();
            if free {
                slots.push(TimeRange {
                    start_time: candidate,
                    end_time: candidate + Duration::minutes(duration_minutes),
                });
            }
            candidate += Duration::minutes(30);
        }

        slots
    }
}
