use std::sync::Arc;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use client_cell::services::client::ClientDirectoryService;
use lawyer_cell::services::directory::LawyerDirectoryService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    ActorRole, Appointment, AppointmentStatus, AvailabilityCheck, BookingError, BookingRules,
    CreateAppointmentRequest, PartyRole, PaymentStatus,
};
use crate::services::availability::AvailabilityService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::notify::NotificationService;
use crate::services::slot_guard::SlotGuardService;
use crate::services::timezone;

const LOCK_RETRY_ATTEMPTS: u32 = 3;
const LOCK_RETRY_DELAY_MS: u64 = 100;

/// Orchestrates the booking flow end to end: validation, party resolution,
/// slot locking, conflict checks, persistence and notifications.
pub struct BookingService {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
    lifecycle: AppointmentLifecycleService,
    slot_guard: SlotGuardService,
    notifier: NotificationService,
    lawyers: LawyerDirectoryService,
    clients: ClientDirectoryService,
    rules: BookingRules,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let rules = BookingRules::default();
        Self {
            availability: AvailabilityService::with_client(supabase.clone(), rules.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            slot_guard: SlotGuardService::with_client(supabase.clone()),
            notifier: NotificationService::with_client(supabase.clone()),
            lawyers: LawyerDirectoryService::with_client(supabase.clone()),
            clients: ClientDirectoryService::with_client(supabase.clone()),
            rules,
            supabase,
        }
    }

    /// Create a new appointment in `Pending` status.
    ///
    /// The lawyer's slot is locked for the duration of the conflict check
    /// and insert so two clients racing for the same slot cannot both
    /// succeed.
    pub async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let duration = self.validate_create_request(request)?;

        let lawyer = self
            .lawyers
            .find_by_license(&request.lawyer_license_number, auth_token)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
            .ok_or(BookingError::LawyerNotFound)?;
        if !lawyer.active {
            return Err(BookingError::LawyerInactive);
        }

        let client = self
            .clients
            .find_by_id(request.client_id, auth_token)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?
            .ok_or(BookingError::ClientNotFound)?;

        let lock_key = SlotGuardService::lock_key(lawyer.id, request.start_time);
        let mut locked = false;
        for attempt in 0..LOCK_RETRY_ATTEMPTS {
            if self
                .slot_guard
                .acquire(&lock_key, lawyer.id, auth_token)
                .await?
            {
                locked = true;
                break;
            }
            debug!(
                "Booking lock {} busy, attempt {}/{}",
                lock_key,
                attempt + 1,
                LOCK_RETRY_ATTEMPTS
            );
            tokio::time::sleep(std::time::Duration::from_millis(
                LOCK_RETRY_DELAY_MS * (attempt as u64 + 1),
            ))
            .await;
        }
        if !locked {
            return Err(BookingError::Store(
                "Slot is being booked by another request, try again".to_string(),
            ));
        }

        let result = self
            .create_under_lock(request, duration, &lawyer, &client, auth_token)
            .await;
        self.slot_guard.release(&lock_key, auth_token).await;

        let appointment = result?;
        info!(
            "Created appointment {} for client {} with lawyer {}",
            appointment.id, appointment.client_id, appointment.lawyer_id
        );

        self.notifier
            .notify_parties(&appointment, "appointment_requested", auth_token)
            .await;

        Ok(appointment)
    }

    async fn create_under_lock(
        &self,
        request: &CreateAppointmentRequest,
        duration: i64,
        lawyer: &lawyer_cell::models::LawyerSummary,
        client: &client_cell::models::ClientSummary,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let lawyer_check = self
            .availability
            .check_party_availability(
                lawyer.id,
                PartyRole::Lawyer,
                request.start_time,
                duration,
                auth_token,
            )
            .await?;
        self.require_available(lawyer_check)?;

        let client_check = self
            .availability
            .check_party_availability(
                client.id,
                PartyRole::Client,
                request.start_time,
                duration,
                auth_token,
            )
            .await?;
        self.require_available(client_check)?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            client_id: client.id,
            client_name: client.name.clone(),
            client_email: client.email.clone(),
            lawyer_id: lawyer.id,
            lawyer_name: lawyer.name.clone(),
            lawyer_email: lawyer.email.clone(),
            lawyer_phone: lawyer.phone.clone(),
            lawyer_license_number: lawyer.license_number.clone(),
            start_time: request.start_time,
            duration_minutes: duration,
            reason: request.reason.trim().to_string(),
            notes: request.notes.clone(),
            status: AppointmentStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };

        let row = serde_json::to_value(&appointment)
            .map_err(|e| BookingError::Store(e.to_string()))?;
        let stored = self.slot_guard.insert_appointment(row, auth_token).await?;

        match stored.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map_err(|e| BookingError::Store(format!("Failed to parse appointment: {}", e))),
            None => Ok(appointment),
        }
    }

    fn require_available(&self, check: AvailabilityCheck) -> Result<(), BookingError> {
        if check.available {
            return Ok(());
        }
        match check.conflict {
            Some(conflict) => Err(BookingError::Conflict(conflict)),
            None => Err(BookingError::Validation(
                "Requested time is outside working hours".to_string(),
            )),
        }
    }

    fn validate_create_request(
        &self,
        request: &CreateAppointmentRequest,
    ) -> Result<i64, BookingError> {
        if request.reason.trim().is_empty() {
            return Err(BookingError::Validation(
                "A reason for the consultation is required".to_string(),
            ));
        }

        let duration = request
            .duration_minutes
            .unwrap_or(self.rules.default_duration_minutes);
        if !self.rules.allowed_durations_minutes.contains(&duration) {
            return Err(BookingError::Validation(format!(
                "Duration must be one of {:?} minutes",
                self.rules.allowed_durations_minutes
            )));
        }

        if request.start_time <= Utc::now() {
            return Err(BookingError::Validation(
                "Start time must be in the future".to_string(),
            ));
        }

        if !timezone::is_within_working_hours(
            request.start_time,
            self.rules.working_hours_start,
            self.rules.working_hours_end,
        ) {
            return Err(BookingError::Validation(
                "Requested time is outside working hours".to_string(),
            ));
        }

        Ok(duration)
    }

    /// Move an appointment to a new status on behalf of an actor.
    ///
    /// Requesting the status the appointment already has is a no-op and
    /// succeeds, so retried requests stay harmless.
    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        actor_id: Uuid,
        actor_role: ActorRole,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        let effective_role = match actor_role {
            ActorRole::System => ActorRole::System,
            _ => match appointment.party_role_of(actor_id) {
                Some(PartyRole::Client) => ActorRole::Client,
                Some(PartyRole::Lawyer) => ActorRole::Lawyer,
                None => {
                    return Err(BookingError::Forbidden(
                        "Only a party to the appointment may change its status".to_string(),
                    ))
                }
            },
        };

        if appointment.status == new_status {
            debug!(
                "Appointment {} already {}, nothing to do",
                appointment_id, new_status
            );
            return Ok(appointment);
        }

        self.lifecycle
            .validate_transition(appointment.status, new_status, effective_role)?;

        if new_status == AppointmentStatus::Cancelled {
            self.lifecycle.enforce_cancellation_cutoff(
                &appointment,
                Utc::now(),
                self.rules.cancellation_cutoff_minutes,
            )?;
        }

        let updated = self
            .patch_appointment(
                appointment_id,
                json!({
                    "status": new_status,
                    "updated_at": Utc::now().to_rfc3339(),
                }),
                auth_token,
            )
            .await?;

        info!(
            "Appointment {} moved {} -> {} by {:?}",
            appointment_id, appointment.status, new_status, effective_role
        );

        let template = match new_status {
            AppointmentStatus::Confirmed => "appointment_confirmed",
            AppointmentStatus::Cancelled => "appointment_cancelled",
            AppointmentStatus::Completed => "appointment_completed",
            AppointmentStatus::Pending => "appointment_requested",
        };
        self.notifier
            .notify_parties(&updated, template, auth_token)
            .await;

        Ok(updated)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map_err(|e| BookingError::Store(format!("Failed to parse appointment: {}", e))),
            None => Err(BookingError::NotFound),
        }
    }

    /// Appointments on one party's calendar, newest first, optionally
    /// narrowed to a single status.
    pub async fn list_for_party(
        &self,
        party_id: Uuid,
        role: PartyRole,
        status: Option<AppointmentStatus>,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let id_column = match role {
            PartyRole::Client => "client_id",
            PartyRole::Lawyer => "lawyer_id",
        };
        let mut path = format!(
            "/rest/v1/appointments?{}=eq.{}&order=start_time.desc",
            id_column, party_id
        );
        if let Some(status) = status {
            path.push_str(&format!("&status=eq.{}", status));
        }

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

    pub async fn check_availability(
        &self,
        party_id: Uuid,
        role: PartyRole,
        start: chrono::DateTime<Utc>,
        duration_minutes: Option<i64>,
        auth_token: &str,
    ) -> Result<AvailabilityCheck, BookingError> {
        let duration = duration_minutes.unwrap_or(self.rules.default_duration_minutes);
        if !self.rules.allowed_durations_minutes.contains(&duration) {
            return Err(BookingError::Validation(format!(
                "Duration must be one of {:?} minutes",
                self.rules.allowed_durations_minutes
            )));
        }
        self.availability
            .check_party_availability(party_id, role, start, duration, auth_token)
            .await
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        body: Value,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(auth_token), Some(body), Some(headers))
            .await
            .map_err(|e| BookingError::Store(e.to_string()))?;

        match rows.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map_err(|e| BookingError::Store(format!("Failed to parse appointment: {}", e))),
            None => Err(BookingError::NotFound),
        }
    }
}
