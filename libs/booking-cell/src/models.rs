// libs/booking-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked consultation between one client and one lawyer.
///
/// Party name/email fields are snapshots taken when the booking is created.
/// They are deliberately not kept in sync with later profile edits so that
/// historical appointments keep displaying the details in effect at the time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_name: String,
    pub client_email: String,
    pub lawyer_id: Uuid,
    pub lawyer_name: String,
    pub lawyer_email: String,
    pub lawyer_phone: String,
    pub lawyer_license_number: String,
    /// Absolute instant in UTC; the single source of truth for scheduling.
    pub start_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + chrono::Duration::minutes(self.duration_minutes)
    }

    /// Active appointments are the ones that block a time slot.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Which side of the booking an account id belongs to, if any.
    pub fn party_role_of(&self, actor_id: Uuid) -> Option<PartyRole> {
        if actor_id == self.client_id {
            Some(PartyRole::Client)
        } else if actor_id == self.lawyer_id {
            Some(PartyRole::Lawyer)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Payment state is an independent axis advanced by the payment gateway
/// feed, not by the booking flow itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Pending,
    Paid,
    Failed,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Unpaid => write!(f, "unpaid"),
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Which side of a booking a party is on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Client,
    Lawyer,
}

impl fmt::Display for PartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyRole::Client => write!(f, "client"),
            PartyRole::Lawyer => write!(f, "lawyer"),
        }
    }
}

/// Who is requesting a status change. `System` is the payment feed, which
/// may confirm a booking on successful payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Client,
    Lawyer,
    System,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub client_id: Uuid,
    pub lawyer_license_number: String,
    pub start_time: DateTime<Utc>,
    /// 30 or 60 depending on the booking entry point; defaults to 30.
    pub duration_minutes: Option<i64>,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: AppointmentStatus,
}

/// Reference to the appointment blocking a requested slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictRef {
    pub appointment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub available: bool,
    pub conflict: Option<ConflictRef>,
    pub suggested_slots: Vec<TimeRange>,
}

// ==============================================================================
// BOOKING RULES
// ==============================================================================

/// Tunables for the booking flow. The buffer and working hours apply
/// uniformly to every entry point.
#[derive(Debug, Clone)]
pub struct BookingRules {
    /// Minimum separation required on either side of a booking, in minutes.
    pub buffer_minutes: i64,
    /// Working hours in Ethiopia local time, `[start, end)`.
    pub working_hours_start: u32,
    pub working_hours_end: u32,
    /// Minimum lead time to cancel a confirmed booking, in minutes.
    pub cancellation_cutoff_minutes: i64,
    pub allowed_durations_minutes: [i64; 2],
    pub default_duration_minutes: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            buffer_minutes: 30,
            working_hours_start: 9,
            working_hours_end: 17,
            cancellation_cutoff_minutes: 60,
            allowed_durations_minutes: [30, 60],
            default_duration_minutes: 30,
        }
    }
}

// ==============================================================================
// SLOT LOCK MODELS
// ==============================================================================

/// Row in the `booking_locks` table used to serialize concurrent booking
/// attempts for the same lawyer and time slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotLock {
    pub id: Uuid,
    pub lock_key: String,
    pub lawyer_id: Uuid,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub process_id: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Lawyer not found")]
    LawyerNotFound,

    #[error("Lawyer account is not active")]
    LawyerInactive,

    #[error("Client not found")]
    ClientNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Requested slot conflicts with appointment {}", .0.appointment_id)]
    Conflict(ConflictRef),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Confirmed appointments can no longer be cancelled this close to the start time")]
    CancellationCutoff,

    #[error("Store error: {0}")]
    Store(String),
}
