use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::models::{ActorRole, Appointment, AppointmentStatus, BookingError};

/// Guards every status change against the appointment state machine and
/// against who is allowed to drive each edge.
///
/// Pending -> Confirmed | Cancelled
/// Confirmed -> Completed | Cancelled
/// Cancelled and Completed are terminal.
#[derive(Default)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, from: AppointmentStatus) -> Vec<AppointmentStatus> {
        match from {
            AppointmentStatus::Pending => {
                vec![AppointmentStatus::Confirmed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Confirmed => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]
            }
            AppointmentStatus::Cancelled | AppointmentStatus::Completed => vec![],
        }
    }

    /// Reject edges the state machine does not have, then edges the actor
    /// may not drive. Confirmation is reserved to the lawyer and to the
    /// payment feed; completion to the lawyer; either party may cancel.
    pub fn validate_transition(
        &self,
        current: AppointmentStatus,
        new: AppointmentStatus,
        actor: ActorRole,
    ) -> Result<(), BookingError> {
        debug!(
            "Validating transition {} -> {} by {:?}",
            current, new, actor
        );

        if !self.valid_transitions(current).contains(&new) {
            return Err(BookingError::InvalidTransition {
                from: current,
                to: new,
            });
        }

        let authorized = match (current, new) {
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed) => {
                matches!(actor, ActorRole::Lawyer | ActorRole::System)
            }
            (AppointmentStatus::Confirmed, AppointmentStatus::Completed) => {
                matches!(actor, ActorRole::Lawyer)
            }
            (_, AppointmentStatus::Cancelled) => {
                matches!(actor, ActorRole::Lawyer | ActorRole::Client)
            }
            _ => false,
        };

        if !authorized {
            return Err(BookingError::Forbidden(format!(
                "{:?} may not move an appointment from {} to {}",
                actor, current, new
            )));
        }

        Ok(())
    }

    /// Confirmed bookings may only be cancelled while more than the cutoff
    /// remains before the start time. Pending bookings cancel freely.
    pub fn enforce_cancellation_cutoff(
        &self,
        appointment: &Appointment,
        now: DateTime<Utc>,
        cutoff_minutes: i64,
    ) -> Result<(), BookingError> {
        if appointment.status != AppointmentStatus::Confirmed {
            return Ok(());
        }

        if appointment.start_time - now <= Duration::minutes(cutoff_minutes) {
            return Err(BookingError::CancellationCutoff);
        }

        Ok(())
    }
}
