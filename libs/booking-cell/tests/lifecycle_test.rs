use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use uuid::Uuid;

use booking_cell::models::{
    ActorRole, Appointment, AppointmentStatus, BookingError, PaymentStatus,
};
use booking_cell::services::lifecycle::AppointmentLifecycleService;

fn appointment_starting_in(minutes: i64, status: AppointmentStatus) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        client_id: Uuid::new_v4(),
        client_name: "Test Client".to_string(),
        client_email: "client@example.com".to_string(),
        lawyer_id: Uuid::new_v4(),
        lawyer_name: "Test Lawyer".to_string(),
        lawyer_email: "lawyer@example.com".to_string(),
        lawyer_phone: "+251911000000".to_string(),
        lawyer_license_number: "LIC-001".to_string(),
        start_time: now + Duration::minutes(minutes),
        duration_minutes: 30,
        reason: "Contract review".to_string(),
        notes: None,
        status,
        payment_status: PaymentStatus::Unpaid,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn lawyer_confirms_pending_appointment() {
    let lifecycle = AppointmentLifecycleService::new();
    assert!(lifecycle
        .validate_transition(
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            ActorRole::Lawyer
        )
        .is_ok());
}

#[test]
fn payment_feed_confirms_pending_appointment() {
    let lifecycle = AppointmentLifecycleService::new();
    assert!(lifecycle
        .validate_transition(
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            ActorRole::System
        )
        .is_ok());
}

#[test]
fn client_cannot_confirm() {
    let lifecycle = AppointmentLifecycleService::new();
    assert_matches!(
        lifecycle.validate_transition(
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            ActorRole::Client
        ),
        Err(BookingError::Forbidden(_))
    );
}

#[test]
fn either_party_cancels_pending() {
    let lifecycle = AppointmentLifecycleService::new();
    for actor in [ActorRole::Client, ActorRole::Lawyer] {
        assert!(lifecycle
            .validate_transition(
                AppointmentStatus::Pending,
                AppointmentStatus::Cancelled,
                actor
            )
            .is_ok());
    }
}

#[test]
fn either_party_cancels_confirmed() {
    let lifecycle = AppointmentLifecycleService::new();
    for actor in [ActorRole::Client, ActorRole::Lawyer] {
        assert!(lifecycle
            .validate_transition(
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                actor
            )
            .is_ok());
    }
}

#[test]
fn only_lawyer_completes() {
    let lifecycle = AppointmentLifecycleService::new();
    assert!(lifecycle
        .validate_transition(
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            ActorRole::Lawyer
        )
        .is_ok());
    assert_matches!(
        lifecycle.validate_transition(
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            ActorRole::Client
        ),
        Err(BookingError::Forbidden(_))
    );
    assert_matches!(
        lifecycle.validate_transition(
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            ActorRole::System
        ),
        Err(BookingError::Forbidden(_))
    );
}

#[test]
fn pending_cannot_jump_to_completed() {
    let lifecycle = AppointmentLifecycleService::new();
    assert_matches!(
        lifecycle.validate_transition(
            AppointmentStatus::Pending,
            AppointmentStatus::Completed,
            ActorRole::Lawyer
        ),
        Err(BookingError::InvalidTransition { .. })
    );
}

#[test]
fn terminal_statuses_have_no_exits() {
    let lifecycle = AppointmentLifecycleService::new();
    for terminal in [AppointmentStatus::Cancelled, AppointmentStatus::Completed] {
        assert!(lifecycle.valid_transitions(terminal).is_empty());
        for target in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::Completed,
        ] {
            if target == terminal {
                continue;
            }
            assert_matches!(
                lifecycle.validate_transition(terminal, target, ActorRole::Lawyer),
                Err(BookingError::InvalidTransition { .. })
            );
        }
    }
}

#[test]
fn cancellation_cutoff_blocks_late_cancellation_of_confirmed() {
    let lifecycle = AppointmentLifecycleService::new();
    let appointment = appointment_starting_in(30, AppointmentStatus::Confirmed);

    assert_matches!(
        lifecycle.enforce_cancellation_cutoff(&appointment, Utc::now(), 60),
        Err(BookingError::CancellationCutoff)
    );
}

#[test]
fn confirmed_cancellation_allowed_with_enough_lead_time() {
    let lifecycle = AppointmentLifecycleService::new();
    let appointment = appointment_starting_in(120, AppointmentStatus::Confirmed);

    assert!(lifecycle
        .enforce_cancellation_cutoff(&appointment, Utc::now(), 60)
        .is_ok());
}

#[test]
fn pending_cancels_freely_regardless_of_lead_time() {
    let lifecycle = AppointmentLifecycleService::new();
    let appointment = appointment_starting_in(5, AppointmentStatus::Pending);

    assert!(lifecycle
        .enforce_cancellation_cutoff(&appointment, Utc::now(), 60)
        .is_ok());
}

#[test]
fn cutoff_boundary_is_exclusive() {
    let lifecycle = AppointmentLifecycleService::new();
    let now = Utc::now();
    let mut appointment = appointment_starting_in(0, AppointmentStatus::Confirmed);
    appointment.start_time = now + Duration::minutes(60);

    // Exactly one hour out is still too late.
    assert_matches!(
        lifecycle.enforce_cancellation_cutoff(&appointment, now, 60),
        Err(BookingError::CancellationCutoff)
    );

    appointment.start_time = now + Duration::minutes(61);
    assert!(lifecycle
        .enforce_cancellation_cutoff(&appointment, now, 60)
        .is_ok());
}
