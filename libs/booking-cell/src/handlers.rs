use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{AppError, User};

use crate::models::{
    ActorRole, Appointment, AppointmentStatus, AvailabilityCheck, BookingError,
    ChangeStatusRequest, CreateAppointmentRequest, PartyRole,
};
use crate::services::booking::BookingService;

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::Validation(msg) => AppError::ValidationError(msg),
        BookingError::LawyerNotFound => AppError::NotFound("Lawyer not found".to_string()),
        BookingError::LawyerInactive => {
            AppError::BadRequest("Lawyer account is not active".to_string())
        }
        BookingError::ClientNotFound => AppError::NotFound("Client not found".to_string()),
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::Conflict(conflict) => AppError::Conflict(format!(
            "Requested slot conflicts with appointment {} starting at {}",
            conflict.appointment_id, conflict.start_time
        )),
        BookingError::Forbidden(msg) => AppError::Forbidden(msg),
        BookingError::InvalidTransition { from, to } => {
            AppError::BadRequest(format!("Invalid status transition: {} -> {}", from, to))
        }
        BookingError::CancellationCutoff => AppError::BadRequest(
            "Confirmed appointments can no longer be cancelled this close to the start time"
                .to_string(),
        ),
        BookingError::Store(msg) => AppError::Database(msg),
    }
}

fn actor_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Token subject is not a valid account id".to_string()))
}

fn actor_role(user: &User) -> ActorRole {
    if user.is_lawyer() {
        ActorRole::Lawyer
    } else {
        ActorRole::Client
    }
}

pub async fn create_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    debug!("Creating appointment for client {}", request.client_id);

    // Clients book for themselves; admins may book on a client's behalf.
    if !user.is_admin() && actor_id(&user)? != request.client_id {
        return Err(AppError::Forbidden(
            "You can only book appointments for your own account".to_string(),
        ));
    }

    let service = BookingService::new(&config);
    let appointment = service
        .create_appointment(&request, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(appointment))
}

pub async fn get_appointment(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let service = BookingService::new(&config);
    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    let requester = actor_id(&user)?;
    if !user.is_admin() && appointment.party_role_of(requester).is_none() {
        return Err(AppError::Forbidden(
            "Only a party to the appointment may view it".to_string(),
        ));
    }

    Ok(Json(appointment))
}

pub async fn change_status(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<ChangeStatusRequest>,
) -> Result<Json<Appointment>, AppError> {
    debug!(
        "Status change for appointment {} to {}",
        appointment_id, request.status
    );

    let service = BookingService::new(&config);
    let appointment = service
        .change_status(
            appointment_id,
            actor_id(&user)?,
            actor_role(&user),
            request.status,
            auth.token(),
        )
        .await
        .map_err(map_booking_error)?;

    Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub party_id: Uuid,
    pub role: PartyRole,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
}

pub async fn check_availability(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityCheck>, AppError> {
    let service = BookingService::new(&config);
    let check = service
        .check_availability(
            query.party_id,
            query.role,
            query.start_time,
            query.duration_minutes,
            auth.token(),
        )
        .await
        .map_err(map_booking_error)?;

    Ok(Json(check))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<AppointmentStatus>,
}

pub async fn list_client_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(client_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    if !user.is_admin() && actor_id(&user)? != client_id {
        return Err(AppError::Forbidden(
            "You can only list your own appointments".to_string(),
        ));
    }

    let service = BookingService::new(&config);
    let appointments = service
        .list_for_party(client_id, PartyRole::Client, query.status, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(appointments))
}

pub async fn list_lawyer_appointments(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(lawyer_id): Path<Uuid>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    if !user.is_admin() && actor_id(&user)? != lawyer_id {
        return Err(AppError::Forbidden(
            "You can only list your own appointments".to_string(),
        ));
    }

    let service = BookingService::new(&config);
    let appointments = service
        .list_for_party(lawyer_id, PartyRole::Lawyer, query.status, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(appointments))
}
