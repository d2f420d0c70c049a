// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{
    parse_appointment_id, Appointment, AppointmentError, AppointmentListQuery,
    ConflictCheckQuery, CreateAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::booking::AppointmentBookingService;

impl From<AppointmentError> for AppError {
    fn from(error: AppointmentError) -> Self {
        let message = error.to_string();
        match error {
            AppointmentError::InvalidInterval => AppError::InvalidInterval(message),
            AppointmentError::PastDate => AppError::PastDate(message),
            AppointmentError::Conflict(conflicts) => AppError::Conflict {
                message,
                conflicts: json!(conflicts),
            },
            AppointmentError::NotFound => AppError::NotFound(message),
            AppointmentError::InvalidId(_) => AppError::InvalidId(message),
            AppointmentError::MissingParameter(_) => AppError::MissingParameter(message),
            AppointmentError::Validation(_) => AppError::ValidationError(message),
            AppointmentError::Internal(_) => AppError::Internal(message),
        }
    }
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let Json(request) = payload?;
    let appointment = service.create_appointment(request).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(params): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = service.list_appointments(params).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Appointment>, AppError> {
    let appointment_id = parse_appointment_id(&appointment_id)?;
    let appointment = service.get_appointment(appointment_id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<String>,
    payload: Result<Json<UpdateAppointmentRequest>, JsonRejection>,
) -> Result<Json<Appointment>, AppError> {
    let appointment_id = parse_appointment_id(&appointment_id)?;
    let Json(request) = payload?;
    let appointment = service.update_appointment(appointment_id, request).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn delete_appointment(
    State(service): State<Arc<AppointmentBookingService>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = parse_appointment_id(&appointment_id)?;
    service.delete_appointment(appointment_id).await?;

    Ok(Json(json!({
        "message": "Appointment deleted successfully"
    })))
}

#[axum::debug_handler]
pub async fn check_appointment_conflicts(
    State(service): State<Arc<AppointmentBookingService>>,
    Query(params): Query<ConflictCheckQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let conflicts = service.check_conflicts(params).await?;
    Ok(Json(conflicts))
}
