use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use appointment_cell::services::AppointmentBookingService;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let booking_service = Arc::new(AppointmentBookingService::from_config(&state));

    Router::new()
        .route("/", get(|| async { "Clinic Scheduling API is running!" }))
        .nest("/api/appointments", appointment_routes(booking_service))
}
