// handlers/protected/experts.rs - the parent-facing expert training catalogue
//
// GET /api/parent/experts/trainings, GET /api/parent/experts/trainings/:id,
// GET /api/parent/experts/doctors/upcoming       any authenticated identity
// POST /api/parent/experts/bookings, GET /api/parent/experts/bookings/mine,
// PATCH /api/parent/experts/bookings/:id/cancel  PARENT

use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
    Router,
};

use crate::app::AppState;
use crate::auth::Identity;
use crate::database::models::{Booking, BookingView, TrainingView, UpcomingDoctor};
use crate::filter::Page;
use crate::middleware::roles::{self, require_roles, RoleGate};
use crate::middleware::{created, respond, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::services::trainings::{BookingQuery, BookingRequest, TrainingQuery};
use crate::services::Created;

pub fn routes() -> Router<AppState> {
    let catalogue = Router::new()
        .route("/api/parent/experts/trainings", get(upcoming))
        .route("/api/parent/experts/trainings/:id", get(detail))
        .route("/api/parent/experts/doctors/upcoming", get(upcoming_doctors))
        .route_layer(from_fn_with_state(RoleGate::new(roles::ANY), require_roles));

    let bookings = Router::new()
        .route("/api/parent/experts/bookings", post(book))
        .route("/api/parent/experts/bookings/mine", get(my_bookings))
        .route("/api/parent/experts/bookings/:id/cancel", patch(cancel_booking))
        .route_layer(from_fn_with_state(RoleGate::new(roles::PARENT), require_roles));

    catalogue.merge(bookings)
}

/// Trainings starting today or later, soonest first.
pub async fn upcoming(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TrainingQuery>,
) -> ApiResult<Page<TrainingView>> {
    respond(state.services.trainings.upcoming(query).await)
}

pub async fn detail(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<TrainingView> {
    respond(state.services.trainings.detail(id).await)
}

pub async fn upcoming_doctors(State(state): State<AppState>) -> ApiResult<Vec<UpcomingDoctor>> {
    respond(state.services.trainings.upcoming_doctors().await)
}

pub async fn book(
    State(state): State<AppState>,
    identity: Identity,
    ApiJson(request): ApiJson<BookingRequest>,
) -> ApiResult<Created> {
    created(state.services.trainings.book(&identity, request).await)
}

pub async fn my_bookings(
    State(state): State<AppState>,
    identity: Identity,
    ApiQuery(query): ApiQuery<BookingQuery>,
) -> ApiResult<Page<BookingView>> {
    respond(state.services.trainings.my_bookings(&identity, query).await)
}

pub async fn cancel_booking(
    State(state): State<AppState>,
    identity: Identity,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Booking> {
    respond(state.services.trainings.cancel_booking(&identity, id).await)
}
