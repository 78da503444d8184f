// handlers/elevated/users.rs - account administration
//
// GET/POST   /api/admin/users
// PATCH      /api/admin/users/:id/role
// PATCH      /api/admin/users/:id/status
// PATCH      /api/admin/users/:id/reset-password
// DELETE     /api/admin/users/:id
// POST       /api/admin/users/batch
//
// Super admin accounts cannot be modified through these routes; the service
// answers 403 for them.

use axum::{
    extract::State,
    routing::{delete, get, patch, post},
    Router,
};

use crate::app::AppState;
use crate::database::models::{Account, AccountWithProfile};
use crate::middleware::{created, respond, ApiJson, ApiPath, ApiResult};
use crate::services::admin::{BatchOutcome, BatchRequest, CreateUserRequest, PasswordReset, RoleRequest, StatusRequest};
use crate::services::Ack;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list_users).post(create_user))
        .route("/api/admin/users/batch", post(batch))
        .route("/api/admin/users/:id", delete(delete_user))
        .route("/api/admin/users/:id/role", patch(change_role))
        .route("/api/admin/users/:id/status", patch(set_status))
        .route("/api/admin/users/:id/reset-password", patch(reset_password))
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<AccountWithProfile>> {
    respond(state.services.admin.list_users().await)
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<Account> {
    created(state.services.admin.create_user(request).await)
}

pub async fn change_role(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<RoleRequest>,
) -> ApiResult<Account> {
    respond(state.services.admin.change_role(id, request).await)
}

pub async fn set_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> ApiResult<Account> {
    respond(state.services.admin.set_status(id, request).await)
}

/// Returns the generated temporary password once.
pub async fn reset_password(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<PasswordReset> {
    respond(state.services.admin.reset_password(id).await)
}

pub async fn delete_user(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> ApiResult<Ack> {
    respond(state.services.admin.delete_user(id).await)
}

pub async fn batch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BatchRequest>,
) -> ApiResult<BatchOutcome> {
    respond(state.services.admin.batch(request).await)
}
