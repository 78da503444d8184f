// handlers/public/auth.rs - POST /api/auth/register, POST /api/auth/login

use axum::extract::State;

use crate::app::AppState;
use crate::middleware::{created, respond, ApiJson, ApiResult};
use crate::services::accounts::{AuthResponse, LoginRequest, RegisterRequest};

/// Self-registration. Roles outside PARENT, DOCTOR and SCHOOL_ADMIN become PARENT.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    created(state.services.accounts.register(request).await)
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    respond(state.services.accounts.login(request).await)
}
