// handlers/protected/auth.rs - GET /api/auth/me

use axum::{routing::get, Router};

use crate::app::AppState;
use crate::auth::Identity;
use crate::middleware::{ApiResponse, ApiResult};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/auth/me", get(me))
}

/// The identity resolved from the live account, not from the token claims.
pub async fn me(identity: Identity) -> ApiResult<Identity> {
    Ok(ApiResponse::success(identity))
}
