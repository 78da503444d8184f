// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition only. Every input is untrusted; failed logins are
// logged by the account service.

use axum::{routing::post, Router};

use crate::app::AppState;

pub mod auth;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
}
