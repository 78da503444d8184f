//! Router assembly and shared application state.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::{AuthError, TokenIssuer};
use crate::config::AppConfig;
use crate::database::repository::StoreHealth;
use crate::database::Store;
use crate::handlers;
use crate::middleware::require_identity;
use crate::services::Services;
use crate::uploads::UploadStore;

/// Everything a handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub services: Services,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Result<Self, AuthError> {
        let tokens = TokenIssuer::new(&config.security)?;
        let uploads = UploadStore::new(&config.uploads);
        let services = Services::new(store.clone(), &config, tokens, uploads.clone())?;
        Ok(Self {
            config: Arc::new(config),
            store,
            services,
            uploads,
        })
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(handlers::protected::routes())
        .merge(handlers::elevated::routes())
        .route_layer(from_fn_with_state(state.clone(), require_identity));

    let mut app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(handlers::public::routes())
        .merge(api)
        .nest_service(
            "/static/avatars",
            ServeDir::new(state.uploads.root().join("avatars")),
        )
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes))
        .layer(cors_layer(&state.config.api.cors_origins));

    if state.config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }

    app.with_state(state)
}

/// Permissive when no origins, or `*`, are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "CareLink API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Healthcare coordination backend for parents, doctors and school staff",
        "endpoints": {
            "public": ["/", "/health", "/api/auth/register", "/api/auth/login"],
            "protected": ["/api/*"],
            "static": ["/static/avatars/*"]
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "storage": "ok" })),
        ),
        Err(e) => {
            tracing::error!("Health check storage ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "storage": "unavailable" })),
            )
        }
    }
}
