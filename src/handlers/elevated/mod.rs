// handlers/elevated/mod.rs - Elevated handlers (SUPER_ADMIN only)
//
// Account administration and doctor verification. Every route in this tier
// sits behind the identity middleware plus a SUPER_ADMIN role gate.
//
// Route Prefix: /api/admin/users/*, /api/admin/doctors/*

use axum::{middleware::from_fn_with_state, Router};

use crate::app::AppState;
use crate::middleware::roles::{self, require_roles, RoleGate};

pub mod doctors;
pub mod users;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(doctors::routes())
        .route_layer(from_fn_with_state(RoleGate::new(roles::SUPER_ADMIN), require_roles))
}
