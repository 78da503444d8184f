use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::auth::Identity;
use crate::database::models::Role;
use crate::error::ApiError;

pub const SUPER_ADMIN: &[Role] = &[Role::SuperAdmin];
pub const DOCTOR_STAFF: &[Role] = &[Role::Doctor, Role::SuperAdmin];
pub const APPOINTMENT_STAFF: &[Role] = &[Role::SuperAdmin, Role::SchoolAdmin, Role::Doctor];
pub const PARENT: &[Role] = &[Role::Parent];
pub const ANY: &[Role] = &[];

/// Role allowlist for one route group; empty admits any authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    allowed: &'static [Role],
}

impl RoleGate {
    pub const fn new(allowed: &'static [Role]) -> Self {
        Self { allowed }
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&role)
    }
}

/// Must run inside `require_identity`.
pub async fn require_roles(
    State(gate): State<RoleGate>,
    identity: Identity,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !gate.admits(identity.role) {
        warn!(
            caller = identity.id,
            role = %identity.role,
            path = %request.uri().path(),
            "Role gate rejected request"
        );
        return Err(ApiError::forbidden("Insufficient role for this resource"));
    }
    Ok(next.run(request).await)
}
