use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;

use crate::database::models::{Account, Role};
use crate::error::ApiError;

/// The caller, resolved from a verified token and the live account row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: i64,
    pub role: Role,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Identity {
    pub fn has_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }
}

impl From<&Account> for Identity {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            role: account.role,
            email: account.email.clone(),
            phone: account.phone.clone(),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Identity>().cloned().ok_or_else(|| {
            tracing::error!(path = %parts.uri.path(), "Identity requested on a route without auth middleware");
            ApiError::internal_server_error("Authentication context missing")
        })
    }
}
