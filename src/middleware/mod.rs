pub mod auth;
pub mod extract;
pub mod response;
pub mod roles;

pub use auth::require_identity;
pub use extract::{ApiJson, ApiMultipart, ApiPath, ApiQuery};
pub use response::{created, respond, ApiResponse, ApiResult};
pub use roles::{require_roles, RoleGate};
