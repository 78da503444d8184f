//! Resource services.
//!
//! Each service owns a handle to the store and enforces role-independent
//! rules: validation, ownership, and the side effects that span tables.
//! Role allowlists are applied earlier, by the router.

pub mod accounts;
pub mod admin;
pub mod appointments;
pub mod cases;
pub mod doctors;
pub mod forum;
pub mod growth;
pub mod trainings;
pub mod validate;
pub mod videos;

use std::sync::Arc;

use serde::Serialize;

use crate::auth::{AuthError, PasswordHasher, TokenIssuer};
use crate::config::AppConfig;
use crate::database::{DatabaseError, Store};
use crate::uploads::{UploadError, UploadStore};

pub use accounts::AccountService;
pub use admin::AdminService;
pub use appointments::AppointmentService;
pub use cases::CaseService;
pub use doctors::DoctorService;
pub use forum::ForumService;
pub use growth::GrowthService;
pub use trainings::TrainingService;
pub use videos::VideoService;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(DatabaseError),
    #[error("Upload error: {0}")]
    Upload(UploadError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ServiceError::InvalidInput {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn not_found(what: &str) -> Self {
        ServiceError::NotFound(format!("{} not found", what))
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(constraint) => {
                let message = if constraint.contains("email") {
                    "Email is already registered"
                } else if constraint.contains("phone") {
                    "Phone number is already in use"
                } else {
                    "Record already exists"
                };
                ServiceError::Conflict(message.to_string())
            }
            DatabaseError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::Storage(other),
        }
    }
}

impl From<UploadError> for ServiceError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedType(_) | UploadError::TooLarge { .. } => {
                ServiceError::invalid("file", err.to_string())
            }
            UploadError::TooManyFiles { .. } | UploadError::Multipart(_) => {
                ServiceError::InvalidInput {
                    message: err.to_string(),
                    field: None,
                }
            }
            UploadError::Io(_) => ServiceError::Upload(err),
        }
    }
}

/// `{id, success}` returned by form submissions.
#[derive(Debug, Clone, Serialize)]
pub struct Created {
    pub id: i64,
    pub success: bool,
}

impl Created {
    pub fn new(id: i64) -> Self {
        Self { id, success: true }
    }
}

/// `{ok, message}` acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

impl Ack {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
}

/// Every resource service, wired over one store.
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub admin: AdminService,
    pub doctors: DoctorService,
    pub appointments: AppointmentService,
    pub trainings: TrainingService,
    pub cases: CaseService,
    pub forum: ForumService,
    pub growth: GrowthService,
    pub videos: VideoService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        config: &AppConfig,
        tokens: TokenIssuer,
        uploads: UploadStore,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(&config.security.argon2)?;
        let conceal = config.security.conceal_foreign_records;
        let min_password = config.security.password_min_length;

        Ok(Self {
            accounts: AccountService::new(store.clone(), tokens, hasher.clone(), min_password),
            admin: AdminService::new(store.clone(), hasher, min_password),
            doctors: DoctorService::new(store.clone(), uploads.clone()),
            appointments: AppointmentService::new(store.clone(), conceal),
            trainings: TrainingService::new(store.clone(), conceal),
            cases: CaseService::new(store.clone(), uploads.clone(), conceal),
            forum: ForumService::new(store.clone(), conceal),
            growth: GrowthService::new(store.clone(), conceal),
            videos: VideoService::new(store, uploads, conceal),
        })
    }
}
