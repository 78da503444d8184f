//! Registration, login, token resolution and the super admin seed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::validate;
use super::{ServiceError, ServiceResult};
use crate::auth::{Identity, PasswordHasher, TokenIssuer};
use crate::config::BootstrapConfig;
use crate::database::models::{Account, NewAccount, Role};
use crate::database::repository::AccountRepo;
use crate::database::Store;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    NotConfigured,
    Created(i64),
    AlreadyPresent(i64),
}

/// Normalised, validated login identifiers. At least one is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identifiers {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Identifiers {
    pub(crate) fn parse(email: Option<&str>, phone: Option<&str>) -> ServiceResult<Self> {
        let email = email
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| validate::email("email", v))
            .transpose()?;
        let phone = phone
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| validate::phone("phone", v))
            .transpose()?;
        if email.is_none() && phone.is_none() {
            return Err(ServiceError::invalid("email", "Email or phone is required"));
        }
        Ok(Self { email, phone })
    }
}

pub(crate) fn check_password(password: &str, min_length: usize) -> ServiceResult<()> {
    if password.chars().count() < min_length {
        return Err(ServiceError::invalid(
            "password",
            format!("Password must be at least {} characters", min_length),
        ));
    }
    Ok(())
}

/// Rejects identifiers that already belong to an account.
pub(crate) async fn ensure_available(store: &dyn Store, ids: &Identifiers) -> ServiceResult<()> {
    if let Some(email) = &ids.email {
        if store.find_account_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict("Email is already registered".to_string()));
        }
    }
    if let Some(phone) = &ids.phone {
        if store.find_account_by_phone(phone).await?.is_some() {
            return Err(ServiceError::Conflict("Phone number is already in use".to_string()));
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    hasher: PasswordHasher,
    min_password: usize,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>, tokens: TokenIssuer, hasher: PasswordHasher, min_password: usize) -> Self {
        Self {
            store,
            tokens,
            hasher,
            min_password,
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthResponse> {
        let ids = Identifiers::parse(request.email.as_deref(), request.phone.as_deref())?;
        check_password(&request.password, self.min_password)?;
        let role = Role::for_self_registration(request.role.as_deref());

        ensure_available(self.store.as_ref(), &ids).await?;
        let password_hash = self.hasher.hash(&request.password).await?;
        let account = self
            .store
            .create_account(NewAccount {
                email: ids.email,
                phone: ids.phone,
                password_hash,
                role,
                enabled: true,
            })
            .await?;

        info!(account = account.id, role = %account.role, "Account registered");
        self.respond(&account)
    }

    /// Every failure after input parsing yields the same error.
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        let email = request.email.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let phone = request.phone.as_deref().map(str::trim).filter(|v| !v.is_empty());

        let account = match (email, phone) {
            (Some(email), _) => self.store.find_account_by_email(&email.to_lowercase()).await?,
            (None, Some(phone)) => self.store.find_account_by_phone(phone).await?,
            (None, None) => return Err(ServiceError::invalid("email", "Email or phone is required")),
        };

        let verified = match &account {
            Some(account) if account.enabled => match &account.password_hash {
                Some(hash) => self.hasher.verify(&request.password, hash).await,
                None => false,
            },
            _ => false,
        };

        match account {
            Some(account) if verified => {
                info!(account = account.id, "Login succeeded");
                self.respond(&account)
            }
            other => {
                warn!(
                    account = other.as_ref().map(|a| a.id),
                    "Login rejected"
                );
                Err(ServiceError::Unauthenticated("Invalid credentials".to_string()))
            }
        }
    }

    /// Resolve a bearer token to the live, enabled account behind it.
    pub async fn authenticate(&self, token: &str) -> ServiceResult<Identity> {
        let claims = self.tokens.verify(token).map_err(|e| {
            warn!(error = %e, "Token rejected");
            ServiceError::Unauthenticated("Invalid or expired token".to_string())
        })?;

        match self.store.find_account(claims.sub).await? {
            Some(account) if account.enabled => Ok(Identity::from(&account)),
            _ => {
                warn!(account = claims.sub, "Token subject missing or disabled");
                Err(ServiceError::Unauthenticated(
                    "Account not found or disabled".to_string(),
                ))
            }
        }
    }

    /// Create the configured super admin once; later runs leave it alone.
    pub async fn seed_super_admin(&self, bootstrap: &BootstrapConfig) -> ServiceResult<SeedOutcome> {
        let (Some(email), Some(password)) = (
            bootstrap.superadmin_email.as_deref(),
            bootstrap.superadmin_password.as_deref(),
        ) else {
            return Ok(SeedOutcome::NotConfigured);
        };
        let email = validate::email("superadmin_email", email)?;

        if let Some(existing) = self.store.find_account_by_email(&email).await? {
            return Ok(SeedOutcome::AlreadyPresent(existing.id));
        }

        let password_hash = self.hasher.hash(password).await?;
        let account = self
            .store
            .create_account(NewAccount {
                email: Some(email),
                phone: None,
                password_hash,
                role: Role::SuperAdmin,
                enabled: true,
            })
            .await?;
        info!(account = account.id, "Super admin account created");
        Ok(SeedOutcome::Created(account.id))
    }

    fn respond(&self, account: &Account) -> ServiceResult<AuthResponse> {
        Ok(AuthResponse {
            access_token: self.tokens.issue(account)?,
            user: Identity::from(account),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn register(email: Option<&str>, phone: Option<&str>, role: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            email: email.map(String::from),
            phone: phone.map(String::from),
            password: "password123".into(),
            role: role.map(String::from),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            phone: None,
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_requires_an_identifier() {
        let ctx = TestContext::new();
        let err = ctx.services.accounts.register(register(None, None, None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn register_downgrades_super_admin() {
        let ctx = TestContext::new();
        let response = ctx
            .services
            .accounts
            .register(register(Some("boss@x.com"), None, Some("SUPER_ADMIN")))
            .await
            .unwrap();
        assert_eq!(response.user.role, Role::Parent);
        assert!(!response.access_token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_or_phone_conflicts() {
        let ctx = TestContext::new();
        let accounts = &ctx.services.accounts;
        accounts
            .register(register(Some("x@y.com"), Some("13800138000"), None))
            .await
            .unwrap();

        let same_email = accounts.register(register(Some("X@Y.com"), None, None)).await;
        assert!(matches!(same_email, Err(ServiceError::Conflict(_))));

        let same_phone = accounts
            .register(register(Some("other@y.com"), Some("13800138000"), None))
            .await;
        assert!(matches!(same_phone, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let ctx = TestContext::new();
        let mut request = register(Some("a@b.com"), None, None);
        request.password = "short".into();
        assert!(matches!(
            ctx.services.accounts.register(request).await,
            Err(ServiceError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn login_and_authenticate() {
        let ctx = TestContext::new();
        let accounts = &ctx.services.accounts;
        accounts.register(register(Some("p@x.com"), None, Some("DOCTOR"))).await.unwrap();

        let session = accounts.login(login("p@x.com", "password123")).await.unwrap();
        let identity = accounts.authenticate(&session.access_token).await.unwrap();
        assert_eq!(identity, session.user);
        assert_eq!(identity.role, Role::Doctor);

        let wrong = accounts.login(login("p@x.com", "wrong-password")).await;
        assert!(matches!(wrong, Err(ServiceError::Unauthenticated(_))));
        let missing = accounts.login(login("nobody@x.com", "password123")).await;
        assert!(matches!(missing, Err(ServiceError::Unauthenticated(_))));
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_log_in_or_use_tokens() {
        let ctx = TestContext::new();
        let accounts = &ctx.services.accounts;
        let session = accounts.register(register(Some("d@x.com"), None, None)).await.unwrap();
        ctx.store.set_accounts_enabled(&[session.user.id], false).await.unwrap();

        assert!(matches!(
            accounts.login(login("d@x.com", "password123")).await,
            Err(ServiceError::Unauthenticated(_))
        ));
        assert!(matches!(
            accounts.authenticate(&session.access_token).await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let ctx = TestContext::new();
        let bootstrap = BootstrapConfig {
            superadmin_email: Some("root@carelink.local".into()),
            superadmin_password: Some("super-secret".into()),
        };
        let first = ctx.services.accounts.seed_super_admin(&bootstrap).await.unwrap();
        let SeedOutcome::Created(id) = first else {
            panic!("expected a new account, got {:?}", first);
        };
        let second = ctx.services.accounts.seed_super_admin(&bootstrap).await.unwrap();
        assert_eq!(second, SeedOutcome::AlreadyPresent(id));

        let none = ctx
            .services
            .accounts
            .seed_super_admin(&BootstrapConfig::default())
            .await
            .unwrap();
        assert_eq!(none, SeedOutcome::NotConfigured);
    }
}
