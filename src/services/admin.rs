//! Account administration for SUPER_ADMIN callers.
//!
//! SUPER_ADMIN accounts are never the target of delete, disable or role
//! changes. Single-target operations refuse them outright; batch operations
//! drop them from the target set and only fail when nothing is left.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::accounts::{check_password, ensure_available, Identifiers};
use super::validate;
use super::{Ack, ServiceError, ServiceResult};
use crate::auth::password::temp_password;
use crate::auth::PasswordHasher;
use crate::database::models::{Account, AccountWithProfile, DoctorProfile, NewAccount, Role};
use crate::database::repository::AccountRepo;
use crate::database::Store;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: String,
    pub role: String,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchAction {
    Delete,
    Enable,
    Disable,
    ChangeRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub action: BatchAction,
    pub user_ids: Vec<i64>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub ok: bool,
    pub message: String,
    pub affected: u64,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub ok: bool,
    pub message: String,
    pub temp_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub ok: bool,
}

#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    min_password: usize,
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>, hasher: PasswordHasher, min_password: usize) -> Self {
        Self {
            store,
            hasher,
            min_password,
        }
    }

    pub async fn list_users(&self) -> ServiceResult<Vec<AccountWithProfile>> {
        Ok(self.store.list_accounts().await?)
    }

    pub async fn create_user(&self, request: CreateUserRequest) -> ServiceResult<Account> {
        let ids = Identifiers::parse(request.email.as_deref(), request.phone.as_deref())?;
        check_password(&request.password, self.min_password)?;
        let role: Role = validate::parse_enum("role", &request.role)?;

        ensure_available(self.store.as_ref(), &ids).await?;
        let password_hash = self.hasher.hash(&request.password).await?;
        let account = self
            .store
            .create_account(NewAccount {
                email: ids.email,
                phone: ids.phone,
                password_hash,
                role,
                enabled: request.enabled.unwrap_or(true),
            })
            .await?;
        info!(account = account.id, role = %role, "Account created by admin");
        Ok(account)
    }

    pub async fn change_role(&self, id: i64, request: RoleRequest) -> ServiceResult<Account> {
        let role: Role = validate::parse_enum("role", &request.role)?;
        self.mutable_target(id).await?;
        self.store.set_accounts_role(&[id], role).await?;
        self.reload(id).await
    }

    pub async fn set_status(&self, id: i64, request: StatusRequest) -> ServiceResult<Account> {
        self.mutable_target(id).await?;
        self.store.set_accounts_enabled(&[id], request.enabled).await?;
        self.reload(id).await
    }

    pub async fn reset_password(&self, id: i64) -> ServiceResult<PasswordReset> {
        self.reload(id).await?;
        let temp_password = temp_password();
        let hash = self.hasher.hash(&temp_password).await?;
        self.store.set_password_hash(id, &hash).await?;
        info!(account = id, "Password reset by admin");
        Ok(PasswordReset {
            ok: true,
            message: "Password has been reset".to_string(),
            temp_password,
        })
    }

    pub async fn delete_user(&self, id: i64) -> ServiceResult<Ack> {
        self.mutable_target(id).await?;
        self.store.delete_accounts(&[id]).await?;
        info!(account = id, "Account deleted by admin");
        Ok(Ack::ok("User deleted"))
    }

    pub async fn batch(&self, request: BatchRequest) -> ServiceResult<BatchOutcome> {
        let requested: BTreeSet<i64> = request.user_ids.iter().copied().collect();
        if requested.is_empty() {
            return Err(ServiceError::invalid("userIds", "userIds must not be empty"));
        }
        let role = match request.action {
            BatchAction::ChangeRole => {
                let raw = request
                    .role
                    .as_deref()
                    .ok_or_else(|| ServiceError::invalid("role", "role is required for changeRole"))?;
                Some(validate::parse_enum::<Role>("role", raw)?)
            }
            _ => None,
        };

        let ids: Vec<i64> = requested.into_iter().collect();
        let accounts = self.store.find_accounts(&ids).await?;
        let protected: Vec<i64> = accounts
            .iter()
            .filter(|a| a.role == Role::SuperAdmin)
            .map(|a| a.id)
            .collect();
        if !protected.is_empty() {
            warn!(accounts = ?protected, "Super admin accounts excluded from batch");
        }
        let targets: Vec<i64> = ids.iter().copied().filter(|id| !protected.contains(id)).collect();
        if targets.is_empty() {
            return Err(ServiceError::invalid(
                "userIds",
                "No eligible accounts: super admin accounts cannot be modified",
            ));
        }

        let (affected, verb) = match (request.action, role) {
            (BatchAction::Delete, _) => (self.store.delete_accounts(&targets).await?, "deleted"),
            (BatchAction::Enable, _) => (self.store.set_accounts_enabled(&targets, true).await?, "enabled"),
            (BatchAction::Disable, _) => (self.store.set_accounts_enabled(&targets, false).await?, "disabled"),
            (BatchAction::ChangeRole, Some(role)) => (self.store.set_accounts_role(&targets, role).await?, "updated"),
            (BatchAction::ChangeRole, None) => {
                return Err(ServiceError::invalid("role", "role is required for changeRole"))
            }
        };

        info!(action = ?request.action, affected, skipped = protected.len(), "Batch user operation");
        Ok(BatchOutcome {
            ok: true,
            message: format!("{} {} user(s)", capitalize(verb), affected),
            affected,
            skipped: protected.len(),
        })
    }

    /// Mark a doctor verified or not; verification also grants the DOCTOR role.
    pub async fn verify_doctor(&self, user_id: i64, request: VerifyRequest) -> ServiceResult<DoctorProfile> {
        let account = self.reload(user_id).await?;
        let mut profile = self
            .store
            .find_doctor_profile(user_id)
            .await?
            .unwrap_or_else(|| DoctorProfile::empty(user_id));
        profile.verified = request.ok;
        let profile = self.store.save_doctor_profile(&profile).await?;

        if request.ok && account.role != Role::Doctor && account.role != Role::SuperAdmin {
            self.store.set_accounts_role(&[user_id], Role::Doctor).await?;
        }
        info!(account = user_id, verified = request.ok, "Doctor verification changed");
        Ok(profile)
    }

    async fn reload(&self, id: i64) -> ServiceResult<Account> {
        self.store
            .find_account(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn mutable_target(&self, id: i64) -> ServiceResult<Account> {
        let account = self.reload(id).await?;
        if account.role == Role::SuperAdmin {
            warn!(account = id, "Attempt to modify a super admin account");
            return Err(ServiceError::Forbidden(
                "Super admin accounts cannot be modified".to_string(),
            ));
        }
        Ok(account)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;

    fn batch(action: BatchAction, ids: Vec<i64>, role: Option<&str>) -> BatchRequest {
        BatchRequest {
            action,
            user_ids: ids,
            role: role.map(String::from),
        }
    }

    #[tokio::test]
    async fn batch_skips_super_admins() {
        let ctx = TestContext::new();
        let root = ctx.account(Role::SuperAdmin).await;
        let parent = ctx.account(Role::Parent).await;
        let doctor = ctx.account(Role::Doctor).await;

        let outcome = ctx
            .services
            .admin
            .batch(batch(BatchAction::Disable, vec![root.id, parent.id, doctor.id], None))
            .await
            .unwrap();
        assert_eq!(outcome.affected, 2);
        assert_eq!(outcome.skipped, 1);

        let root_row = ctx.store.find_account(root.id).await.unwrap().unwrap();
        assert!(root_row.enabled);
        let parent_row = ctx.store.find_account(parent.id).await.unwrap().unwrap();
        assert!(!parent_row.enabled);
    }

    #[tokio::test]
    async fn batch_of_only_super_admins_fails_without_mutation() {
        let ctx = TestContext::new();
        let root = ctx.account(Role::SuperAdmin).await;
        let result = ctx
            .services
            .admin
            .batch(batch(BatchAction::ChangeRole, vec![root.id], Some("PARENT")))
            .await;
        assert!(matches!(result, Err(ServiceError::InvalidInput { .. })));
        let row = ctx.store.find_account(root.id).await.unwrap().unwrap();
        assert_eq!(row.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn batch_rejects_empty_ids_and_missing_role() {
        let ctx = TestContext::new();
        let admin = &ctx.services.admin;
        assert!(admin.batch(batch(BatchAction::Delete, vec![], None)).await.is_err());

        let parent = ctx.account(Role::Parent).await;
        let result = admin.batch(batch(BatchAction::ChangeRole, vec![parent.id], None)).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn single_target_super_admin_is_forbidden() {
        let ctx = TestContext::new();
        let root = ctx.account(Role::SuperAdmin).await;
        let admin = &ctx.services.admin;

        assert!(matches!(admin.delete_user(root.id).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(
            admin.set_status(root.id, StatusRequest { enabled: false }).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            admin.change_role(root.id, RoleRequest { role: "PARENT".into() }).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(admin.delete_user(9999).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn reset_password_returns_usable_temp_password() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let reset = ctx.services.admin.reset_password(parent.id).await.unwrap();
        assert_eq!(reset.temp_password.len(), 8);

        let session = ctx
            .services
            .accounts
            .login(crate::services::accounts::LoginRequest {
                email: parent.email.clone(),
                phone: None,
                password: reset.temp_password,
            })
            .await
            .unwrap();
        assert_eq!(session.user.id, parent.id);
    }

    #[tokio::test]
    async fn verify_creates_profile_and_grants_doctor_role() {
        let ctx = TestContext::new();
        let applicant = ctx.account(Role::Parent).await;
        let profile = ctx
            .services
            .admin
            .verify_doctor(applicant.id, VerifyRequest { ok: true })
            .await
            .unwrap();
        assert!(profile.verified);
        let row = ctx.store.find_account(applicant.id).await.unwrap().unwrap();
        assert_eq!(row.role, Role::Doctor);
    }

    #[tokio::test]
    async fn admin_can_create_any_role() {
        let ctx = TestContext::new();
        let account = ctx
            .services
            .admin
            .create_user(CreateUserRequest {
                email: Some("ops@x.com".into()),
                phone: None,
                password: "password123".into(),
                role: "SUPER_ADMIN".into(),
                enabled: None,
            })
            .await
            .unwrap();
        assert_eq!(account.role, Role::SuperAdmin);
        assert!(account.enabled);

        let bad_role = ctx
            .services
            .admin
            .create_user(CreateUserRequest {
                email: Some("ops2@x.com".into()),
                phone: None,
                password: "password123".into(),
                role: "JANITOR".into(),
                enabled: None,
            })
            .await;
        assert!(matches!(bad_role, Err(ServiceError::InvalidInput { .. })));
    }
}
