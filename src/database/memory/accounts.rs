use async_trait::async_trait;
use chrono::Utc;

use super::{paginate, MemoryStore, Tables};
use crate::database::manager::DatabaseError;
use crate::database::models::{
    Account, AccountWithProfile, DoctorProfile, DoctorSummary, NewAccount, Role,
};
use crate::database::repository::{AccountRepo, DbResult};
use crate::filter::{contains_keyword, PageRequest};

fn check_account_unique(tables: &Tables, email: Option<&str>, phone: Option<&str>) -> DbResult<()> {
    for account in tables.users.values() {
        if email.is_some() && account.email.as_deref() == email {
            return Err(DatabaseError::Conflict("users_email_key".to_string()));
        }
        if phone.is_some() && account.phone.as_deref() == phone {
            return Err(DatabaseError::Conflict("users_phone_key".to_string()));
        }
    }
    Ok(())
}

#[async_trait]
impl AccountRepo for MemoryStore {
    async fn create_account(&self, new: NewAccount) -> DbResult<Account> {
        let mut tables = self.tables.write().await;
        check_account_unique(&tables, new.email.as_deref(), new.phone.as_deref())?;

        let id = tables.next_id();
        let account = Account {
            id,
            email: new.email,
            phone: new.phone,
            password_hash: Some(new.password_hash),
            role: new.role,
            enabled: new.enabled,
            created_at: Utc::now(),
        };
        tables.users.insert(id, account.clone());
        Ok(account)
    }

    async fn find_account(&self, id: i64) -> DbResult<Option<Account>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_account_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|a| a.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_account_by_phone(&self, phone: &str) -> DbResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|a| a.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_accounts(&self, ids: &[i64]) -> DbResult<Vec<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn list_accounts(&self) -> DbResult<Vec<AccountWithProfile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .rev()
            .map(|account| AccountWithProfile {
                account: account.clone(),
                doctor_profile: tables.doctor_profile(account.id).cloned(),
            })
            .collect())
    }

    async fn set_accounts_role(&self, ids: &[i64], role: Role) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for account in tables.users.values_mut().filter(|a| ids.contains(&a.id)) {
            account.role = role;
            affected += 1;
        }
        Ok(affected)
    }

    async fn set_accounts_enabled(&self, ids: &[i64], enabled: bool) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for account in tables.users.values_mut().filter(|a| ids.contains(&a.id)) {
            account.enabled = enabled;
            affected += 1;
        }
        Ok(affected)
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(account) = tables.users.get_mut(&id) {
            account.password_hash = Some(password_hash.to_string());
        }
        Ok(())
    }

    async fn delete_accounts(&self, ids: &[i64]) -> DbResult<u64> {
        let mut tables = self.tables.write().await;
        let mut affected = 0;
        for id in ids {
            if tables.remove_user(*id) {
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn find_doctor_profile(&self, user_id: i64) -> DbResult<Option<DoctorProfile>> {
        Ok(self.tables.read().await.doctor_profile(user_id).cloned())
    }

    async fn save_doctor_profile(&self, profile: &DoctorProfile) -> DbResult<DoctorProfile> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(DatabaseError::NotFound(format!("user {}", profile.user_id)));
        }
        if let Some(phone) = profile.phone.as_deref() {
            let taken = tables
                .doctor_profiles
                .values()
                .any(|p| p.user_id != profile.user_id && p.phone.as_deref() == Some(phone));
            if taken {
                return Err(DatabaseError::Conflict("doctor_profiles_phone_key".to_string()));
            }
        }
        tables
            .doctor_profiles
            .insert(profile.user_id, profile.clone());
        Ok(profile.clone())
    }

    async fn list_doctors(
        &self,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> DbResult<(Vec<DoctorSummary>, i64)> {
        let tables = self.tables.read().await;
        let rows = tables
            .doctor_profiles
            .values()
            .rev()
            .filter(|profile| {
                tables
                    .users
                    .get(&profile.user_id)
                    .is_some_and(|a| a.role == Role::Doctor && a.enabled)
            })
            .filter(|profile| profile.is_listed())
            .filter(|profile| match keyword {
                Some(kw) => {
                    contains_keyword(Some(&profile.name), kw)
                        || contains_keyword(Some(&profile.hospital), kw)
                        || contains_keyword(profile.title.as_deref(), kw)
                }
                None => true,
            })
            .map(|profile| DoctorSummary {
                doctor_id: profile.user_id,
                name: profile.name.clone(),
                title: profile.title.clone(),
                hospital: profile.hospital.clone(),
            })
            .collect();
        Ok(paginate(rows, page))
    }
}
