use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::database::models::{
    Account, AccountWithProfile, DoctorProfile, DoctorSummary, NewAccount, Role,
};
use crate::database::repository::{AccountRepo, DbResult};
use crate::filter::{like_pattern, PageRequest};

fn doctor_directory<'a>(head: &str, keyword: Option<&'a str>) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(head);
    qb.push(
        " FROM doctor_profiles dp JOIN users u ON u.id = dp.user_id \
          WHERE u.role = 'DOCTOR' AND u.enabled \
          AND btrim(dp.name) <> '' AND btrim(dp.hospital) <> ''",
    );
    if let Some(keyword) = keyword {
        let pattern = like_pattern(keyword);
        qb.push(" AND (dp.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR dp.hospital ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR dp.title ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb
}

#[async_trait]
impl AccountRepo for PgStore {
    async fn create_account(&self, new: NewAccount) -> DbResult<Account> {
        let account = sqlx::query_as::<_, Account>(
            "INSERT INTO users (email, phone, password_hash, role, enabled) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, email, phone, password_hash, role, enabled, created_at",
        )
        .bind(new.email)
        .bind(new.phone)
        .bind(new.password_hash)
        .bind(new.role.as_str())
        .bind(new.enabled)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_account(&self, id: i64) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_account_by_phone(&self, phone: &str) -> DbResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn find_accounts(&self, ids: &[i64]) -> DbResult<Vec<Account>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let accounts =
            sqlx::query_as::<_, Account>("SELECT * FROM users WHERE id = ANY($1) ORDER BY id")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;
        Ok(accounts)
    }

    async fn list_accounts(&self) -> DbResult<Vec<AccountWithProfile>> {
        let accounts = sqlx::query_as::<_, Account>("SELECT * FROM users ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        let mut profiles: HashMap<i64, DoctorProfile> =
            sqlx::query_as::<_, DoctorProfile>("SELECT * FROM doctor_profiles")
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|profile| (profile.user_id, profile))
                .collect();

        Ok(accounts
            .into_iter()
            .map(|account| AccountWithProfile {
                doctor_profile: profiles.remove(&account.id),
                account,
            })
            .collect())
    }

    async fn set_accounts_role(&self, ids: &[i64], role: Role) -> DbResult<u64> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_accounts_enabled(&self, ids: &[i64], enabled: bool) -> DbResult<u64> {
        let result = sqlx::query("UPDATE users SET enabled = $2 WHERE id = ANY($1)")
            .bind(ids)
            .bind(enabled)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_password_hash(&self, id: i64, password_hash: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_accounts(&self, ids: &[i64]) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_doctor_profile(&self, user_id: i64) -> DbResult<Option<DoctorProfile>> {
        let profile =
            sqlx::query_as::<_, DoctorProfile>("SELECT * FROM doctor_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(profile)
    }

    async fn save_doctor_profile(&self, profile: &DoctorProfile) -> DbResult<DoctorProfile> {
        let saved = sqlx::query_as::<_, DoctorProfile>(
            "INSERT INTO doctor_profiles \
                 (user_id, name, hospital, title, age, phone, avatar_url, verified) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 name = EXCLUDED.name, hospital = EXCLUDED.hospital, title = EXCLUDED.title, \
                 age = EXCLUDED.age, phone = EXCLUDED.phone, avatar_url = EXCLUDED.avatar_url, \
                 verified = EXCLUDED.verified \
             RETURNING *",
        )
        .bind(profile.user_id)
        .bind(&profile.name)
        .bind(&profile.hospital)
        .bind(&profile.title)
        .bind(profile.age)
        .bind(&profile.phone)
        .bind(&profile.avatar_url)
        .bind(profile.verified)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn list_doctors(
        &self,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> DbResult<(Vec<DoctorSummary>, i64)> {
        let total: i64 = doctor_directory("SELECT COUNT(*)", keyword)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = doctor_directory(
            "SELECT dp.user_id AS doctor_id, dp.name, dp.title, dp.hospital",
            keyword,
        );
        qb.push(" ORDER BY dp.user_id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items = qb
            .build_query_as::<DoctorSummary>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }
}
