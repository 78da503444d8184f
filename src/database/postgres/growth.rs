use async_trait::async_trait;

use super::PgStore;
use crate::database::models::{Child, GrowthProfile, HealthRecord, NewChild, NewHealthRecord};
use crate::database::repository::{DbResult, GrowthRepo};
use crate::filter::PageRequest;

#[async_trait]
impl GrowthRepo for PgStore {
    async fn create_child(&self, new: NewChild) -> DbResult<Child> {
        let mut tx = self.pool.begin().await?;
        let child = sqlx::query_as::<_, Child>(
            "INSERT INTO children (parent_user_id, name, gender, birth_date, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.parent_user_id)
        .bind(new.name)
        .bind(new.gender.as_str())
        .bind(new.birth_date)
        .bind(new.avatar_url)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO growth_profiles (child_id) VALUES ($1)")
            .bind(child.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(child)
    }

    async fn find_child(&self, id: i64) -> DbResult<Option<Child>> {
        let child = sqlx::query_as::<_, Child>("SELECT * FROM children WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(child)
    }

    async fn list_children(&self, parent_user_id: i64) -> DbResult<Vec<Child>> {
        let children = sqlx::query_as::<_, Child>(
            "SELECT * FROM children WHERE parent_user_id = $1 ORDER BY id ASC",
        )
        .bind(parent_user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(children)
    }

    async fn update_child(&self, child: &Child) -> DbResult<Child> {
        let updated = sqlx::query_as::<_, Child>(
            "UPDATE children SET name = $2, gender = $3, birth_date = $4, avatar_url = $5, \
                 updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(child.id)
        .bind(&child.name)
        .bind(child.gender.as_str())
        .bind(child.birth_date)
        .bind(&child.avatar_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_child(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM children WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_growth_profile(&self, child_id: i64) -> DbResult<Option<GrowthProfile>> {
        let profile =
            sqlx::query_as::<_, GrowthProfile>("SELECT * FROM growth_profiles WHERE child_id = $1")
                .bind(child_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(profile)
    }

    async fn save_growth_profile(&self, profile: &GrowthProfile) -> DbResult<GrowthProfile> {
        let saved = sqlx::query_as::<_, GrowthProfile>(
            "INSERT INTO growth_profiles \
                 (child_id, height_cm, weight_kg, last_physical_updated, behavior_strengths, \
                  behavior_challenges, behavior_improvements, daily_self_care, \
                  daily_communication, daily_social, daily_motor, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now()) \
             ON CONFLICT (child_id) DO UPDATE SET \
                 height_cm = EXCLUDED.height_cm, weight_kg = EXCLUDED.weight_kg, \
                 last_physical_updated = EXCLUDED.last_physical_updated, \
                 behavior_strengths = EXCLUDED.behavior_strengths, \
                 behavior_challenges = EXCLUDED.behavior_challenges, \
                 behavior_improvements = EXCLUDED.behavior_improvements, \
                 daily_self_care = EXCLUDED.daily_self_care, \
                 daily_communication = EXCLUDED.daily_communication, \
                 daily_social = EXCLUDED.daily_social, daily_motor = EXCLUDED.daily_motor, \
                 updated_at = now() \
             RETURNING *",
        )
        .bind(profile.child_id)
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.last_physical_updated)
        .bind(&profile.behavior_strengths)
        .bind(&profile.behavior_challenges)
        .bind(&profile.behavior_improvements)
        .bind(profile.daily_self_care)
        .bind(profile.daily_communication)
        .bind(profile.daily_social)
        .bind(profile.daily_motor)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn create_health_record(&self, new: NewHealthRecord) -> DbResult<HealthRecord> {
        let record = sqlx::query_as::<_, HealthRecord>(
            "INSERT INTO health_records (child_id, date, type, description, result) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.child_id)
        .bind(new.date)
        .bind(new.record_type)
        .bind(new.description)
        .bind(new.result)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_health_record(&self, id: i64) -> DbResult<Option<HealthRecord>> {
        let record = sqlx::query_as::<_, HealthRecord>("SELECT * FROM health_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    async fn list_health_records(
        &self,
        child_id: i64,
        page: PageRequest,
    ) -> DbResult<(Vec<HealthRecord>, i64)> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM health_records WHERE child_id = $1")
                .bind(child_id)
                .fetch_one(&self.pool)
                .await?;
        let items = sqlx::query_as::<_, HealthRecord>(
            "SELECT * FROM health_records WHERE child_id = $1 \
             ORDER BY date DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(child_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok((items, total))
    }

    async fn update_health_record(&self, record: &HealthRecord) -> DbResult<HealthRecord> {
        let updated = sqlx::query_as::<_, HealthRecord>(
            "UPDATE health_records SET date = $2, type = $3, description = $4, result = $5, \
                 updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(record.id)
        .bind(record.date)
        .bind(&record.record_type)
        .bind(&record.description)
        .bind(&record.result)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_health_record(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM health_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
