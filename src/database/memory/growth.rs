use async_trait::async_trait;
use chrono::Utc;

use super::{paginate, MemoryStore};
use crate::database::manager::DatabaseError;
use crate::database::models::{Child, GrowthProfile, HealthRecord, NewChild, NewHealthRecord};
use crate::database::repository::{DbResult, GrowthRepo};
use crate::filter::PageRequest;

#[async_trait]
impl GrowthRepo for MemoryStore {
    async fn create_child(&self, new: NewChild) -> DbResult<Child> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let child = Child {
            id,
            parent_user_id: new.parent_user_id,
            name: new.name,
            gender: new.gender,
            birth_date: new.birth_date,
            avatar_url: new.avatar_url,
            created_at: now,
            updated_at: now,
        };
        tables.children.insert(id, child.clone());
        tables.growth_profiles.insert(id, GrowthProfile::empty(id));
        Ok(child)
    }

    async fn find_child(&self, id: i64) -> DbResult<Option<Child>> {
        Ok(self.tables.read().await.children.get(&id).cloned())
    }

    async fn list_children(&self, parent_user_id: i64) -> DbResult<Vec<Child>> {
        let tables = self.tables.read().await;
        Ok(tables
            .children
            .values()
            .filter(|c| c.parent_user_id == parent_user_id)
            .cloned()
            .collect())
    }

    async fn update_child(&self, child: &Child) -> DbResult<Child> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .children
            .get_mut(&child.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("child {}", child.id)))?;
        stored.name = child.name.clone();
        stored.gender = child.gender;
        stored.birth_date = child.birth_date;
        stored.avatar_url = child.avatar_url.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_child(&self, id: i64) -> DbResult<()> {
        self.tables.write().await.remove_child(id);
        Ok(())
    }

    async fn find_growth_profile(&self, child_id: i64) -> DbResult<Option<GrowthProfile>> {
        Ok(self.tables.read().await.growth_profiles.get(&child_id).cloned())
    }

    async fn save_growth_profile(&self, profile: &GrowthProfile) -> DbResult<GrowthProfile> {
        let mut tables = self.tables.write().await;
        if !tables.children.contains_key(&profile.child_id) {
            return Err(DatabaseError::NotFound(format!("child {}", profile.child_id)));
        }
        let mut saved = profile.clone();
        saved.updated_at = Utc::now();
        tables.growth_profiles.insert(saved.child_id, saved.clone());
        Ok(saved)
    }

    async fn create_health_record(&self, new: NewHealthRecord) -> DbResult<HealthRecord> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let record = HealthRecord {
            id,
            child_id: new.child_id,
            date: new.date,
            record_type: new.record_type,
            description: new.description,
            result: new.result,
            created_at: now,
            updated_at: now,
        };
        tables.health_records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_health_record(&self, id: i64) -> DbResult<Option<HealthRecord>> {
        Ok(self.tables.read().await.health_records.get(&id).cloned())
    }

    async fn list_health_records(
        &self,
        child_id: i64,
        page: PageRequest,
    ) -> DbResult<(Vec<HealthRecord>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<HealthRecord> = tables
            .health_records
            .values()
            .filter(|r| r.child_id == child_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.date, b.id).cmp(&(a.date, a.id)));
        Ok(paginate(rows, page))
    }

    async fn update_health_record(&self, record: &HealthRecord) -> DbResult<HealthRecord> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .health_records
            .get_mut(&record.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("health record {}", record.id)))?;
        stored.date = record.date;
        stored.record_type = record.record_type.clone();
        stored.description = record.description.clone();
        stored.result = record.result.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_health_record(&self, id: i64) -> DbResult<()> {
        self.tables.write().await.health_records.remove(&id);
        Ok(())
    }
}
