//! Children, their growth profiles and health records.
//!
//! Everything here belongs to the parent who registered the child; profiles
//! and health records are checked through their child.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::validate;
use super::{Ack, ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::authz::OwnershipGuard;
use crate::database::models::{Child, Gender, GrowthProfile, HealthRecord, NewChild, NewHealthRecord};
use crate::database::repository::GrowthRepo;
use crate::database::Store;
use crate::filter::{limits, Page, PageRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRequest {
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildPatch {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub avatar_url: Option<String>,
}

/// Flat partial update merged over the stored profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub last_physical_updated: Option<String>,
    pub behavior_strengths: Option<Vec<String>>,
    pub behavior_challenges: Option<Vec<String>>,
    pub behavior_improvements: Option<Vec<String>>,
    pub daily_self_care: Option<i16>,
    pub daily_communication: Option<i16>,
    pub daily_social: Option<i16>,
    pub daily_motor: Option<i16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordRequest {
    pub date: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub description: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordPatch {
    pub date: Option<String>,
    #[serde(rename = "type")]
    pub record_type: Option<String>,
    pub description: Option<String>,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildBrief {
    pub id: i64,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDevelopment {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub last_updated: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BehaviorObservation {
    pub strengths: Vec<String>,
    pub challenges: Vec<String>,
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySkills {
    pub self_care: i16,
    pub communication: i16,
    pub social: i16,
    pub motor: i16,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    pub physical_development: PhysicalDevelopment,
    pub behavior_observation: BehaviorObservation,
    pub daily_skills: DailySkills,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub child: ChildBrief,
    pub current_status: CurrentStatus,
}

impl ProfileView {
    fn build(child: Child, profile: GrowthProfile) -> Self {
        Self {
            child: ChildBrief {
                id: child.id,
                name: child.name,
                gender: child.gender,
                birth_date: child.birth_date,
                avatar_url: child.avatar_url,
            },
            current_status: CurrentStatus {
                physical_development: PhysicalDevelopment {
                    height: profile.height_cm,
                    weight: profile.weight_kg,
                    last_updated: profile.last_physical_updated,
                },
                behavior_observation: BehaviorObservation {
                    strengths: profile.behavior_strengths,
                    challenges: profile.behavior_challenges,
                    improvements: profile.behavior_improvements,
                },
                daily_skills: DailySkills {
                    self_care: profile.daily_self_care.unwrap_or(0),
                    communication: profile.daily_communication.unwrap_or(0),
                    social: profile.daily_social.unwrap_or(0),
                    motor: profile.daily_motor.unwrap_or(0),
                },
            },
        }
    }
}

fn behaviour(field: &str, values: Option<Vec<String>>, current: &mut Vec<String>) -> ServiceResult<()> {
    if let Some(values) = values {
        *current = validate::list(field, &values, 20, 50)?;
    }
    Ok(())
}

fn skill(field: &str, value: Option<i16>, current: &mut Option<i16>) -> ServiceResult<()> {
    if let Some(value) = value {
        *current = Some(validate::range(field, value, 0, 100)?);
    }
    Ok(())
}

#[derive(Clone)]
pub struct GrowthService {
    store: Arc<dyn Store>,
    guard: OwnershipGuard,
}

impl GrowthService {
    pub fn new(store: Arc<dyn Store>, conceal: bool) -> Self {
        Self {
            store,
            guard: OwnershipGuard::owner_only(conceal),
        }
    }

    pub async fn children(&self, caller: &Identity) -> ServiceResult<Vec<Child>> {
        Ok(self.store.list_children(caller.id).await?)
    }

    pub async fn create_child(&self, caller: &Identity, req: ChildRequest) -> ServiceResult<Child> {
        let new = NewChild {
            parent_user_id: caller.id,
            name: validate::text("name", &req.name, 1, 50)?,
            gender: validate::parse_enum("gender", &req.gender)?,
            birth_date: validate::date("birthDate", &req.birth_date)?,
            avatar_url: validate::optional_text("avatarUrl", req.avatar_url.as_deref(), 255)?,
        };
        let child = self.store.create_child(new).await?;
        info!(child = child.id, parent = caller.id, "Child registered");
        Ok(child)
    }

    pub async fn child(&self, caller: &Identity, id: i64) -> ServiceResult<Child> {
        let child = self.store.find_child(id).await?;
        self.guard.authorize(child, caller, "Child")
    }

    pub async fn update_child(&self, caller: &Identity, id: i64, patch: ChildPatch) -> ServiceResult<Child> {
        let mut child = self.child(caller, id).await?;
        if let Some(name) = patch.name {
            child.name = validate::text("name", &name, 1, 50)?;
        }
        if let Some(gender) = patch.gender {
            child.gender = validate::parse_enum("gender", &gender)?;
        }
        if let Some(birth_date) = patch.birth_date {
            child.birth_date = validate::date("birthDate", &birth_date)?;
        }
        if let Some(avatar_url) = patch.avatar_url {
            child.avatar_url = validate::optional_text("avatarUrl", Some(&avatar_url), 255)?;
        }
        Ok(self.store.update_child(&child).await?)
    }

    /// Deletes the child with its profile and health records.
    pub async fn delete_child(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        self.child(caller, id).await?;
        self.store.delete_child(id).await?;
        info!(child = id, parent = caller.id, "Child deleted");
        Ok(Ack::ok("Child deleted"))
    }

    pub async fn profile(&self, caller: &Identity, child_id: i64) -> ServiceResult<ProfileView> {
        let child = self.child(caller, child_id).await?;
        let profile = self
            .store
            .find_growth_profile(child_id)
            .await?
            .unwrap_or_else(|| GrowthProfile::empty(child_id));
        Ok(ProfileView::build(child, profile))
    }

    pub async fn update_profile(
        &self,
        caller: &Identity,
        child_id: i64,
        patch: ProfilePatch,
    ) -> ServiceResult<ProfileView> {
        let child = self.child(caller, child_id).await?;
        let mut profile = self
            .store
            .find_growth_profile(child_id)
            .await?
            .unwrap_or_else(|| GrowthProfile::empty(child_id));

        let measured = patch.height_cm.is_some() || patch.weight_kg.is_some();
        if let Some(height) = patch.height_cm {
            profile.height_cm = Some(validate::range("heightCm", height, 20.0, 200.0)?);
        }
        if let Some(weight) = patch.weight_kg {
            profile.weight_kg = Some(validate::range("weightKg", weight, 5.0, 100.0)?);
        }
        match patch.last_physical_updated.as_deref() {
            Some(value) => profile.last_physical_updated = Some(validate::date("lastPhysicalUpdated", value)?),
            None if measured => profile.last_physical_updated = Some(Utc::now().date_naive()),
            None => {}
        }
        behaviour("behaviorStrengths", patch.behavior_strengths, &mut profile.behavior_strengths)?;
        behaviour("behaviorChallenges", patch.behavior_challenges, &mut profile.behavior_challenges)?;
        behaviour(
            "behaviorImprovements",
            patch.behavior_improvements,
            &mut profile.behavior_improvements,
        )?;
        skill("dailySelfCare", patch.daily_self_care, &mut profile.daily_self_care)?;
        skill("dailyCommunication", patch.daily_communication, &mut profile.daily_communication)?;
        skill("dailySocial", patch.daily_social, &mut profile.daily_social)?;
        skill("dailyMotor", patch.daily_motor, &mut profile.daily_motor)?;
        profile.updated_at = Utc::now();

        let saved = self.store.save_growth_profile(&profile).await?;
        Ok(ProfileView::build(child, saved))
    }

    pub async fn health_records(
        &self,
        caller: &Identity,
        child_id: i64,
        query: RecordQuery,
    ) -> ServiceResult<Page<HealthRecord>> {
        self.child(caller, child_id).await?;
        let page = PageRequest::resolve(query.page, query.page_size, limits::HEALTH_RECORDS);
        let (items, total) = self.store.list_health_records(child_id, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn create_health_record(
        &self,
        caller: &Identity,
        child_id: i64,
        req: HealthRecordRequest,
    ) -> ServiceResult<HealthRecord> {
        self.child(caller, child_id).await?;
        let new = NewHealthRecord {
            child_id,
            date: validate::date("date", &req.date)?,
            record_type: validate::text("type", &req.record_type, 1, 50)?,
            description: validate::optional_text("description", req.description.as_deref(), 1000)?,
            result: validate::optional_text("result", req.result.as_deref(), 500)?,
        };
        Ok(self.store.create_health_record(new).await?)
    }

    async fn health_record(&self, caller: &Identity, id: i64) -> ServiceResult<HealthRecord> {
        let record = self
            .store
            .find_health_record(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Health record"))?;
        // Foreign records surface with the child's outcome.
        self.child(caller, record.child_id).await?;
        Ok(record)
    }

    pub async fn update_health_record(
        &self,
        caller: &Identity,
        id: i64,
        patch: HealthRecordPatch,
    ) -> ServiceResult<HealthRecord> {
        let mut record = self.health_record(caller, id).await?;
        if let Some(date) = patch.date {
            record.date = validate::date("date", &date)?;
        }
        if let Some(record_type) = patch.record_type {
            record.record_type = validate::text("type", &record_type, 1, 50)?;
        }
        if let Some(description) = patch.description {
            record.description = validate::optional_text("description", Some(&description), 1000)?;
        }
        if let Some(result) = patch.result {
            record.result = validate::optional_text("result", Some(&result), 500)?;
        }
        Ok(self.store.update_health_record(&record).await?)
    }

    pub async fn delete_health_record(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        self.health_record(caller, id).await?;
        self.store.delete_health_record(id).await?;
        Ok(Ack::ok("Health record deleted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::testing::TestContext;

    fn child_request(name: &str) -> ChildRequest {
        ChildRequest {
            name: name.to_string(),
            gender: "女".to_string(),
            birth_date: "2019-05-01".to_string(),
            avatar_url: None,
        }
    }

    fn record_request(date: &str) -> HealthRecordRequest {
        HealthRecordRequest {
            date: date.to_string(),
            record_type: "checkup".to_string(),
            description: Some("Annual checkup".to_string()),
            result: None,
        }
    }

    #[tokio::test]
    async fn child_starts_with_an_empty_profile() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let child = ctx.services.growth.create_child(&parent, child_request("Xiao Hong")).await.unwrap();
        assert_eq!(child.gender, Gender::Female);

        let view = ctx.services.growth.profile(&parent, child.id).await.unwrap();
        assert_eq!(view.child.name, "Xiao Hong");
        assert_eq!(view.current_status.daily_skills.motor, 0);
        assert!(view.current_status.behavior_observation.strengths.is_empty());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["currentStatus"]["physicalDevelopment"]["height"].is_null());
        assert_eq!(json["currentStatus"]["dailySkills"]["selfCare"], 0);
    }

    #[tokio::test]
    async fn invalid_child_fields_are_rejected() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let mut req = child_request("Xiao Hong");
        req.gender = "girl".into();
        assert!(matches!(
            ctx.services.growth.create_child(&parent, req).await,
            Err(ServiceError::InvalidInput { .. })
        ));
        let mut req = child_request("Xiao Hong");
        req.birth_date = "yesterday".into();
        assert!(ctx.services.growth.create_child(&parent, req).await.is_err());
        assert!(ctx.services.growth.children(&parent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_patch_merges_and_stamps_measurements() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let child = ctx.services.growth.create_child(&parent, child_request("Xiao Hong")).await.unwrap();

        let patch = ProfilePatch {
            height_cm: Some(112.5),
            behavior_strengths: Some(vec!["drawing".into(), "music".into()]),
            daily_social: Some(70),
            ..Default::default()
        };
        let view = ctx.services.growth.update_profile(&parent, child.id, patch).await.unwrap();
        let physical = &view.current_status.physical_development;
        assert_eq!(physical.height, Some(112.5));
        assert_eq!(physical.last_updated, Some(Utc::now().date_naive()));

        let patch = ProfilePatch {
            daily_motor: Some(40),
            ..Default::default()
        };
        let view = ctx.services.growth.update_profile(&parent, child.id, patch).await.unwrap();
        assert_eq!(view.current_status.physical_development.height, Some(112.5));
        assert_eq!(view.current_status.daily_skills.social, 70);
        assert_eq!(view.current_status.daily_skills.motor, 40);
        assert_eq!(view.current_status.behavior_observation.strengths.len(), 2);

        let bad = ProfilePatch {
            weight_kg: Some(150.0),
            ..Default::default()
        };
        assert!(ctx.services.growth.update_profile(&parent, child.id, bad).await.is_err());
        let bad = ProfilePatch {
            daily_self_care: Some(101),
            ..Default::default()
        };
        assert!(ctx.services.growth.update_profile(&parent, child.id, bad).await.is_err());
    }

    #[tokio::test]
    async fn health_records_are_scoped_to_the_childs_parent() {
        let ctx = TestContext::new();
        let parent = ctx.account(Role::Parent).await;
        let stranger = ctx.account(Role::Parent).await;
        let child = ctx.services.growth.create_child(&parent, child_request("Xiao Hong")).await.unwrap();

        ctx.services
            .growth
            .create_health_record(&parent, child.id, record_request("2024-01-10"))
            .await
            .unwrap();
        let latest = ctx
            .services
            .growth
            .create_health_record(&parent, child.id, record_request("2024-06-10"))
            .await
            .unwrap();

        let page = ctx
            .services
            .growth
            .health_records(&parent, child.id, RecordQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id, latest.id);

        assert!(matches!(
            ctx.services
                .growth
                .create_health_record(&stranger, child.id, record_request("2024-02-01"))
                .await,
            Err(ServiceError::Forbidden(_))
        ));
        let patch = HealthRecordPatch {
            result: Some("normal".into()),
            ..Default::default()
        };
        assert!(matches!(
            ctx.services.growth.update_health_record(&stranger, latest.id, patch.clone()).await,
            Err(ServiceError::Forbidden(_))
        ));
        let updated = ctx
            .services
            .growth
            .update_health_record(&parent, latest.id, patch)
            .await
            .unwrap();
        assert_eq!(updated.result.as_deref(), Some("normal"));

        ctx.services.growth.delete_health_record(&parent, latest.id).await.unwrap();
        assert!(matches!(
            ctx.services.growth.delete_health_record(&parent, latest.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn concealment_hides_foreign_children() {
        let ctx = TestContext::with_config(|c| c.security.conceal_foreign_records = true);
        let parent = ctx.account(Role::Parent).await;
        let stranger = ctx.account(Role::Parent).await;
        let child = ctx.services.growth.create_child(&parent, child_request("Xiao Hong")).await.unwrap();

        assert!(matches!(
            ctx.services.growth.child(&stranger, child.id).await,
            Err(ServiceError::NotFound(_))
        ));
        ctx.services.growth.delete_child(&parent, child.id).await.unwrap();
        assert!(ctx.services.growth.children(&parent).await.unwrap().is_empty());
    }
}
