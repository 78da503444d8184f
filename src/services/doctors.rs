use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::validate;
use super::{ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::database::models::{DoctorProfile, DoctorSummary};
use crate::database::repository::{AccountRepo, VideoRepo};
use crate::database::Store;
use crate::filter::{limits, normalize_keyword, Page, PageRequest};
use crate::uploads::{StoredFile, UploadStore};

const AVATAR_URL_PREFIX: &str = "/static/avatars/";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub title: Option<String>,
    pub hospital: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorStats {
    pub video_count: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub profile_completeness: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarUpdated {
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryQuery {
    pub q: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Clone)]
pub struct DoctorService {
    store: Arc<dyn Store>,
    uploads: UploadStore,
}

impl DoctorService {
    pub fn new(store: Arc<dyn Store>, uploads: UploadStore) -> Self {
        Self { store, uploads }
    }

    /// The caller's profile, created empty on first access.
    pub async fn profile(&self, caller: &Identity) -> ServiceResult<DoctorProfile> {
        match self.store.find_doctor_profile(caller.id).await? {
            Some(profile) => Ok(profile),
            None => Ok(self
                .store
                .save_doctor_profile(&DoctorProfile::empty(caller.id))
                .await?),
        }
    }

    pub async fn update_profile(&self, caller: &Identity, patch: ProfilePatch) -> ServiceResult<DoctorProfile> {
        let mut profile = self.profile(caller).await?;
        if let Some(name) = patch.name {
            profile.name = validate::text("name", &name, 2, 20)?;
        }
        if let Some(age) = patch.age {
            profile.age = Some(validate::range("age", age, 18, 100)?);
        }
        if let Some(title) = patch.title {
            profile.title = Some(validate::text("title", &title, 2, 20)?);
        }
        if let Some(hospital) = patch.hospital {
            profile.hospital = validate::text("hospital", &hospital, 2, 50)?;
        }
        if let Some(phone) = patch.phone {
            profile.phone = Some(validate::phone("phone", &phone)?);
        }
        Ok(self.store.save_doctor_profile(&profile).await?)
    }

    /// Point the profile at a freshly stored avatar; the previous file is removed.
    pub async fn set_avatar(&self, caller: &Identity, stored: StoredFile) -> ServiceResult<AvatarUpdated> {
        let avatar_url = avatar_url(&stored.relative_path);
        let mut profile = match self.profile(caller).await {
            Ok(profile) => profile,
            Err(e) => {
                self.uploads.remove(&stored.relative_path).await;
                return Err(e);
            }
        };
        let previous = profile.avatar_url.replace(avatar_url.clone());

        if let Err(e) = self.store.save_doctor_profile(&profile).await {
            self.uploads.remove(&stored.relative_path).await;
            return Err(e.into());
        }
        if let Some(old) = previous.as_deref().and_then(|url| url.strip_prefix(AVATAR_URL_PREFIX)) {
            self.uploads.remove(&format!("avatars/{}", old)).await;
        }
        info!(doctor = caller.id, "Avatar updated");
        Ok(AvatarUpdated { avatar_url })
    }

    pub async fn stats(&self, caller: &Identity) -> ServiceResult<DoctorStats> {
        let totals = self.store.video_totals(caller.id).await?;
        let completeness = self
            .store
            .find_doctor_profile(caller.id)
            .await?
            .map(|p| p.completeness())
            .unwrap_or(0);
        Ok(DoctorStats {
            video_count: totals.video_count,
            total_views: totals.total_views,
            total_likes: totals.total_likes,
            profile_completeness: completeness,
        })
    }

    pub async fn directory(&self, query: DirectoryQuery) -> ServiceResult<Page<DoctorSummary>> {
        let page = PageRequest::resolve(query.page, query.page_size, limits::DOCTORS);
        let keyword = normalize_keyword(query.q.as_deref());
        let (items, total) = self.store.list_doctors(keyword.as_deref(), page).await?;
        Ok(Page::new(items, total, page))
    }
}

fn avatar_url(relative_path: &str) -> String {
    let file = relative_path.strip_prefix("avatars/").unwrap_or(relative_path);
    format!("{}{}", AVATAR_URL_PREFIX, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use crate::testing::TestContext;
    use crate::uploads::UploadKind;

    #[tokio::test]
    async fn profile_is_created_lazily() {
        let ctx = TestContext::new();
        let doctor = ctx.account(Role::Doctor).await;
        assert!(ctx.store.find_doctor_profile(doctor.id).await.unwrap().is_none());

        let profile = ctx.services.doctors.profile(&doctor).await.unwrap();
        assert_eq!(profile.user_id, doctor.id);
        assert!(ctx.store.find_doctor_profile(doctor.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn patch_is_validated() {
        let ctx = TestContext::new();
        let doctor = ctx.account(Role::Doctor).await;
        let doctors = &ctx.services.doctors;

        let too_young = ProfilePatch {
            age: Some(17),
            ..Default::default()
        };
        assert!(matches!(
            doctors.update_profile(&doctor, too_young).await,
            Err(ServiceError::InvalidInput { .. })
        ));

        let profile = doctors
            .update_profile(
                &doctor,
                ProfilePatch {
                    name: Some(" 王医生 ".into()),
                    hospital: Some("儿童医院".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.name, "王医生");
        assert!(profile.is_listed());
    }

    #[tokio::test]
    async fn duplicate_profile_phone_conflicts() {
        let ctx = TestContext::new();
        let first = ctx.account(Role::Doctor).await;
        let second = ctx.account(Role::Doctor).await;
        let phone = ProfilePatch {
            phone: Some("13900139000".into()),
            ..Default::default()
        };
        ctx.services.doctors.update_profile(&first, phone.clone()).await.unwrap();
        assert!(matches!(
            ctx.services.doctors.update_profile(&second, phone).await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn stats_report_completeness() {
        let ctx = TestContext::new();
        let doctor = ctx.doctor("Dr. Chen").await;
        let stats = ctx.services.doctors.stats(&doctor).await.unwrap();
        assert_eq!(stats.video_count, 0);
        assert_eq!(stats.profile_completeness, 60);
    }

    #[tokio::test]
    async fn avatar_replaces_previous_file() {
        let ctx = TestContext::new();
        let doctor = ctx.account(Role::Doctor).await;

        let mut first = ctx.uploads.begin(UploadKind::Avatar, doctor.id, "a.png", "image/png").await.unwrap();
        first.write(b"png").await.unwrap();
        let first = first.finish().await.unwrap();
        let first_path = ctx.uploads.absolute(&first.relative_path);
        let updated = ctx.services.doctors.set_avatar(&doctor, first).await.unwrap();
        assert!(updated.avatar_url.starts_with(&format!("/static/avatars/{}/", doctor.id)));

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let mut second = ctx.uploads.begin(UploadKind::Avatar, doctor.id, "b.png", "image/png").await.unwrap();
        second.write(b"png2").await.unwrap();
        let second = second.finish().await.unwrap();
        ctx.services.doctors.set_avatar(&doctor, second).await.unwrap();
        assert!(!first_path.exists());
    }

    #[tokio::test]
    async fn directory_lists_only_complete_profiles() {
        let ctx = TestContext::new();
        ctx.doctor("Dr. Listed").await;
        let unlisted = ctx.account(Role::Doctor).await;
        ctx.services.doctors.profile(&unlisted).await.unwrap();

        let page = ctx.services.doctors.directory(DirectoryQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Dr. Listed");
        assert_eq!(page.page_size, 10);
    }
}
