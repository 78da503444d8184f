//! Doctor case records with attached files.
//!
//! Files reach this service already stored on disk. Whenever the database
//! write they belong to fails, they are removed again; removal failures are
//! only logged.

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use super::validate;
use super::{Ack, ServiceError, ServiceResult};
use crate::auth::Identity;
use crate::authz::OwnershipGuard;
use crate::database::models::{CaseRecord, CaseStatus, CaseType, NewCase, NewCaseFile, Role};
use crate::database::repository::CaseRepo;
use crate::database::Store;
use crate::filter::{limits, Page, PageRequest};
use crate::uploads::{StoredFile, UploadForm, UploadStore};

pub const MAX_FILES_PER_REQUEST: usize = 10;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CasePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub case_type: Option<String>,
    pub status: Option<String>,
}

fn to_new_file(stored: &StoredFile) -> NewCaseFile {
    NewCaseFile {
        original_name: stored.original_name.clone(),
        mime_type: stored.mime_type.clone(),
        size: stored.size as i64,
        storage_path: stored.relative_path.clone(),
        checksum: Some(stored.checksum.clone()),
    }
}

#[derive(Clone)]
pub struct CaseService {
    store: Arc<dyn Store>,
    uploads: UploadStore,
    guard: OwnershipGuard,
}

impl CaseService {
    pub fn new(store: Arc<dyn Store>, uploads: UploadStore, conceal: bool) -> Self {
        Self {
            store,
            uploads,
            guard: OwnershipGuard::new(&[Role::SuperAdmin], conceal),
        }
    }

    /// Create a case from a multipart form with `title`, `description`, `caseType` and files.
    pub async fn create(&self, caller: &Identity, form: UploadForm) -> ServiceResult<CaseRecord> {
        let paths = form.take_paths();
        match self.insert(caller, &form).await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.uploads.remove_all(paths).await;
                Err(e)
            }
        }
    }

    async fn insert(&self, caller: &Identity, form: &UploadForm) -> ServiceResult<CaseRecord> {
        let title = validate::text("title", form.text("title").unwrap_or_default(), 1, 200)?;
        let description = validate::optional_text("description", form.text("description"), 5000)?;
        let case_type = match form.text("caseType").map(str::trim).filter(|v| !v.is_empty()) {
            Some(value) => validate::parse_enum("caseType", value)?,
            None => CaseType::Online,
        };
        check_file_count(form.files.len())?;

        let record = self
            .store
            .create_case(
                NewCase {
                    doctor_user_id: caller.id,
                    title,
                    description,
                    case_type,
                },
                form.files.iter().map(to_new_file).collect(),
            )
            .await?;
        info!(case = record.id, doctor = caller.id, files = record.files.len(), "Case created");
        Ok(record)
    }

    pub async fn mine(&self, caller: &Identity, query: CaseQuery) -> ServiceResult<Page<CaseRecord>> {
        let status = validate::status_filter::<CaseStatus>("status", query.status.as_deref())?;
        let page = PageRequest::resolve(query.page, query.page_size, limits::CASES);
        let (items, total) = self.store.list_cases(caller.id, status, page).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn get(&self, caller: &Identity, id: i64) -> ServiceResult<CaseRecord> {
        let record = self.store.find_case(id).await?;
        self.guard.authorize(record, caller, "Case")
    }

    pub async fn update(&self, caller: &Identity, id: i64, patch: CasePatch) -> ServiceResult<CaseRecord> {
        let mut record = self.get(caller, id).await?;
        if let Some(title) = patch.title {
            record.title = validate::text("title", &title, 1, 200)?;
        }
        if let Some(description) = patch.description {
            record.description = validate::optional_text("description", Some(&description), 5000)?;
        }
        if let Some(case_type) = patch.case_type {
            record.case_type = validate::parse_enum("caseType", &case_type)?;
        }
        if let Some(status) = patch.status {
            record.status = validate::parse_enum("status", &status)?;
        }
        self.store.update_case(&record).await?;
        self.get(caller, id).await
    }

    /// Removes the record first; file unlinks are best effort.
    pub async fn delete(&self, caller: &Identity, id: i64) -> ServiceResult<Ack> {
        self.get(caller, id).await?;
        let files = self.store.delete_case(id).await?;
        self.uploads
            .remove_all(files.into_iter().map(|f| f.storage_path))
            .await;
        info!(case = id, by = caller.id, "Case deleted");
        Ok(Ack::ok("Case deleted"))
    }

    pub async fn add_files(&self, caller: &Identity, id: i64, form: UploadForm) -> ServiceResult<CaseRecord> {
        let paths = form.take_paths();
        let result = async {
            self.get(caller, id).await?;
            check_file_count(form.files.len())?;
            self.store
                .add_case_files(id, form.files.iter().map(to_new_file).collect())
                .await?;
            self.get(caller, id).await
        }
        .await;
        if result.is_err() {
            self.uploads.remove_all(paths).await;
        }
        result
    }

    pub async fn delete_file(&self, caller: &Identity, case_id: i64, file_id: i64) -> ServiceResult<Ack> {
        self.get(caller, case_id).await?;
        let file = self
            .store
            .delete_case_file(case_id, file_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("File"))?;
        self.uploads.remove(&file.storage_path).await;
        Ok(Ack::ok("File deleted"))
    }
}

fn check_file_count(count: usize) -> ServiceResult<()> {
    if count == 0 {
        return Err(ServiceError::invalid("files", "At least one file is required"));
    }
    if count > MAX_FILES_PER_REQUEST {
        return Err(ServiceError::invalid(
            "files",
            format!("At most {} files may be uploaded at once", MAX_FILES_PER_REQUEST),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestContext;
    use crate::uploads::UploadKind;

    async fn stored(ctx: &TestContext, owner: i64, name: &str) -> StoredFile {
        let mut pending = ctx
            .uploads
            .begin(UploadKind::CaseFile, owner, name, "application/pdf")
            .await
            .unwrap();
        pending.write(b"%PDF-1.4").await.unwrap();
        pending.finish().await.unwrap()
    }

    fn form(title: &str, files: Vec<StoredFile>) -> UploadForm {
        let mut form = UploadForm::default();
        form.fields.insert("title".into(), vec![title.into()]);
        form.files = files;
        form
    }

    #[tokio::test]
    async fn create_lists_and_deletes_with_files() {
        let ctx = TestContext::new();
        let doctor = ctx.doctor("Dr. Gao").await;
        let file = stored(&ctx, doctor.id, "report.pdf").await;
        let path = ctx.uploads.absolute(&file.relative_path);

        let record = ctx.services.cases.create(&doctor, form("Case A", vec![file])).await.unwrap();
        assert_eq!(record.status, CaseStatus::Uploaded);
        assert_eq!(record.files.len(), 1);
        assert_eq!(record.files[0].original_name, "report.pdf");
        assert_eq!(record.files[0].checksum.as_deref().map(str::len), Some(64));

        let page = ctx.services.cases.mine(&doctor, CaseQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);

        ctx.services.cases.delete(&doctor, record.id).await.unwrap();
        assert!(!path.exists());
        assert!(matches!(
            ctx.services.cases.get(&doctor, record.id).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_create_removes_stored_files() {
        let ctx = TestContext::new();
        let doctor = ctx.doctor("Dr. Gao").await;
        let file = stored(&ctx, doctor.id, "x.pdf").await;
        let path = ctx.uploads.absolute(&file.relative_path);

        let result = ctx.services.cases.create(&doctor, form("   ", vec![file])).await;
        assert!(matches!(result, Err(ServiceError::InvalidInput { .. })));
        assert!(!path.exists());

        let empty = ctx.services.cases.create(&doctor, form("No files", vec![])).await;
        assert!(matches!(empty, Err(ServiceError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn other_doctors_cannot_see_or_change_the_case() {
        let ctx = TestContext::new();
        let owner = ctx.doctor("Dr. Gao").await;
        let other = ctx.doctor("Dr. He").await;
        let file = stored(&ctx, owner.id, "a.pdf").await;
        let record = ctx.services.cases.create(&owner, form("Case A", vec![file])).await.unwrap();

        assert!(matches!(
            ctx.services.cases.get(&other, record.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        let patch = CasePatch {
            status: Some("approved".into()),
            ..Default::default()
        };
        assert!(ctx.services.cases.update(&other, record.id, patch.clone()).await.is_err());
        assert_eq!(
            ctx.services.cases.get(&owner, record.id).await.unwrap().status,
            CaseStatus::Uploaded
        );

        let admin = ctx.account(Role::SuperAdmin).await;
        let updated = ctx.services.cases.update(&admin, record.id, patch).await.unwrap();
        assert_eq!(updated.status, CaseStatus::Approved);
    }

    #[tokio::test]
    async fn files_can_be_appended_and_removed() {
        let ctx = TestContext::new();
        let doctor = ctx.doctor("Dr. Gao").await;
        let first = stored(&ctx, doctor.id, "a.pdf").await;
        let record = ctx.services.cases.create(&doctor, form("Case", vec![first])).await.unwrap();

        let second = stored(&ctx, doctor.id, "b.pdf").await;
        let mut extra = UploadForm::default();
        extra.files.push(second);
        let record = ctx.services.cases.add_files(&doctor, record.id, extra).await.unwrap();
        assert_eq!(record.files.len(), 2);

        let file_id = record.files[1].id;
        ctx.services.cases.delete_file(&doctor, record.id, file_id).await.unwrap();
        assert!(matches!(
            ctx.services.cases.delete_file(&doctor, record.id, file_id).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
