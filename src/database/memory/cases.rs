use async_trait::async_trait;
use chrono::Utc;

use super::{paginate, MemoryStore, Tables};
use crate::database::manager::DatabaseError;
use crate::database::models::{CaseFile, CaseRecord, CaseStatus, NewCase, NewCaseFile};
use crate::database::repository::{CaseRepo, DbResult};
use crate::filter::PageRequest;

fn insert_files(tables: &mut Tables, case_id: i64, files: Vec<NewCaseFile>) {
    for file in files {
        let id = tables.next_id();
        tables.case_files.insert(
            id,
            CaseFile {
                id,
                case_id,
                original_name: file.original_name,
                mime_type: file.mime_type,
                size: file.size,
                storage_path: file.storage_path,
                is_encrypted: false,
                checksum: file.checksum,
                created_at: Utc::now(),
            },
        );
    }
}

fn with_files(tables: &Tables, record: &CaseRecord) -> CaseRecord {
    let mut record = record.clone();
    // Ids are allocated in insertion order, so map order is upload order.
    record.files = tables
        .case_files
        .values()
        .filter(|f| f.case_id == record.id)
        .cloned()
        .collect();
    record
}

#[async_trait]
impl CaseRepo for MemoryStore {
    async fn create_case(&self, new: NewCase, files: Vec<NewCaseFile>) -> DbResult<CaseRecord> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let record = CaseRecord {
            id,
            doctor_user_id: new.doctor_user_id,
            title: new.title,
            description: new.description,
            case_type: new.case_type,
            status: CaseStatus::Uploaded,
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.cases.insert(id, record.clone());
        insert_files(&mut tables, id, files);
        Ok(with_files(&tables, &record))
    }

    async fn find_case(&self, id: i64) -> DbResult<Option<CaseRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.cases.get(&id).map(|r| with_files(&tables, r)))
    }

    async fn list_cases(
        &self,
        doctor_user_id: i64,
        status: Option<CaseStatus>,
        page: PageRequest,
    ) -> DbResult<(Vec<CaseRecord>, i64)> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&CaseRecord> = tables
            .cases
            .values()
            .filter(|r| r.doctor_user_id == doctor_user_id)
            .filter(|r| status.map_or(true, |s| s == r.status))
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        let (rows, total) = paginate(rows, page);
        Ok((rows.into_iter().map(|r| with_files(&tables, r)).collect(), total))
    }

    async fn update_case(&self, record: &CaseRecord) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables.cases.get_mut(&record.id) {
            stored.title = record.title.clone();
            stored.description = record.description.clone();
            stored.case_type = record.case_type;
            stored.status = record.status;
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn add_case_files(&self, case_id: i64, files: Vec<NewCaseFile>) -> DbResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.cases.contains_key(&case_id) {
            return Err(DatabaseError::NotFound(format!("case {}", case_id)));
        }
        insert_files(&mut tables, case_id, files);
        if let Some(stored) = tables.cases.get_mut(&case_id) {
            stored.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_case_file(&self, case_id: i64, file_id: i64) -> DbResult<Option<CaseFile>> {
        let mut tables = self.tables.write().await;
        let belongs = tables
            .case_files
            .get(&file_id)
            .is_some_and(|f| f.case_id == case_id);
        Ok(if belongs {
            tables.case_files.remove(&file_id)
        } else {
            None
        })
    }

    async fn delete_case(&self, id: i64) -> DbResult<Vec<CaseFile>> {
        Ok(self.tables.write().await.remove_case(id))
    }
}
