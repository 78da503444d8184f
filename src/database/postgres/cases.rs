use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Transaction};

use super::PgStore;
use crate::database::models::{CaseFile, CaseRecord, CaseStatus, NewCase, NewCaseFile};
use crate::database::repository::{CaseRepo, DbResult};
use crate::filter::PageRequest;

async fn insert_files(
    tx: &mut Transaction<'_, Postgres>,
    case_id: i64,
    files: Vec<NewCaseFile>,
) -> DbResult<()> {
    for file in files {
        sqlx::query(
            "INSERT INTO case_files (case_id, original_name, mime_type, size, storage_path, checksum) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(case_id)
        .bind(file.original_name)
        .bind(file.mime_type)
        .bind(file.size)
        .bind(file.storage_path)
        .bind(file.checksum)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

impl PgStore {
    async fn attach_files(&self, mut records: Vec<CaseRecord>) -> DbResult<Vec<CaseRecord>> {
        if records.is_empty() {
            return Ok(records);
        }
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        let files = sqlx::query_as::<_, CaseFile>(
            "SELECT * FROM case_files WHERE case_id = ANY($1) ORDER BY created_at ASC, id ASC",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<i64, Vec<CaseFile>> = HashMap::new();
        for file in files {
            grouped.entry(file.case_id).or_default().push(file);
        }
        for record in &mut records {
            record.files = grouped.remove(&record.id).unwrap_or_default();
        }
        Ok(records)
    }
}

#[async_trait]
impl CaseRepo for PgStore {
    async fn create_case(&self, new: NewCase, files: Vec<NewCaseFile>) -> DbResult<CaseRecord> {
        let mut tx = self.pool.begin().await?;
        let record = sqlx::query_as::<_, CaseRecord>(
            "INSERT INTO case_records (doctor_user_id, title, description, case_type, status) \
             VALUES ($1, $2, $3, $4, 'uploaded') RETURNING *",
        )
        .bind(new.doctor_user_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.case_type.as_str())
        .fetch_one(&mut *tx)
        .await?;
        insert_files(&mut tx, record.id, files).await?;
        tx.commit().await?;

        let mut records = self.attach_files(vec![record]).await?;
        Ok(records.remove(0))
    }

    async fn find_case(&self, id: i64) -> DbResult<Option<CaseRecord>> {
        let record = sqlx::query_as::<_, CaseRecord>("SELECT * FROM case_records WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match record {
            Some(record) => Ok(self.attach_files(vec![record]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_cases(
        &self,
        doctor_user_id: i64,
        status: Option<CaseStatus>,
        page: PageRequest,
    ) -> DbResult<(Vec<CaseRecord>, i64)> {
        let filtered = |head: &str| {
            let mut qb = QueryBuilder::<Postgres>::new(head);
            qb.push(" FROM case_records WHERE doctor_user_id = ")
                .push_bind(doctor_user_id);
            if let Some(status) = status {
                qb.push(" AND status = ").push_bind(status.as_str());
            }
            qb
        };

        let total: i64 = filtered("SELECT COUNT(*)")
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = filtered("SELECT *");
        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let records = qb
            .build_query_as::<CaseRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok((self.attach_files(records).await?, total))
    }

    async fn update_case(&self, record: &CaseRecord) -> DbResult<()> {
        sqlx::query(
            "UPDATE case_records SET title = $2, description = $3, case_type = $4, status = $5, \
                 updated_at = now() WHERE id = $1",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(&record.description)
        .bind(record.case_type.as_str())
        .bind(record.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn add_case_files(&self, case_id: i64, files: Vec<NewCaseFile>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_files(&mut tx, case_id, files).await?;
        sqlx::query("UPDATE case_records SET updated_at = now() WHERE id = $1")
            .bind(case_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_case_file(&self, case_id: i64, file_id: i64) -> DbResult<Option<CaseFile>> {
        let file = sqlx::query_as::<_, CaseFile>(
            "DELETE FROM case_files WHERE id = $1 AND case_id = $2 RETURNING *",
        )
        .bind(file_id)
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(file)
    }

    async fn delete_case(&self, id: i64) -> DbResult<Vec<CaseFile>> {
        let mut tx = self.pool.begin().await?;
        let files =
            sqlx::query_as::<_, CaseFile>("DELETE FROM case_files WHERE case_id = $1 RETURNING *")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        sqlx::query("DELETE FROM case_records WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(files)
    }
}
