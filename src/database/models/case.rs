use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

text_enum!(CaseStatus {
    Uploaded => "uploaded",
    Reviewed => "reviewed",
    Approved => "approved",
    Rejected => "rejected",
});

text_enum!(CaseType {
    Online => "online",
    Offline => "offline",
});

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    pub id: i64,
    pub doctor_user_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub case_type: CaseType,
    #[sqlx(try_from = "String")]
    pub status: CaseStatus,
    #[sqlx(skip)]
    pub files: Vec<CaseFile>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CaseFile {
    pub id: i64,
    pub case_id: i64,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub is_encrypted: bool,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCase {
    pub doctor_user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub case_type: CaseType,
}

#[derive(Debug, Clone)]
pub struct NewCaseFile {
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub storage_path: String,
    pub checksum: Option<String>,
}
