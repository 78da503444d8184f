use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

text_enum!(Gender {
    Male => "男",
    Female => "女",
    Unknown => "未知",
});

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub id: i64,
    pub parent_user_id: i64,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChild {
    pub parent_user_id: i64,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GrowthProfile {
    pub child_id: i64,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub last_physical_updated: Option<NaiveDate>,
    pub behavior_strengths: Vec<String>,
    pub behavior_challenges: Vec<String>,
    pub behavior_improvements: Vec<String>,
    pub daily_self_care: Option<i16>,
    pub daily_communication: Option<i16>,
    pub daily_social: Option<i16>,
    pub daily_motor: Option<i16>,
    pub updated_at: DateTime<Utc>,
}

impl GrowthProfile {
    pub fn empty(child_id: i64) -> Self {
        Self {
            child_id,
            height_cm: None,
            weight_kg: None,
            last_physical_updated: None,
            behavior_strengths: Vec::new(),
            behavior_challenges: Vec::new(),
            behavior_improvements: Vec::new(),
            daily_self_care: None,
            daily_communication: None,
            daily_social: None,
            daily_motor: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecord {
    pub id: i64,
    pub child_id: i64,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub record_type: String,
    pub description: Option<String>,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHealthRecord {
    pub child_id: i64,
    pub date: NaiveDate,
    pub record_type: String,
    pub description: Option<String>,
    pub result: Option<String>,
}
