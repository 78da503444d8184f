use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::ChildIntake;

text_enum!(TrainingType {
    Online => "online",
    Offline => "offline",
    Hybrid => "hybrid",
});

text_enum!(BookingStatus {
    Submitted => "submitted",
    Canceled => "canceled",
});

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Training {
    pub id: i64,
    pub doctor_user_id: i64,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub training_type: TrainingType,
    pub duration_hours: i32,
    pub max_participants: i32,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTraining {
    pub doctor_user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub training_type: TrainingType,
    pub duration_hours: i32,
    pub max_participants: i32,
    pub start_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TrainingView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub training: Training,
    pub doctor_name: Option<String>,
    pub doctor_hospital: Option<String>,
    pub doctor_title: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrainingOrder {
    #[default]
    Newest,
    SoonestStart,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingFilter {
    pub doctor_user_id: Option<i64>,
    /// Only sessions whose start falls on or after this calendar day.
    pub starting_from: Option<NaiveDate>,
    /// Matched against title, doctor name and hospital.
    pub keyword: Option<String>,
    pub training_type: Option<TrainingType>,
    pub order: TrainingOrder,
}

/// A doctor with at least one upcoming training.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingDoctor {
    pub doctor_id: i64,
    pub name: Option<String>,
    pub title: Option<String>,
    pub hospital: Option<String>,
    pub next_start_at: DateTime<Utc>,
    pub trainings_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub parent_user_id: i64,
    pub doctor_user_id: i64,
    pub training_id: i64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub intake: ChildIntake,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub parent_user_id: i64,
    pub doctor_user_id: i64,
    pub training_id: i64,
    pub intake: ChildIntake,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub booking: Booking,
    pub training_title: String,
    pub training_start_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub parent_user_id: Option<i64>,
    pub doctor_user_id: Option<i64>,
}
