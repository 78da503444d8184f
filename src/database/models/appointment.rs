use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

text_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Rejected => "rejected",
    Completed => "completed",
    Cancelled => "cancelled",
});

/// Child and guardian details shared by appointment and training-booking forms.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChildIntake {
    pub child_name: String,
    pub child_age: i32,
    pub child_gender: String,
    pub parent_name: String,
    pub parent_phone: String,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<String>,
    pub symptoms: Option<String>,
    pub previous_treatment: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub parent_user_id: i64,
    pub doctor_user_id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub intake: ChildIntake,
    #[sqlx(try_from = "String")]
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub parent_user_id: i64,
    pub doctor_user_id: i64,
    pub intake: ChildIntake,
}

/// Appointment joined with the assigned doctor's display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub appointment: Appointment,
    pub doctor_name: Option<String>,
    pub doctor_hospital: Option<String>,
    pub doctor_title: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub parent_user_id: Option<i64>,
    pub doctor_user_id: Option<i64>,
    pub status: Option<AppointmentStatus>,
    /// Matched case-insensitively against child name, parent name, phone and symptoms.
    pub keyword: Option<String>,
}
