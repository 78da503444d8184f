use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

text_enum!(
    /// Account roles. Only a subset may be requested at self-registration.
    Role {
        SuperAdmin => "SUPER_ADMIN",
        Doctor => "DOCTOR",
        Parent => "PARENT",
        SchoolAdmin => "SCHOOL_ADMIN",
    }
);

impl Role {
    pub fn is_self_registerable(self) -> bool {
        matches!(self, Role::Parent | Role::Doctor | Role::SchoolAdmin)
    }

    /// Resolve a requested signup role; anything outside the self-registerable set becomes PARENT.
    pub fn for_self_registration(requested: Option<&str>) -> Role {
        requested
            .and_then(|value| value.trim().parse::<Role>().ok())
            .filter(|role| role.is_self_registerable())
            .unwrap_or(Role::Parent)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: i64,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub user_id: i64,
    pub name: String,
    pub hospital: String,
    pub title: Option<String>,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub verified: bool,
}

impl DoctorProfile {
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            name: String::new(),
            hospital: String::new(),
            title: None,
            age: None,
            phone: None,
            avatar_url: None,
            verified: false,
        }
    }

    /// Percentage of the five descriptive fields that are filled in.
    pub fn completeness(&self) -> u8 {
        let filled = [
            !self.name.trim().is_empty(),
            self.age.is_some(),
            self.title.as_deref().is_some_and(|v| !v.trim().is_empty()),
            self.phone.as_deref().is_some_and(|v| !v.trim().is_empty()),
            !self.hospital.trim().is_empty(),
        ]
        .iter()
        .filter(|filled| **filled)
        .count();
        (filled * 100 / 5) as u8
    }

    pub fn is_listed(&self) -> bool {
        !self.name.trim().is_empty() && !self.hospital.trim().is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountWithProfile {
    #[serde(flatten)]
    pub account: Account,
    pub doctor_profile: Option<DoctorProfile>,
}

/// Directory entry shown to parents choosing a doctor.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub doctor_id: i64,
    pub name: String,
    pub title: Option<String>,
    pub hospital: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_registration_downgrades_privileged_roles() {
        assert_eq!(Role::for_self_registration(Some("DOCTOR")), Role::Doctor);
        assert_eq!(Role::for_self_registration(Some("SCHOOL_ADMIN")), Role::SchoolAdmin);
        assert_eq!(Role::for_self_registration(Some("SUPER_ADMIN")), Role::Parent);
        assert_eq!(Role::for_self_registration(Some("nurse")), Role::Parent);
        assert_eq!(Role::for_self_registration(None), Role::Parent);
    }

    #[test]
    fn completeness_counts_filled_fields() {
        let mut profile = DoctorProfile::empty(7);
        assert_eq!(profile.completeness(), 0);
        profile.name = "Dr. Lin".into();
        profile.hospital = "City Hospital".into();
        assert_eq!(profile.completeness(), 40);
        profile.age = Some(40);
        profile.title = Some("Chief".into());
        profile.phone = Some("13800138000".into());
        assert_eq!(profile.completeness(), 100);
    }
}
