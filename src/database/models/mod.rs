//! Row types for every persisted entity.
//!
//! Enumerations are stored as TEXT and exposed as closed Rust enums; the
//! `text_enum!` macro gives each one its wire spelling, `FromStr`, and the
//! `TryFrom<String>` conversion sqlx uses when decoding rows.

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::database::models::UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::database::models::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::database::models::UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

pub mod account;
pub mod appointment;
pub mod case;
pub mod forum;
pub mod growth;
pub mod training;
pub mod video;

pub use account::{Account, AccountWithProfile, DoctorProfile, DoctorSummary, NewAccount, Role};
pub use appointment::{
    Appointment, AppointmentFilter, AppointmentStatus, AppointmentView, ChildIntake, NewAppointment,
};
pub use case::{CaseFile, CaseRecord, CaseStatus, CaseType, NewCase, NewCaseFile};
pub use forum::{
    AuthorBrief, Category, ForumCounts, NewPost, NewReply, Post, PostFilter, PostPriority, PostSort,
    PostStats, PostStatus, PostView, Reply, ReplyView,
};
pub use growth::{Child, Gender, GrowthProfile, HealthRecord, NewChild, NewHealthRecord};
pub use training::{
    Booking, BookingFilter, BookingStatus, BookingView, NewBooking, NewTraining, Training,
    TrainingFilter, TrainingOrder, TrainingType, TrainingView, UpcomingDoctor,
};
pub use video::{Difficulty, NewVideo, Video, VideoFilter, VideoOrder, VideoStatus, VideoTotals};

/// A stored or submitted value outside an enumeration's closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_enums_round_trip_their_wire_spelling() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert_eq!(PostStatus::InProgress.as_str(), "IN_PROGRESS");
        assert_eq!(Gender::Unknown.as_str(), "未知");
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "ROOT".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "Role");
        assert!(AppointmentStatus::try_from("archived".to_string()).is_err());
    }

    #[test]
    fn serde_uses_wire_spelling() {
        let json = serde_json::to_string(&PostPriority::Urgent).unwrap();
        assert_eq!(json, "\"URGENT\"");
        let parsed: TrainingType = serde_json::from_str("\"hybrid\"").unwrap();
        assert_eq!(parsed, TrainingType::Hybrid);
    }
}
