//! Field validation shared by the services.
//!
//! Lengths are counted in chars after trimming, and every failure names the
//! offending field so the HTTP layer can report it in `field_errors`.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{ServiceError, ServiceResult};

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^1[3-9]\d{9}$").unwrap());
static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Required text of `min..=max` chars.
pub fn text(field: &str, value: &str, min: usize, max: usize) -> ServiceResult<String> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(if min <= 1 {
            ServiceError::invalid(field, format!("{} is required", field))
        } else {
            ServiceError::invalid(field, format!("{} must be at least {} characters", field, min))
        });
    }
    if len > max {
        return Err(ServiceError::invalid(
            field,
            format!("{} must be at most {} characters", field, max),
        ));
    }
    Ok(trimmed.to_string())
}

/// Optional text; blank input becomes `None`.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> ServiceResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => text(field, v, 1, max).map(Some),
        None => Ok(None),
    }
}

pub fn phone(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if PHONE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ServiceError::invalid(field, "Invalid phone number"))
    }
}

/// Trimmed, lowercased email.
pub fn email(field: &str, value: &str) -> ServiceResult<String> {
    let normalized = value.trim().to_lowercase();
    if EMAIL.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ServiceError::invalid(field, "Invalid email address"))
    }
}

pub fn range<T>(field: &str, value: T, min: T, max: T) -> ServiceResult<T>
where
    T: PartialOrd + Display + Copy,
{
    if value < min || value > max {
        return Err(ServiceError::invalid(
            field,
            format!("{} must be between {} and {}", field, min, max),
        ));
    }
    Ok(value)
}

/// Trimmed, non-empty entries; at most `max_entries` of at most `max_len` chars.
pub fn list(field: &str, values: &[String], max_entries: usize, max_len: usize) -> ServiceResult<Vec<String>> {
    let entries: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if entries.len() > max_entries {
        return Err(ServiceError::invalid(
            field,
            format!("{} accepts at most {} entries", field, max_entries),
        ));
    }
    if entries.iter().any(|e| e.chars().count() > max_len) {
        return Err(ServiceError::invalid(
            field,
            format!("each {} entry must be at most {} characters", field, max_len),
        ));
    }
    Ok(entries)
}

/// `YYYY-MM-DD`, or an RFC 3339 timestamp reduced to its date.
pub fn date(field: &str, value: &str) -> ServiceResult<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .map_err(|_| ServiceError::invalid(field, format!("{} must be a date", field)))
}

pub fn parse_enum<E: FromStr>(field: &str, value: &str) -> ServiceResult<E> {
    value
        .trim()
        .parse()
        .map_err(|_| ServiceError::invalid(field, format!("Invalid {} '{}'", field, value.trim())))
}

/// Status query parameter; missing, blank or `all` means no filter.
pub fn status_filter<E: FromStr>(field: &str, value: Option<&str>) -> ServiceResult<Option<E>> {
    match value.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(v) => parse_enum(field, v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::AppointmentStatus;

    #[test]
    fn text_counts_chars_after_trimming() {
        assert_eq!(text("name", "  王小明  ", 2, 3).unwrap(), "王小明");
        assert!(text("name", "  ", 1, 10).is_err());
        assert!(text("name", "王", 2, 20).is_err());
        assert!(text("title", &"x".repeat(201), 1, 200).is_err());
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text("notes", Some("   "), 10).unwrap(), None);
        assert_eq!(optional_text("notes", None, 10).unwrap(), None);
        assert!(optional_text("notes", Some("too long here"), 5).is_err());
    }

    #[test]
    fn phone_pattern() {
        assert!(phone("phone", "13800138000").is_ok());
        assert!(phone("phone", "12800138000").is_err());
        assert!(phone("phone", "1380013800").is_err());
        assert!(phone("phone", "+8613800138000").is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(email("email", " A@Example.COM ").unwrap(), "a@example.com");
        assert!(email("email", "not-an-email").is_err());
    }

    #[test]
    fn invalid_input_names_the_field() {
        match range("childAge", 19, 0, 18) {
            Err(ServiceError::InvalidInput { field, .. }) => assert_eq!(field.as_deref(), Some("childAge")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn lists_are_bounded() {
        let tags = vec!["a".to_string(), " ".to_string(), "b".to_string()];
        assert_eq!(list("tags", &tags, 2, 30).unwrap(), vec!["a", "b"]);
        assert!(list("tags", &tags, 1, 30).is_err());
        assert!(list("tags", &["x".repeat(31)], 5, 30).is_err());
    }

    #[test]
    fn dates_accept_plain_and_timestamp_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(date("date", "2024-02-29").unwrap(), expected);
        assert_eq!(date("date", "2024-02-29T08:00:00+08:00").unwrap(), expected);
        assert!(date("date", "29/02/2024").is_err());
    }

    #[test]
    fn status_filter_accepts_all() {
        assert_eq!(status_filter::<AppointmentStatus>("status", Some("all")).unwrap(), None);
        assert_eq!(status_filter::<AppointmentStatus>("status", Some("")).unwrap(), None);
        assert_eq!(
            status_filter::<AppointmentStatus>("status", Some("pending")).unwrap(),
            Some(AppointmentStatus::Pending)
        );
        assert!(status_filter::<AppointmentStatus>("status", Some("done")).is_err());
    }
}
