//! Input validation for API request payloads.
//!
//! Failures are collected per field and reported together as a single
//! `"field: message, field: message"` string, the format clients already parse.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::error::ApiError;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Accumulates field failures in the order they were found
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<(String, String)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push((field.to_string(), message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn message(&self) -> String {
        self.errors
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `Ok(value)` when nothing failed, otherwise the combined 400.
    pub fn finish<T>(self, value: T) -> Result<T, ApiError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::validation_error(self.message()))
        }
    }
}

/// Trimmed, non-empty, bounded text
pub fn required_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) -> Option<String> {
    match value.map(str::trim) {
        None | Some("") => {
            errors.add(field, "Required");
            None
        }
        Some(text) => bounded(errors, field, text, max),
    }
}

/// Trimmed, bounded text where blank means absent
pub fn optional_text(errors: &mut FieldErrors, field: &str, value: Option<&str>, max: usize) -> Option<String> {
    match value.map(str::trim) {
        None | Some("") => None,
        Some(text) => bounded(errors, field, text, max),
    }
}

fn bounded(errors: &mut FieldErrors, field: &str, text: &str, max: usize) -> Option<String> {
    if text.chars().count() > max {
        errors.add(field, format!("Must be at most {} characters", max));
        None
    } else {
        Some(text.to_string())
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` taken as midnight UTC
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn normalize_email(errors: &mut FieldErrors, value: Option<&str>) -> Option<String> {
    let email = required_text(errors, "email", value, 254)?.to_lowercase();
    if EMAIL_REGEX.is_match(&email) {
        Some(email)
    } else {
        errors.add("email", "Invalid email address");
        None
    }
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn messages_join_in_order() {
        let mut errors = FieldErrors::new();
        errors.add("title", "Required");
        errors.add("severity", "Must be between 1 and 5");
        assert_eq!(errors.message(), "title: Required, severity: Must be between 1 and 5");
        assert!(errors.finish(()).is_err());
    }

    #[test]
    fn text_is_trimmed_and_bounded() {
        let mut errors = FieldErrors::new();
        assert_eq!(required_text(&mut errors, "title", Some("  Sleep  "), 10), Some("Sleep".to_string()));
        assert_eq!(optional_text(&mut errors, "notes", Some("   "), 10), None);
        assert!(errors.is_empty());

        assert_eq!(required_text(&mut errors, "title", Some("   "), 10), None);
        assert_eq!(optional_text(&mut errors, "notes", Some("far too long"), 5), None);
        assert_eq!(errors.message(), "title: Required, notes: Must be at most 5 characters");
    }

    #[test]
    fn dates_accept_rfc3339_and_plain_days() {
        let ts = parse_date("2024-03-05T09:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 7);

        let day = parse_date("2024-03-05").unwrap();
        assert_eq!((day.year(), day.month(), day.day(), day.hour()), (2024, 3, 5, 0));

        assert!(parse_date("next tuesday").is_none());
        assert!(parse_date("2024-13-01").is_none());
    }

    #[test]
    fn emails_are_lowercased() {
        let mut errors = FieldErrors::new();
        assert_eq!(normalize_email(&mut errors, Some(" Ada@Example.COM ")), Some("ada@example.com".to_string()));
        assert_eq!(normalize_email(&mut errors, Some("not-an-email")), None);
        assert_eq!(errors.message(), "email: Invalid email address");
    }
}
