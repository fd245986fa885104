//! Request payloads and their validation into store-ready values.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::{EventChanges, EventType, NewEvent, TrackChanges};
use crate::error::ApiError;

use super::validation::{normalize_email, nullable, optional_text, parse_date, required_text, FieldErrors};

pub const DEFAULT_EVENT_TITLE: &str = "Untitled event";

pub const ALLOWED_CONTENT_TYPES: [&str; 6] = [
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "text/plain",
];

const TRACK_TITLE_MAX: usize = 120;
const TRACK_DESCRIPTION_MAX: usize = 1000;
const EVENT_TITLE_MAX: usize = 200;
const EVENT_NOTES_MAX: usize = 5000;
const SYMPTOM_TYPE_MAX: usize = 100;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl CredentialsRequest {
    /// Registration enforces password length; login only needs something to check.
    pub fn validate(self, enforce_strength: bool) -> Result<Credentials, ApiError> {
        let mut errors = FieldErrors::new();
        let email = normalize_email(&mut errors, self.email.as_deref());

        let password = match self.password {
            Some(p) if !p.is_empty() => Some(p),
            _ => {
                errors.add("password", "Required");
                None
            }
        };
        if let Some(p) = &password {
            let len = p.chars().count();
            if enforce_strength && len < PASSWORD_MIN {
                errors.add("password", format!("Must be at least {} characters", PASSWORD_MIN));
            } else if len > PASSWORD_MAX {
                errors.add("password", format!("Must be at most {} characters", PASSWORD_MAX));
            }
        }

        errors.finish(Credentials {
            email: email.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut errors = FieldErrors::new();
        let email = normalize_email(&mut errors, self.email.as_deref());
        errors.finish(email.unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateTrackRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug)]
pub struct TrackInput {
    pub title: String,
    pub description: Option<String>,
}

impl CreateTrackRequest {
    pub fn validate(self) -> Result<TrackInput, ApiError> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", self.title.as_deref(), TRACK_TITLE_MAX);
        let description = optional_text(&mut errors, "description", self.description.as_deref(), TRACK_DESCRIPTION_MAX);

        errors.finish(TrackInput {
            title: title.unwrap_or_default(),
            description,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTrackRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

impl UpdateTrackRequest {
    pub fn validate(self) -> Result<TrackChanges, ApiError> {
        let mut errors = FieldErrors::new();
        let title = match self.title {
            Some(t) => required_text(&mut errors, "title", Some(&t), TRACK_TITLE_MAX),
            None => None,
        };
        let description = self
            .description
            .map(|d| optional_text(&mut errors, "description", d.as_deref(), TRACK_DESCRIPTION_MAX));

        errors.finish(TrackChanges { title, description })
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
    pub symptom_type: Option<String>,
    pub severity: Option<i64>,
}

impl CreateEventRequest {
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewEvent, ApiError> {
        let mut errors = FieldErrors::new();

        let event_type = match self.event_type.as_deref() {
            None => EventType::default(),
            Some(raw) => parse_event_type(&mut errors, raw).unwrap_or_default(),
        };

        let title = optional_text(&mut errors, "title", self.title.as_deref(), EVENT_TITLE_MAX)
            .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string());

        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(raw) => parse_date(raw).or_else(|| {
                errors.add("date", "Invalid date");
                None
            }),
            None if event_type == EventType::Appointment => {
                errors.add("date", "Date is required for appointments");
                None
            }
            None => Some(now),
        };

        let notes = optional_text(&mut errors, "notes", self.notes.as_deref(), EVENT_NOTES_MAX);
        let symptom_type = optional_text(&mut errors, "symptomType", self.symptom_type.as_deref(), SYMPTOM_TYPE_MAX);
        let severity = self.severity.and_then(|s| check_severity(&mut errors, s));

        errors.finish(NewEvent {
            date: date.unwrap_or(now),
            event_type,
            title,
            notes,
            symptom_type,
            severity,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub title: Option<String>,
    pub date: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub symptom_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub severity: Option<Option<i64>>,
}

impl UpdateEventRequest {
    pub fn validate(self) -> Result<EventChanges, ApiError> {
        let mut errors = FieldErrors::new();

        let event_type = self
            .event_type
            .as_deref()
            .and_then(|raw| parse_event_type(&mut errors, raw));

        // A blank title falls back to the default, as on create
        let title = self.title.as_deref().map(|t| {
            optional_text(&mut errors, "title", Some(t), EVENT_TITLE_MAX)
                .unwrap_or_else(|| DEFAULT_EVENT_TITLE.to_string())
        });

        let date = self.date.as_deref().and_then(|raw| {
            let parsed = parse_date(raw);
            if parsed.is_none() {
                errors.add("date", "Invalid date");
            }
            parsed
        });

        let notes = self
            .notes
            .map(|n| optional_text(&mut errors, "notes", n.as_deref(), EVENT_NOTES_MAX));
        let symptom_type = self
            .symptom_type
            .map(|s| optional_text(&mut errors, "symptomType", s.as_deref(), SYMPTOM_TYPE_MAX));
        let severity = self
            .severity
            .map(|s| s.and_then(|value| check_severity(&mut errors, value)));

        errors.finish(EventChanges {
            date,
            event_type,
            title,
            notes,
            symptom_type,
            severity,
        })
    }
}

fn parse_event_type(errors: &mut FieldErrors, raw: &str) -> Option<EventType> {
    match raw.trim().to_uppercase().parse::<EventType>() {
        Ok(t) => Some(t),
        Err(_) => {
            let allowed: Vec<&str> = EventType::ALL.iter().map(|t| t.as_str()).collect();
            errors.add("type", format!("Must be one of {}", allowed.join(", ")));
            None
        }
    }
}

fn check_severity(errors: &mut FieldErrors, value: i64) -> Option<i16> {
    if (1..=5).contains(&value) {
        Some(value as i16)
    } else {
        errors.add("severity", "Must be between 1 and 5");
        None
    }
}

// ---------------------------------------------------------------------------
// Uploads
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
}

#[derive(Debug)]
pub struct UploadInput {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

impl UploadUrlRequest {
    pub fn validate(self, max_bytes: u64) -> Result<UploadInput, ApiError> {
        let mut errors = FieldErrors::new();

        let file_name = required_text(&mut errors, "fileName", self.file_name.as_deref(), 255);

        let content_type = match self.content_type.as_deref().map(|c| c.trim().to_lowercase()) {
            None => {
                errors.add("contentType", "Required");
                None
            }
            Some(ct) if ALLOWED_CONTENT_TYPES.contains(&ct.as_str()) => Some(ct),
            Some(_) => {
                errors.add(
                    "contentType",
                    format!("Must be one of {}", ALLOWED_CONTENT_TYPES.join(", ")),
                );
                None
            }
        };

        let size = match self.size {
            None => {
                errors.add("size", "Required");
                None
            }
            Some(s) if s <= 0 => {
                errors.add("size", "Must be greater than 0");
                None
            }
            Some(s) if s as u64 > max_bytes => {
                errors.add("size", format!("Must be at most {} bytes", max_bytes));
                None
            }
            Some(s) => Some(s as u64),
        };

        errors.finish(UploadInput {
            file_name: file_name.unwrap_or_default(),
            content_type: content_type.unwrap_or_default(),
            size: size.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfirmRequest {
    pub upload_id: Option<String>,
}

impl UploadConfirmRequest {
    pub fn validate(self) -> Result<Uuid, ApiError> {
        let mut errors = FieldErrors::new();
        let upload_id = match self.upload_id.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("uploadId", "Required");
                None
            }
            Some(raw) => Uuid::parse_str(raw).ok().or_else(|| {
                errors.add("uploadId", "Invalid upload id");
                None
            }),
        };
        errors.finish(upload_id.unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub kind: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug)]
pub struct NotificationInput {
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
}

impl CreateNotificationRequest {
    pub fn validate(self) -> Result<NotificationInput, ApiError> {
        let mut errors = FieldErrors::new();
        let title = required_text(&mut errors, "title", self.title.as_deref(), 200);
        let body = optional_text(&mut errors, "body", self.body.as_deref(), 2000);
        let kind = optional_text(&mut errors, "kind", self.kind.as_deref(), 50).unwrap_or_else(|| "general".to_string());
        let link = optional_text(&mut errors, "link", self.link.as_deref(), 500);

        errors.finish(NotificationInput {
            kind,
            title: title.unwrap_or_default(),
            body,
            link,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_event(body: serde_json::Value) -> Result<NewEvent, ApiError> {
        serde_json::from_value::<CreateEventRequest>(body).unwrap().validate(Utc::now())
    }

    #[test]
    fn event_defaults_to_untitled_note_now() {
        let before = Utc::now();
        let event = create_event(json!({})).unwrap();
        assert_eq!(event.event_type, EventType::Note);
        assert_eq!(event.title, DEFAULT_EVENT_TITLE);
        assert!(event.date >= before);
        assert!(event.notes.is_none());
    }

    #[test]
    fn appointment_without_date_is_rejected_on_date() {
        let err = create_event(json!({ "type": "APPOINTMENT", "title": "GP" })).unwrap_err();
        assert_eq!(err.message(), "date: Date is required for appointments");
    }

    #[test]
    fn appointment_with_date_is_accepted() {
        let event = create_event(json!({ "type": "APPOINTMENT", "date": "2031-01-02" })).unwrap();
        assert_eq!(event.event_type, EventType::Appointment);
        assert_eq!(event.date.to_rfc3339(), "2031-01-02T00:00:00+00:00");
    }

    #[test]
    fn every_bad_field_is_reported() {
        let err = create_event(json!({
            "type": "DIARY",
            "date": "yesterday",
            "severity": 9
        }))
        .unwrap_err();
        assert_eq!(
            err.message(),
            "type: Must be one of NOTE, APPOINTMENT, RESULT, LETTER, FEELING, EXERCISE, SYMPTOM, \
             date: Invalid date, severity: Must be between 1 and 5"
        );
    }

    #[test]
    fn symptom_fields_are_trimmed() {
        let event = create_event(json!({
            "type": "symptom",
            "symptomType": "  headache ",
            "severity": 3,
            "notes": "   "
        }))
        .unwrap();
        assert_eq!(event.event_type, EventType::Symptom);
        assert_eq!(event.symptom_type.as_deref(), Some("headache"));
        assert_eq!(event.severity, Some(3));
        assert!(event.notes.is_none());
    }

    #[test]
    fn event_patch_distinguishes_null_from_absent() {
        let changes: EventChanges = serde_json::from_value::<UpdateEventRequest>(json!({
            "notes": null,
            "title": "Follow-up"
        }))
        .unwrap()
        .validate()
        .unwrap();

        assert_eq!(changes.title.as_deref(), Some("Follow-up"));
        assert_eq!(changes.notes, Some(None));
        assert_eq!(changes.symptom_type, None);
        assert_eq!(changes.severity, None);
    }

    #[test]
    fn track_title_is_required() {
        let err = serde_json::from_value::<CreateTrackRequest>(json!({ "title": "  " }))
            .unwrap()
            .validate()
            .unwrap_err();
        assert_eq!(err.message(), "title: Required");
    }

    #[test]
    fn upload_request_checks_type_and_size() {
        let max = 10 * 1024 * 1024;
        let ok = serde_json::from_value::<UploadUrlRequest>(json!({
            "fileName": "results.pdf",
            "contentType": "application/pdf",
            "size": max
        }))
        .unwrap()
        .validate(max as u64)
        .unwrap();
        assert_eq!(ok.size, max as u64);

        let err = serde_json::from_value::<UploadUrlRequest>(json!({
            "fileName": "movie.mp4",
            "contentType": "video/mp4",
            "size": max + 1
        }))
        .unwrap()
        .validate(max as u64)
        .unwrap_err();
        assert!(err.message().starts_with("contentType: Must be one of application/pdf"));
        assert!(err.message().ends_with("size: Must be at most 10485760 bytes"));
    }

    #[test]
    fn registration_enforces_password_length() {
        let err = serde_json::from_value::<CredentialsRequest>(json!({
            "email": "ada@example.com",
            "password": "short"
        }))
        .unwrap()
        .validate(true)
        .unwrap_err();
        assert_eq!(err.message(), "password: Must be at least 8 characters");
    }
}
