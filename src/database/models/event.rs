use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[default]
    Note,
    Appointment,
    Result,
    Letter,
    Feeling,
    Exercise,
    Symptom,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::Note,
        EventType::Appointment,
        EventType::Result,
        EventType::Letter,
        EventType::Feeling,
        EventType::Exercise,
        EventType::Symptom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Note => "NOTE",
            EventType::Appointment => "APPOINTMENT",
            EventType::Result => "RESULT",
            EventType::Letter => "LETTER",
            EventType::Feeling => "FEELING",
            EventType::Exercise => "EXERCISE",
            EventType::Symptom => "SYMPTOM",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown event type '{}'", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub track_id: Uuid,
    pub date: DateTime<Utc>,
    pub event_type: EventType,
    pub title: String,
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub symptom_type: Option<String>,
    pub severity: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub date: DateTime<Utc>,
    pub event_type: EventType,
    pub title: String,
    pub notes: Option<String>,
    pub symptom_type: Option<String>,
    pub severity: Option<i16>,
}

/// Partial update. Inner `None` on the nullable fields clears them.
#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub date: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub title: Option<String>,
    pub notes: Option<Option<String>>,
    pub symptom_type: Option<Option<String>>,
    pub severity: Option<Option<i16>>,
}

impl EventChanges {
    pub fn apply(self, event: &mut Event) {
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(event_type) = self.event_type {
            event.event_type = event_type;
        }
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(notes) = self.notes {
            event.notes = notes;
        }
        if let Some(symptom_type) = self.symptom_type {
            event.symptom_type = symptom_type;
        }
        if let Some(severity) = self.severity {
            event.severity = severity;
        }
    }
}

/// An appointment together with the track it belongs to.
#[derive(Debug, Clone)]
pub struct UpcomingAppointment {
    pub event: Event,
    pub track_slug: String,
    pub track_title: String,
}
