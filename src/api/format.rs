//! Stable wire shapes. Records are mapped here so owner ids and other
//! internal columns never reach a response.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::{Event, EventType, Notification, PendingUpload, Track, UpcomingAppointment, User};
use crate::storage::PresignedUrl;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub token: String,
    pub user: ProfileView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackView {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Track> for TrackView {
    fn from(track: Track) -> Self {
        Self {
            id: track.id,
            title: track.title,
            slug: track.slug,
            description: track.description,
            created_at: track.created_at,
            updated_at: track.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackDetailView {
    #[serde(flatten)]
    pub track: TrackView,
    pub events: Vec<EventView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub title: String,
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub symptom_type: Option<String>,
    pub severity: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            date: event.date,
            event_type: event.event_type,
            title: event.title,
            notes: event.notes,
            file_url: event.file_url,
            symptom_type: event.symptom_type,
            severity: event.severity,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrackRef {
    pub slug: String,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub event: EventView,
    pub track: TrackRef,
}

impl From<UpcomingAppointment> for AppointmentView {
    fn from(appointment: UpcomingAppointment) -> Self {
        Self {
            event: appointment.event.into(),
            track: TrackRef {
                slug: appointment.track_slug,
                title: appointment.track_title,
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicketView {
    pub upload_id: Uuid,
    pub upload_url: String,
    pub key: String,
    pub headers: BTreeMap<String, String>,
    pub expires_at: DateTime<Utc>,
}

impl UploadTicketView {
    pub fn new(pending: &PendingUpload, presigned: PresignedUrl) -> Self {
        Self {
            upload_id: pending.id,
            upload_url: presigned.url,
            key: pending.object_key.clone(),
            headers: presigned.headers,
            expires_at: presigned.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadView {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl From<PresignedUrl> for DownloadView {
    fn from(presigned: PresignedUrl) -> Self {
        Self {
            url: presigned.url,
            expires_at: presigned.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: Option<String>,
    pub link: Option<String>,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationView {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id,
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            link: notification.link,
            read: notification.read_at.is_some(),
            read_at: notification.read_at,
            created_at: notification.created_at,
        }
    }
}

/// Body of a successful DELETE
#[derive(Debug, Serialize)]
pub struct DeletedView {
    pub deleted: bool,
}

impl DeletedView {
    pub fn new() -> Self {
        Self { deleted: true }
    }
}

#[derive(Debug, Serialize)]
pub struct MarkedReadView {
    pub updated: u64,
}
