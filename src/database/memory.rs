use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::*;
use super::{HealthStore, StoreError};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tracks: HashMap<Uuid, Track>,
    events: HashMap<Uuid, Event>,
    uploads: HashMap<Uuid, PendingUpload>,
    notifications: HashMap<Uuid, Notification>,
}

impl Tables {
    fn owned_track(&self, user_id: Uuid, slug: &str) -> Option<&Track> {
        self.tracks
            .values()
            .find(|t| t.user_id == user_id && t.slug == slug)
    }

    fn remove_event_cascade(&mut self, event_id: Uuid) -> bool {
        let removed = self.events.remove(&event_id).is_some();
        if removed {
            self.uploads.retain(|_, u| u.event_id != event_id);
        }
        removed
    }
}

/// Process-local store with the same scoping and cascade rules as the
/// PostgreSQL schema. Used for development without a database and in tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user_email(&self, user_id: Uuid, email: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email && u.id != user_id) {
            return Err(StoreError::Conflict("email already registered".to_string()));
        }
        let user = tables.users.get_mut(&user_id).ok_or(StoreError::NotFound("User"))?;
        user.email = email.to_string();
        Ok(user.clone())
    }

    async fn list_tracks(&self, user_id: Uuid) -> Result<Vec<Track>, StoreError> {
        let tables = self.tables.read().await;
        let mut tracks: Vec<Track> = tables
            .tracks
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tracks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tracks)
    }

    async fn find_track(&self, user_id: Uuid, slug: &str) -> Result<Option<Track>, StoreError> {
        Ok(self.tables.read().await.owned_track(user_id, slug).cloned())
    }

    async fn slugs_with_prefix(&self, user_id: Uuid, base: &str) -> Result<Vec<String>, StoreError> {
        let prefix = format!("{}-", base);
        let tables = self.tables.read().await;
        Ok(tables
            .tracks
            .values()
            .filter(|t| t.user_id == user_id && (t.slug == base || t.slug.starts_with(&prefix)))
            .map(|t| t.slug.clone())
            .collect())
    }

    async fn insert_track(&self, track: NewTrack) -> Result<Track, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.owned_track(track.user_id, &track.slug).is_some() {
            return Err(StoreError::Conflict(format!("slug '{}' already taken", track.slug)));
        }
        let now = Utc::now();
        let created = Track {
            id: Uuid::new_v4(),
            user_id: track.user_id,
            title: track.title,
            slug: track.slug,
            description: track.description,
            created_at: now,
            updated_at: now,
        };
        tables.tracks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_track(&self, track_id: Uuid, changes: TrackChanges) -> Result<Track, StoreError> {
        let mut tables = self.tables.write().await;
        let track = tables.tracks.get_mut(&track_id).ok_or(StoreError::NotFound("Track"))?;
        if let Some(title) = changes.title {
            track.title = title;
        }
        if let Some(description) = changes.description {
            track.description = description;
        }
        track.updated_at = Utc::now();
        Ok(track.clone())
    }

    async fn find_track_files(&self, user_id: Uuid, slug: &str) -> Result<Option<TrackFiles>, StoreError> {
        let tables = self.tables.read().await;
        let Some(track) = tables.owned_track(user_id, slug).cloned() else {
            return Ok(None);
        };
        let file_keys = tables
            .events
            .values()
            .filter(|e| e.track_id == track.id)
            .filter_map(|e| e.file_url.clone())
            .collect();
        let pending_keys = tables
            .uploads
            .values()
            .filter(|p| tables.events.get(&p.event_id).map_or(false, |e| e.track_id == track.id))
            .map(|p| p.object_key.clone())
            .collect();
        Ok(Some(TrackFiles {
            track,
            file_keys,
            pending_keys,
        }))
    }

    async fn delete_track(&self, track_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.tracks.remove(&track_id).is_none() {
            return Ok(false);
        }
        let event_ids: Vec<Uuid> = tables
            .events
            .values()
            .filter(|e| e.track_id == track_id)
            .map(|e| e.id)
            .collect();
        for event_id in event_ids {
            tables.remove_event_cascade(event_id);
        }
        Ok(true)
    }

    async fn list_events(&self, track_id: Uuid) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|e| e.track_id == track_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(events)
    }

    async fn find_event(&self, user_id: Uuid, slug: &str, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let tables = self.tables.read().await;
        let Some(track) = tables.owned_track(user_id, slug) else {
            return Ok(None);
        };
        Ok(tables
            .events
            .get(&event_id)
            .filter(|e| e.track_id == track.id)
            .cloned())
    }

    async fn insert_event(&self, track_id: Uuid, event: NewEvent) -> Result<Event, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.tracks.contains_key(&track_id) {
            return Err(StoreError::NotFound("Track"));
        }
        let now = Utc::now();
        let created = Event {
            id: Uuid::new_v4(),
            track_id,
            date: event.date,
            event_type: event.event_type,
            title: event.title,
            notes: event.notes,
            file_url: None,
            symptom_type: event.symptom_type,
            severity: event.severity,
            created_at: now,
            updated_at: now,
        };
        tables.events.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_event(&self, event_id: Uuid, changes: EventChanges) -> Result<Event, StoreError> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(&event_id).ok_or(StoreError::NotFound("Event"))?;
        changes.apply(event);
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn set_event_file(&self, event_id: Uuid, file_url: Option<String>) -> Result<Event, StoreError> {
        let mut tables = self.tables.write().await;
        let event = tables.events.get_mut(&event_id).ok_or(StoreError::NotFound("Event"))?;
        event.file_url = file_url;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.remove_event_cascade(event_id))
    }

    async fn upcoming_appointments(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UpcomingAppointment>, StoreError> {
        let tables = self.tables.read().await;
        let mut upcoming: Vec<UpcomingAppointment> = tables
            .events
            .values()
            .filter(|e| e.event_type == EventType::Appointment && e.date >= from)
            .filter_map(|e| {
                let track = tables.tracks.get(&e.track_id)?;
                (track.user_id == user_id).then(|| UpcomingAppointment {
                    event: e.clone(),
                    track_slug: track.slug.clone(),
                    track_title: track.title.clone(),
                })
            })
            .collect();
        upcoming.sort_by(|a, b| a.event.date.cmp(&b.event.date));
        upcoming.truncate(limit.max(0) as usize);
        Ok(upcoming)
    }

    async fn insert_pending_upload(&self, upload: NewPendingUpload) -> Result<PendingUpload, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&upload.event_id) {
            return Err(StoreError::NotFound("Event"));
        }
        let pending = PendingUpload {
            id: Uuid::new_v4(),
            user_id: upload.user_id,
            event_id: upload.event_id,
            object_key: upload.object_key,
            file_name: upload.file_name,
            content_type: upload.content_type,
            size_bytes: upload.size_bytes,
            expires_at: upload.expires_at,
            created_at: Utc::now(),
        };
        tables.uploads.insert(pending.id, pending.clone());
        Ok(pending)
    }

    async fn find_pending_upload(&self, upload_id: Uuid) -> Result<Option<PendingUpload>, StoreError> {
        Ok(self.tables.read().await.uploads.get(&upload_id).cloned())
    }

    async fn delete_pending_upload(&self, upload_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.uploads.remove(&upload_id).is_some())
    }

    async fn pending_upload_keys(&self, event_id: Uuid) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .uploads
            .values()
            .filter(|p| p.event_id == event_id)
            .map(|p| p.object_key.clone())
            .collect())
    }

    async fn expired_pending_uploads(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PendingUpload>, StoreError> {
        let tables = self.tables.read().await;
        let mut expired: Vec<PendingUpload> = tables
            .uploads
            .values()
            .filter(|u| u.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| a.expires_at.cmp(&b.expires_at));
        expired.truncate(limit.max(0) as usize);
        Ok(expired)
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, StoreError> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.user_id == user_id && (!unread_only || n.read_at.is_none()))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let created = Notification {
            id: Uuid::new_v4(),
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            link: notification.link,
            read_at: None,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .notifications
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(notification) = tables
            .notifications
            .get_mut(&notification_id)
            .filter(|n| n.user_id == user_id)
        else {
            return Ok(None);
        };
        notification.read_at.get_or_insert(at);
        Ok(Some(notification.clone()))
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let mut count = 0;
        for notification in tables
            .notifications
            .values_mut()
            .filter(|n| n.user_id == user_id && n.read_at.is_none())
        {
            notification.read_at = Some(at);
            count += 1;
        }
        Ok(count)
    }
}
