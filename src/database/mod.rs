pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use models::*;
pub use postgres::PgStore;

/// Errors from the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A uniqueness constraint rejected the write (duplicate email, duplicate slug).
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Everything the handlers need from the relational database.
///
/// Every track lookup is scoped by owner; no method returns another user's rows
/// for a given `user_id`. Deleting a track or an event cascades to the rows that
/// hang off it.
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    // Users
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn update_user_email(&self, user_id: Uuid, email: &str) -> Result<User, StoreError>;

    // Tracks
    async fn list_tracks(&self, user_id: Uuid) -> Result<Vec<Track>, StoreError>;
    async fn find_track(&self, user_id: Uuid, slug: &str) -> Result<Option<Track>, StoreError>;
    /// Slugs owned by `user_id` equal to `base` or of the form `base-*`.
    async fn slugs_with_prefix(&self, user_id: Uuid, base: &str) -> Result<Vec<String>, StoreError>;
    async fn insert_track(&self, track: NewTrack) -> Result<Track, StoreError>;
    async fn update_track(&self, track_id: Uuid, changes: TrackChanges) -> Result<Track, StoreError>;
    async fn find_track_files(&self, user_id: Uuid, slug: &str) -> Result<Option<TrackFiles>, StoreError>;
    async fn delete_track(&self, track_id: Uuid) -> Result<bool, StoreError>;

    // Events
    async fn list_events(&self, track_id: Uuid) -> Result<Vec<Event>, StoreError>;
    async fn find_event(&self, user_id: Uuid, slug: &str, event_id: Uuid) -> Result<Option<Event>, StoreError>;
    async fn insert_event(&self, track_id: Uuid, event: NewEvent) -> Result<Event, StoreError>;
    async fn update_event(&self, event_id: Uuid, changes: EventChanges) -> Result<Event, StoreError>;
    async fn set_event_file(&self, event_id: Uuid, file_url: Option<String>) -> Result<Event, StoreError>;
    async fn delete_event(&self, event_id: Uuid) -> Result<bool, StoreError>;
    async fn upcoming_appointments(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UpcomingAppointment>, StoreError>;

    // Pending uploads
    async fn insert_pending_upload(&self, upload: NewPendingUpload) -> Result<PendingUpload, StoreError>;
    async fn find_pending_upload(&self, upload_id: Uuid) -> Result<Option<PendingUpload>, StoreError>;
    async fn delete_pending_upload(&self, upload_id: Uuid) -> Result<bool, StoreError>;
    /// Object keys of the event's unconfirmed uploads.
    async fn pending_upload_keys(&self, event_id: Uuid) -> Result<Vec<String>, StoreError>;
    async fn expired_pending_uploads(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PendingUpload>, StoreError>;

    // Notifications
    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, StoreError>;
    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError>;
    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError>;
    async fn mark_all_notifications_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError>;
}
