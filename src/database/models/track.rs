use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Track {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTrack {
    pub user_id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
}

/// Partial update. `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default)]
pub struct TrackChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

/// A track together with the storage keys referenced by its events.
#[derive(Debug, Clone)]
pub struct TrackFiles {
    pub track: Track,
    /// Confirmed attachments
    pub file_keys: Vec<String>,
    /// Keys of unconfirmed uploads, which the delete cascade would otherwise forget
    pub pending_keys: Vec<String>,
}
