use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::models::*;
use super::{HealthStore, StoreError};

const TRACK_COLUMNS: &str = "id, user_id, title, slug, description, created_at, updated_at";
const EVENT_COLUMNS: &str =
    "id, track_id, date, type, title, notes, file_url, symptom_type, severity, created_at, updated_at";
const UPLOAD_COLUMNS: &str =
    "id, user_id, event_id, object_key, file_name, content_type, size_bytes, expires_at, created_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, body, link, read_at, created_at";

/// Raw `events` row; `type` is stored as text and parsed on the way out.
#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    track_id: Uuid,
    date: DateTime<Utc>,
    #[sqlx(rename = "type")]
    event_type: String,
    title: String,
    notes: Option<String>,
    file_url: Option<String>,
    symptom_type: Option<String>,
    severity: Option<i16>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Event {
            id: row.id,
            track_id: row.track_id,
            date: row.date,
            event_type: row.event_type.parse().map_err(StoreError::Query)?,
            title: row.title,
            notes: row.notes,
            file_url: row.file_url,
            symptom_type: row.symptom_type,
            severity: row.severity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct AppointmentRow {
    #[sqlx(flatten)]
    event: EventRow,
    track_slug: String,
    track_title: String,
}

fn unique_violation(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(what.to_string()),
        _ => StoreError::Sqlx(err),
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Query("DATABASE_URL is not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Connected to database (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl HealthStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash) VALUES ($1, $2, $3)
             RETURNING id, email, password_hash, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "email already registered"))
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, password_hash, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, password_hash, created_at FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user_email(&self, user_id: Uuid, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET email = $2 WHERE id = $1 RETURNING id, email, password_hash, created_at",
        )
        .bind(user_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| unique_violation(e, "email already registered"))?
        .ok_or(StoreError::NotFound("User"))
    }

    async fn list_tracks(&self, user_id: Uuid) -> Result<Vec<Track>, StoreError> {
        let sql = format!(
            "SELECT {} FROM health_tracks WHERE user_id = $1 ORDER BY created_at DESC",
            TRACK_COLUMNS
        );
        let tracks = sqlx::query_as::<_, Track>(&sql).bind(user_id).fetch_all(&self.pool).await?;
        Ok(tracks)
    }

    async fn find_track(&self, user_id: Uuid, slug: &str) -> Result<Option<Track>, StoreError> {
        let sql = format!(
            "SELECT {} FROM health_tracks WHERE user_id = $1 AND slug = $2",
            TRACK_COLUMNS
        );
        let track = sqlx::query_as::<_, Track>(&sql)
            .bind(user_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(track)
    }

    async fn slugs_with_prefix(&self, user_id: Uuid, base: &str) -> Result<Vec<String>, StoreError> {
        // Slugs are [a-z0-9-] only, so LIKE needs no escaping
        let slugs: Vec<(String,)> = sqlx::query_as(
            "SELECT slug FROM health_tracks WHERE user_id = $1 AND (slug = $2 OR slug LIKE $2 || '-%')",
        )
        .bind(user_id)
        .bind(base)
        .fetch_all(&self.pool)
        .await?;
        Ok(slugs.into_iter().map(|(s,)| s).collect())
    }

    async fn insert_track(&self, track: NewTrack) -> Result<Track, StoreError> {
        let sql = format!(
            "INSERT INTO health_tracks (id, user_id, title, slug, description)
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            TRACK_COLUMNS
        );
        sqlx::query_as::<_, Track>(&sql)
            .bind(Uuid::new_v4())
            .bind(track.user_id)
            .bind(&track.title)
            .bind(&track.slug)
            .bind(&track.description)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unique_violation(e, &format!("slug '{}' already taken", track.slug)))
    }

    async fn update_track(&self, track_id: Uuid, changes: TrackChanges) -> Result<Track, StoreError> {
        let sql = format!(
            "UPDATE health_tracks SET
                title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = now()
             WHERE id = $1 RETURNING {}",
            TRACK_COLUMNS
        );
        let (set_description, description) = split_nullable(changes.description);
        sqlx::query_as::<_, Track>(&sql)
            .bind(track_id)
            .bind(changes.title)
            .bind(set_description)
            .bind(description)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("Track"))
    }

    async fn find_track_files(&self, user_id: Uuid, slug: &str) -> Result<Option<TrackFiles>, StoreError> {
        let Some(track) = self.find_track(user_id, slug).await? else {
            return Ok(None);
        };

        let keys: Vec<(String,)> =
            sqlx::query_as("SELECT file_url FROM events WHERE track_id = $1 AND file_url IS NOT NULL")
                .bind(track.id)
                .fetch_all(&self.pool)
                .await?;

        let pending: Vec<(String,)> = sqlx::query_as(
            "SELECT p.object_key FROM pending_uploads p
             JOIN events e ON e.id = p.event_id
             WHERE e.track_id = $1",
        )
        .bind(track.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(TrackFiles {
            track,
            file_keys: keys.into_iter().map(|(k,)| k).collect(),
            pending_keys: pending.into_iter().map(|(k,)| k).collect(),
        }))
    }

    async fn delete_track(&self, track_id: Uuid) -> Result<bool, StoreError> {
        // events and pending_uploads go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM health_tracks WHERE id = $1")
            .bind(track_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_events(&self, track_id: Uuid) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "SELECT {} FROM events WHERE track_id = $1 ORDER BY date DESC, created_at DESC",
            EVENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql).bind(track_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn find_event(&self, user_id: Uuid, slug: &str, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT e.id, e.track_id, e.date, e.type, e.title, e.notes, e.file_url,
                    e.symptom_type, e.severity, e.created_at, e.updated_at
             FROM events e
             JOIN health_tracks t ON t.id = e.track_id
             WHERE e.id = $1 AND t.user_id = $2 AND t.slug = $3",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn insert_event(&self, track_id: Uuid, event: NewEvent) -> Result<Event, StoreError> {
        let sql = format!(
            "INSERT INTO events (id, track_id, date, type, title, notes, symptom_type, severity)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(track_id)
            .bind(event.date)
            .bind(event.event_type.as_str())
            .bind(&event.title)
            .bind(&event.notes)
            .bind(&event.symptom_type)
            .bind(event.severity)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn update_event(&self, event_id: Uuid, changes: EventChanges) -> Result<Event, StoreError> {
        let sql = format!(
            "UPDATE events SET
                date = COALESCE($2, date),
                type = COALESCE($3, type),
                title = COALESCE($4, title),
                notes = CASE WHEN $5 THEN $6 ELSE notes END,
                symptom_type = CASE WHEN $7 THEN $8 ELSE symptom_type END,
                severity = CASE WHEN $9 THEN $10 ELSE severity END,
                updated_at = now()
             WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        );
        let (set_notes, notes) = split_nullable(changes.notes);
        let (set_symptom, symptom_type) = split_nullable(changes.symptom_type);
        let (set_severity, severity) = split_nullable(changes.severity);

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id)
            .bind(changes.date)
            .bind(changes.event_type.map(|t| t.as_str()))
            .bind(changes.title)
            .bind(set_notes)
            .bind(notes)
            .bind(set_symptom)
            .bind(symptom_type)
            .bind(set_severity)
            .bind(severity)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("Event"))?;
        row.try_into()
    }

    async fn set_event_file(&self, event_id: Uuid, file_url: Option<String>) -> Result<Event, StoreError> {
        let sql = format!(
            "UPDATE events SET file_url = $2, updated_at = now() WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(event_id)
            .bind(file_url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("Event"))?;
        row.try_into()
    }

    async fn delete_event(&self, event_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upcoming_appointments(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UpcomingAppointment>, StoreError> {
        let rows = sqlx::query_as::<_, AppointmentRow>(
            "SELECT e.id, e.track_id, e.date, e.type, e.title, e.notes, e.file_url,
                    e.symptom_type, e.severity, e.created_at, e.updated_at,
                    t.slug AS track_slug, t.title AS track_title
             FROM events e
             JOIN health_tracks t ON t.id = e.track_id
             WHERE t.user_id = $1 AND e.type = 'APPOINTMENT' AND e.date >= $2
             ORDER BY e.date ASC
             LIMIT $3",
        )
        .bind(user_id)
        .bind(from)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(UpcomingAppointment {
                    event: row.event.try_into()?,
                    track_slug: row.track_slug,
                    track_title: row.track_title,
                })
            })
            .collect()
    }

    async fn insert_pending_upload(&self, upload: NewPendingUpload) -> Result<PendingUpload, StoreError> {
        let sql = format!(
            "INSERT INTO pending_uploads
                (id, user_id, event_id, object_key, file_name, content_type, size_bytes, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            UPLOAD_COLUMNS
        );
        let pending = sqlx::query_as::<_, PendingUpload>(&sql)
            .bind(Uuid::new_v4())
            .bind(upload.user_id)
            .bind(upload.event_id)
            .bind(&upload.object_key)
            .bind(&upload.file_name)
            .bind(&upload.content_type)
            .bind(upload.size_bytes)
            .bind(upload.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(pending)
    }

    async fn find_pending_upload(&self, upload_id: Uuid) -> Result<Option<PendingUpload>, StoreError> {
        let sql = format!("SELECT {} FROM pending_uploads WHERE id = $1", UPLOAD_COLUMNS);
        let pending = sqlx::query_as::<_, PendingUpload>(&sql)
            .bind(upload_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(pending)
    }

    async fn delete_pending_upload(&self, upload_id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM pending_uploads WHERE id = $1")
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn pending_upload_keys(&self, event_id: Uuid) -> Result<Vec<String>, StoreError> {
        let keys: Vec<(String,)> = sqlx::query_as("SELECT object_key FROM pending_uploads WHERE event_id = $1")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(keys.into_iter().map(|(k,)| k).collect())
    }

    async fn expired_pending_uploads(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PendingUpload>, StoreError> {
        let sql = format!(
            "SELECT {} FROM pending_uploads WHERE expires_at <= $1 ORDER BY expires_at ASC LIMIT $2",
            UPLOAD_COLUMNS
        );
        let uploads = sqlx::query_as::<_, PendingUpload>(&sql)
            .bind(now)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(uploads)
    }

    async fn list_notifications(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>, StoreError> {
        let sql = format!(
            "SELECT {} FROM notifications
             WHERE user_id = $1 AND (NOT $2 OR read_at IS NULL)
             ORDER BY created_at DESC",
            NOTIFICATION_COLUMNS
        );
        let notifications = sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .bind(unread_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(notifications)
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification, StoreError> {
        let sql = format!(
            "INSERT INTO notifications (id, user_id, kind, title, body, link)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let created = sqlx::query_as::<_, Notification>(&sql)
            .bind(Uuid::new_v4())
            .bind(notification.user_id)
            .bind(&notification.kind)
            .bind(&notification.title)
            .bind(&notification.body)
            .bind(&notification.link)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn mark_notification_read(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<Notification>, StoreError> {
        let sql = format!(
            "UPDATE notifications SET read_at = COALESCE(read_at, $3)
             WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, Notification>(&sql)
            .bind(notification_id)
            .bind(user_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE notifications SET read_at = $2 WHERE user_id = $1 AND read_at IS NULL")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn split_nullable<T>(value: Option<Option<T>>) -> (bool, Option<T>) {
    match value {
        Some(inner) => (true, inner),
        None => (false, None),
    }
}
