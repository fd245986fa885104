//! Two-phase file attachment: presign, then confirm.
//!
//! Every presign leaves a `PendingUpload` row behind until it is confirmed.
//! Rows that outlive their TTL are swept, and the object they point at (if the
//! client ever uploaded it) is deleted.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::format::{DownloadView, UploadTicketView};
use crate::api::requests::UploadInput;
use crate::config::StorageConfig;
use crate::database::{Event, HealthStore, NewPendingUpload};
use crate::error::ApiError;
use crate::storage::{sanitize_file_name, ObjectStorage};

/// Pending rows handled per sweep query
const SWEEP_BATCH: i64 = 100;

pub fn object_key(user_id: Uuid, event: &Event, file_name: &str) -> String {
    format!(
        "users/{}/tracks/{}/events/{}/{}-{}",
        user_id,
        event.track_id,
        event.id,
        Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

/// Presign a PUT for the event's attachment and record it as pending.
pub async fn issue_upload(
    store: &dyn HealthStore,
    storage: &dyn ObjectStorage,
    config: &StorageConfig,
    user_id: Uuid,
    event: &Event,
    input: UploadInput,
    now: DateTime<Utc>,
) -> Result<UploadTicketView, ApiError> {
    let key = object_key(user_id, event, &input.file_name);
    let presigned = storage
        .presign_upload(
            &key,
            &input.content_type,
            input.size,
            Duration::from_secs(config.upload_url_expiry_secs),
        )
        .await?;

    // The pending row has to outlive the URL, or a slow client could upload
    // after the row was swept and leave an untracked object.
    let ttl = config.pending_upload_ttl_secs.max(config.upload_url_expiry_secs);
    let pending = store
        .insert_pending_upload(NewPendingUpload {
            user_id,
            event_id: event.id,
            object_key: key,
            file_name: input.file_name,
            content_type: input.content_type,
            size_bytes: input.size as i64,
            expires_at: now + ChronoDuration::seconds(ttl as i64),
        })
        .await?;

    info!(event = %event.id, upload = %pending.id, "Upload URL issued");
    Ok(UploadTicketView::new(&pending, presigned))
}

/// Attach a pending upload to its event.
///
/// A replaced attachment gets a single delete attempt; failure only logs.
pub async fn confirm_upload(
    store: &dyn HealthStore,
    storage: &dyn ObjectStorage,
    user_id: Uuid,
    event: &Event,
    upload_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Event, ApiError> {
    let pending = store
        .find_pending_upload(upload_id)
        .await?
        .filter(|p| p.event_id == event.id && p.user_id == user_id)
        .ok_or_else(|| ApiError::not_found("Upload not found"))?;

    if pending.is_expired(now) {
        return Err(ApiError::validation_error("uploadId: Upload has expired"));
    }

    let updated = store.set_event_file(event.id, Some(pending.object_key.clone())).await?;
    store.delete_pending_upload(pending.id).await?;

    if let Some(previous) = event.file_url.as_deref().filter(|k| *k != pending.object_key) {
        if let Err(e) = storage.delete_object(previous).await {
            warn!(event = %event.id, key = %previous, error = %e, "Failed to delete replaced file, continuing");
        }
    }

    info!(event = %event.id, upload = %pending.id, "Upload confirmed");
    Ok(updated)
}

/// Presign a GET for the event's attachment.
pub async fn download_url(
    storage: &dyn ObjectStorage,
    config: &StorageConfig,
    event: &Event,
) -> Result<DownloadView, ApiError> {
    let key = event
        .file_url
        .as_deref()
        .ok_or_else(|| ApiError::not_found("Event has no file"))?;

    let presigned = storage
        .presign_download(key, Duration::from_secs(config.download_url_expiry_secs))
        .await?;
    Ok(presigned.into())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub storage_failures: usize,
}

/// Remove every pending upload that expired before `now`, along with any
/// object the client may have put at its key.
pub async fn sweep_expired_uploads(
    store: &dyn HealthStore,
    storage: &dyn ObjectStorage,
    now: DateTime<Utc>,
) -> Result<SweepReport, ApiError> {
    let mut report = SweepReport::default();

    loop {
        let batch = store.expired_pending_uploads(now, SWEEP_BATCH).await?;
        if batch.is_empty() {
            break;
        }

        for pending in &batch {
            if let Err(e) = storage.delete_object(&pending.object_key).await {
                report.storage_failures += 1;
                warn!(upload = %pending.id, key = %pending.object_key, error = %e, "Failed to delete orphaned object");
            }
            store.delete_pending_upload(pending.id).await?;
            report.removed += 1;
        }

        if (batch.len() as i64) < SWEEP_BATCH {
            break;
        }
    }

    if report.removed > 0 {
        info!(
            removed = report.removed,
            storage_failures = report.storage_failures,
            "Expired uploads swept"
        );
    }
    Ok(report)
}
