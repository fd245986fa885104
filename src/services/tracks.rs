use tracing::{info, warn};
use uuid::Uuid;

use crate::api::requests::TrackInput;
use crate::database::{HealthStore, NewTrack, StoreError, Track};
use crate::error::ApiError;
use crate::storage::ObjectStorage;

use super::slug::{next_available_slug, slugify, FALLBACK_SLUG};

/// Attempts before giving up on a slug that keeps being taken concurrently.
const SLUG_ATTEMPTS: usize = 3;

/// Create a track with a slug unique within the owner's tracks.
///
/// The slug is derived once from the title here and never recomputed.
pub async fn create_track(store: &dyn HealthStore, user_id: Uuid, input: TrackInput) -> Result<Track, ApiError> {
    let mut base = slugify(&input.title);
    if base.is_empty() {
        base = FALLBACK_SLUG.to_string();
    }

    for attempt in 1..=SLUG_ATTEMPTS {
        let taken = store.slugs_with_prefix(user_id, &base).await?;
        let slug = next_available_slug(&base, taken.as_slice());

        let new_track = NewTrack {
            user_id,
            title: input.title.clone(),
            slug,
            description: input.description.clone(),
        };

        match store.insert_track(new_track).await {
            Ok(track) => {
                info!(user = %user_id, slug = %track.slug, "Track created");
                return Ok(track);
            }
            Err(StoreError::Conflict(msg)) => {
                warn!(user = %user_id, attempt, "Slug taken concurrently, retrying: {}", msg);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::internal_server_error(format!(
        "Could not allocate a unique slug for '{}'",
        base
    )))
}

/// Look up one of the owner's tracks or answer "Track not found".
pub async fn resolve_track(store: &dyn HealthStore, user_id: Uuid, slug: &str) -> Result<Track, ApiError> {
    store
        .find_track(user_id, slug)
        .await?
        .ok_or_else(ApiError::track_not_found)
}

/// Outcome of the storage half of a track delete
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_deleted: usize,
    pub files_failed: usize,
}

/// Delete a track, its events and their stored files, including objects
/// behind uploads that were never confirmed.
///
/// Storage cleanup is advisory: each file delete is attempted once, failures
/// are logged and skipped, and the database delete goes ahead regardless.
pub async fn delete_track(
    store: &dyn HealthStore,
    storage: &dyn ObjectStorage,
    user_id: Uuid,
    slug: &str,
) -> Result<CleanupReport, ApiError> {
    let files = store
        .find_track_files(user_id, slug)
        .await?
        .ok_or_else(ApiError::track_not_found)?;

    let mut report = CleanupReport::default();
    for key in files.file_keys.iter().chain(&files.pending_keys) {
        match storage.delete_object(key).await {
            Ok(()) => report.files_deleted += 1,
            Err(e) => {
                report.files_failed += 1;
                warn!(track = %files.track.id, key = %key, error = %e, "Failed to delete stored file, continuing");
            }
        }
    }

    if !store.delete_track(files.track.id).await? {
        return Err(ApiError::track_not_found());
    }

    info!(
        user = %user_id,
        slug = %slug,
        files_deleted = report.files_deleted,
        files_failed = report.files_failed,
        "Track deleted"
    );
    Ok(report)
}
