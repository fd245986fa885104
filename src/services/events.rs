use tracing::{info, warn};
use uuid::Uuid;

use crate::database::{Event, HealthStore};
use crate::error::ApiError;
use crate::storage::ObjectStorage;

/// Look up an event under one of the owner's tracks.
///
/// On a miss, a second lookup decides which message to return: "Track not
/// found" when the track itself is missing, "Event not found" otherwise. Both
/// are 404s. An event id that is not a UUID counts as a missing event.
pub async fn resolve_event(
    store: &dyn HealthStore,
    user_id: Uuid,
    slug: &str,
    event_id: &str,
) -> Result<Event, ApiError> {
    if let Ok(id) = Uuid::parse_str(event_id) {
        if let Some(event) = store.find_event(user_id, slug, id).await? {
            return Ok(event);
        }
    }

    match store.find_track(user_id, slug).await? {
        Some(_) => Err(ApiError::event_not_found()),
        None => Err(ApiError::track_not_found()),
    }
}

/// Delete an event row, then make a single attempt at removing its stored file
/// and any object uploaded against it but never confirmed.
pub async fn delete_event(
    store: &dyn HealthStore,
    storage: &dyn ObjectStorage,
    user_id: Uuid,
    slug: &str,
    event_id: &str,
) -> Result<Event, ApiError> {
    let event = resolve_event(store, user_id, slug, event_id).await?;
    // Read before the delete; the rows cascade away with the event
    let pending_keys = store.pending_upload_keys(event.id).await?;

    if !store.delete_event(event.id).await? {
        return Err(ApiError::event_not_found());
    }

    for key in event.file_url.iter().chain(&pending_keys) {
        if let Err(e) = storage.delete_object(key).await {
            warn!(event = %event.id, key = %key, error = %e, "Failed to delete stored file, continuing");
        }
    }

    info!(user = %user_id, slug = %slug, event = %event.id, "Event deleted");
    Ok(event)
}
