// handlers/protected/events.rs - /api/users/:user_id/tracks/:slug/events[/:event_id]

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;

use crate::api::format::{DeletedView, EventView};
use crate::api::requests::{CreateEventRequest, UpdateEventRequest};
use crate::middleware::{ApiResponse, ApiResult, JsonBody, Owner};
use crate::services::{events, tracks};
use crate::AppState;

use super::{EventPath, TrackPath};

/// GET /events - the track's events, most recent date first
pub async fn events_get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<TrackPath>,
) -> ApiResult<Vec<EventView>> {
    let track = tracks::resolve_track(state.store.as_ref(), owner.user_id, &path.slug).await?;
    let events = state.store.list_events(track.id).await?;
    Ok(ApiResponse::success(events.into_iter().map(EventView::from).collect()))
}

/// POST /events - 201 with the created event
pub async fn events_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<TrackPath>,
    JsonBody(payload): JsonBody<CreateEventRequest>,
) -> ApiResult<EventView> {
    let new_event = payload.validate(Utc::now())?;
    let track = tracks::resolve_track(state.store.as_ref(), owner.user_id, &path.slug).await?;
    let event = state.store.insert_event(track.id, new_event).await?;

    tracing::info!(track = %track.id, event = %event.id, "Event created");
    Ok(ApiResponse::created(event.into()))
}

/// GET /events/:event_id
pub async fn event_get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<EventPath>,
) -> ApiResult<EventView> {
    let event = events::resolve_event(state.store.as_ref(), owner.user_id, &path.slug, &path.event_id).await?;
    Ok(ApiResponse::success(event.into()))
}

/// PATCH /events/:event_id - absent fields are left alone, `null` clears
pub async fn event_patch(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<EventPath>,
    JsonBody(payload): JsonBody<UpdateEventRequest>,
) -> ApiResult<EventView> {
    let changes = payload.validate()?;
    let event = events::resolve_event(state.store.as_ref(), owner.user_id, &path.slug, &path.event_id).await?;
    let updated = state.store.update_event(event.id, changes).await?;
    Ok(ApiResponse::success(updated.into()))
}

/// DELETE /events/:event_id
pub async fn event_delete(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<EventPath>,
) -> ApiResult<DeletedView> {
    events::delete_event(
        state.store.as_ref(),
        state.storage.as_ref(),
        owner.user_id,
        &path.slug,
        &path.event_id,
    )
    .await?;
    Ok(ApiResponse::success(DeletedView::new()))
}
