// handlers/protected/tracks.rs - /api/users/:user_id/tracks[/:slug]

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::api::format::{DeletedView, EventView, TrackDetailView, TrackView};
use crate::api::requests::{CreateTrackRequest, UpdateTrackRequest};
use crate::middleware::{ApiResponse, ApiResult, JsonBody, Owner};
use crate::services::tracks;
use crate::AppState;

use super::TrackPath;

/// GET /tracks - every track the owner has, newest first
pub async fn tracks_get(State(state): State<AppState>, Extension(owner): Extension<Owner>) -> ApiResult<Vec<TrackView>> {
    let tracks = state.store.list_tracks(owner.user_id).await?;
    Ok(ApiResponse::success(tracks.into_iter().map(TrackView::from).collect()))
}

/// POST /tracks - 201 with the created track, slug included
pub async fn tracks_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    JsonBody(payload): JsonBody<CreateTrackRequest>,
) -> ApiResult<TrackView> {
    let input = payload.validate()?;
    let track = tracks::create_track(state.store.as_ref(), owner.user_id, input).await?;
    Ok(ApiResponse::created(track.into()))
}

/// GET /tracks/:slug - the track with its events
pub async fn track_get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<TrackPath>,
) -> ApiResult<TrackDetailView> {
    let track = tracks::resolve_track(state.store.as_ref(), owner.user_id, &path.slug).await?;
    let events = state.store.list_events(track.id).await?;

    Ok(ApiResponse::success(TrackDetailView {
        track: track.into(),
        events: events.into_iter().map(EventView::from).collect(),
    }))
}

/// PATCH /tracks/:slug - the slug is kept even when the title changes
pub async fn track_patch(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<TrackPath>,
    JsonBody(payload): JsonBody<UpdateTrackRequest>,
) -> ApiResult<TrackView> {
    let changes = payload.validate()?;
    let track = tracks::resolve_track(state.store.as_ref(), owner.user_id, &path.slug).await?;
    let updated = state.store.update_track(track.id, changes).await?;
    Ok(ApiResponse::success(updated.into()))
}

/// DELETE /tracks/:slug - cascades to events; stored files are removed best-effort
pub async fn track_delete(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<TrackPath>,
) -> ApiResult<DeletedView> {
    tracks::delete_track(
        state.store.as_ref(),
        state.storage.as_ref(),
        owner.user_id,
        &path.slug,
    )
    .await?;
    Ok(ApiResponse::success(DeletedView::new()))
}
