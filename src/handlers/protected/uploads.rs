// handlers/protected/uploads.rs - presigned upload/download for an event's attachment

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;

use crate::api::format::{DownloadView, EventView, UploadTicketView};
use crate::api::requests::{UploadConfirmRequest, UploadUrlRequest};
use crate::middleware::{ApiResponse, ApiResult, JsonBody, Owner};
use crate::services::{events, uploads};
use crate::AppState;

use super::EventPath;

/// POST /events/:event_id/upload-url
///
/// The client PUTs the file to `uploadUrl` with `headers`, then calls
/// upload-confirm with `uploadId`.
pub async fn upload_url_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<EventPath>,
    JsonBody(payload): JsonBody<UploadUrlRequest>,
) -> ApiResult<UploadTicketView> {
    let input = payload.validate(state.config.storage.max_upload_bytes)?;
    let event = events::resolve_event(state.store.as_ref(), owner.user_id, &path.slug, &path.event_id).await?;

    let ticket = uploads::issue_upload(
        state.store.as_ref(),
        state.storage.as_ref(),
        &state.config.storage,
        owner.user_id,
        &event,
        input,
        Utc::now(),
    )
    .await?;
    Ok(ApiResponse::success(ticket))
}

/// POST /events/:event_id/upload-confirm - attach the uploaded file to the event
pub async fn upload_confirm_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<EventPath>,
    JsonBody(payload): JsonBody<UploadConfirmRequest>,
) -> ApiResult<EventView> {
    let upload_id = payload.validate()?;
    let event = events::resolve_event(state.store.as_ref(), owner.user_id, &path.slug, &path.event_id).await?;

    let updated = uploads::confirm_upload(
        state.store.as_ref(),
        state.storage.as_ref(),
        owner.user_id,
        &event,
        upload_id,
        Utc::now(),
    )
    .await?;
    Ok(ApiResponse::success(updated.into()))
}

/// GET /events/:event_id/download-url
pub async fn download_url_get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<EventPath>,
) -> ApiResult<DownloadView> {
    let event = events::resolve_event(state.store.as_ref(), owner.user_id, &path.slug, &path.event_id).await?;
    let download = uploads::download_url(state.storage.as_ref(), &state.config.storage, &event).await?;
    Ok(ApiResponse::success(download))
}
