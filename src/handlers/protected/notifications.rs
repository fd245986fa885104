// handlers/protected/notifications.rs - /api/users/:user_id/hub/notifications

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::format::{MarkedReadView, NotificationView};
use crate::api::requests::CreateNotificationRequest;
use crate::database::NewNotification;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, Owner};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub unread: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationPath {
    pub notification_id: String,
}

/// GET /hub/notifications[?unread=true] - newest first
pub async fn notifications_get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Query(query): Query<NotificationsQuery>,
) -> ApiResult<Vec<NotificationView>> {
    let unread_only = matches!(query.unread.as_deref(), Some("true") | Some("1"));
    let notifications = state.store.list_notifications(owner.user_id, unread_only).await?;
    Ok(ApiResponse::success(
        notifications.into_iter().map(NotificationView::from).collect(),
    ))
}

/// POST /hub/notifications - 201
pub async fn notifications_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    JsonBody(payload): JsonBody<CreateNotificationRequest>,
) -> ApiResult<NotificationView> {
    let input = payload.validate()?;
    let notification = state
        .store
        .insert_notification(NewNotification {
            user_id: owner.user_id,
            kind: input.kind,
            title: input.title,
            body: input.body,
            link: input.link,
        })
        .await?;
    Ok(ApiResponse::created(notification.into()))
}

/// POST /hub/notifications/:notification_id/read
///
/// Marking an already-read notification keeps its original `readAt`.
pub async fn notification_read_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Path(path): Path<NotificationPath>,
) -> ApiResult<NotificationView> {
    let not_found = || ApiError::not_found("Notification not found");

    let id = Uuid::parse_str(&path.notification_id).map_err(|_| not_found())?;
    let notification = state
        .store
        .mark_notification_read(owner.user_id, id, Utc::now())
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiResponse::success(notification.into()))
}

/// POST /hub/notifications/read-all
pub async fn notifications_read_all_post(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
) -> ApiResult<MarkedReadView> {
    let updated = state
        .store
        .mark_all_notifications_read(owner.user_id, Utc::now())
        .await?;
    Ok(ApiResponse::success(MarkedReadView { updated }))
}
