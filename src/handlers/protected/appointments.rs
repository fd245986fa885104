// handlers/protected/appointments.rs - GET /api/users/:user_id/appointments/upcoming

use axum::{
    extract::{Query, State},
    Extension,
};
use chrono::Utc;
use serde::Deserialize;

use crate::api::format::AppointmentView;
use crate::middleware::{ApiResponse, ApiResult, Owner};
use crate::AppState;

const DEFAULT_LIMIT: i64 = 5;
const MAX_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub limit: Option<String>,
}

/// Future APPOINTMENT events across all of the owner's tracks, soonest first.
pub async fn upcoming_get(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<Vec<AppointmentView>> {
    let limit = effective_limit(query.limit.as_deref());
    let appointments = state
        .store
        .upcoming_appointments(owner.user_id, Utc::now(), limit)
        .await?;

    Ok(ApiResponse::success(
        appointments.into_iter().map(AppointmentView::from).collect(),
    ))
}

/// Unparseable limits fall back to the default; the rest are clamped.
fn effective_limit(raw: Option<&str>) -> i64 {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT)
}
