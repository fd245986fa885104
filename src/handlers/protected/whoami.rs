// handlers/protected/whoami.rs - GET /api/auth/whoami handler

use axum::{extract::State, Extension};

use crate::api::format::ProfileView;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::AppState;

/// GET /api/auth/whoami - The account behind the session token
///
/// A valid token for an account that no longer exists is treated as no session.
pub async fn whoami_get(
    State(state): State<AppState>,
    auth_user: Option<Extension<AuthUser>>,
) -> ApiResult<ProfileView> {
    let Extension(auth_user) = auth_user.ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let user = state
        .store
        .find_user(auth_user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    Ok(ApiResponse::success(user.into()))
}
