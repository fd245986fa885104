// handlers/protected/profile.rs - /api/users/:user_id

use axum::{extract::State, Extension};

use crate::api::format::ProfileView;
use crate::api::requests::UpdateProfileRequest;
use crate::database::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, Owner};
use crate::services::accounts;
use crate::AppState;

/// GET /api/users/:user_id
pub async fn profile_get(State(state): State<AppState>, Extension(owner): Extension<Owner>) -> ApiResult<ProfileView> {
    let user = load_owner(&state, owner).await?;
    Ok(ApiResponse::success(user.into()))
}

/// PATCH /api/users/:user_id - change the account email
pub async fn profile_patch(
    State(state): State<AppState>,
    Extension(owner): Extension<Owner>,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> ApiResult<ProfileView> {
    let email = payload.validate()?;
    let user = load_owner(&state, owner).await?;
    let updated = accounts::change_email(state.store.as_ref(), user, email).await?;
    Ok(ApiResponse::success(updated.into()))
}

async fn load_owner(state: &AppState, owner: Owner) -> Result<User, ApiError> {
    state
        .store
        .find_user(owner.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Not found"))
}
