// handlers/public/auth/register.rs - POST /api/auth/register handler

use axum::extract::State;

use crate::api::format::SessionView;
use crate::api::requests::CredentialsRequest;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::accounts;
use crate::AppState;

/// POST /api/auth/register - Create an account and log straight in
///
/// Responds 201 with `{ token, user }`. The email is trimmed and lowercased
/// before it is stored; a second account with the same email is a 400.
pub async fn register_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> ApiResult<SessionView> {
    let credentials = payload.validate(true)?;
    let session = accounts::register(state.store.as_ref(), &state.config.security, credentials).await?;
    Ok(ApiResponse::created(session))
}
