// handlers/public/auth/login.rs - POST /api/auth/login handler

use axum::extract::State;

use crate::api::format::SessionView;
use crate::api::requests::CredentialsRequest;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::accounts;
use crate::AppState;

/// POST /api/auth/login - Exchange email and password for a session token
///
/// ```json
/// { "email": "ada@example.com", "password": "correct horse" }
/// ```
///
/// Responds `{ token, user }`; 401 on unknown email or wrong password.
pub async fn login_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CredentialsRequest>,
) -> ApiResult<SessionView> {
    let credentials = payload.validate(false)?;
    let session = accounts::login(state.store.as_ref(), &state.config.security, credentials).await?;
    Ok(ApiResponse::success(session))
}
