use axum::{
    extract::{rejection::PathRejection, Path, Request},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;

/// The user whose `/users/{userId}` scope the request addresses, already
/// verified to be the caller.
#[derive(Clone, Copy, Debug)]
pub struct Owner {
    pub user_id: Uuid,
}

/// Guard for every `/api/users/:user_id/...` route.
///
/// - no session: 401
/// - session for a different user: 404, so a caller cannot tell whether the
///   other user, or anything under them, exists
///
/// Runs before any lookup; the status never depends on what the store returns.
/// The session is checked before the path, and a path that fails to decode
/// counts as a mismatch.
pub async fn user_scope_guard(
    params: Result<Path<HashMap<String, String>>, PathRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Unauthorized"))?;

    let Path(params) = params.map_err(|rejection| {
        tracing::debug!(caller = %auth_user.id, error = %rejection, "Undecodable scoped path, answering 404");
        ApiError::not_found("Not found")
    })?;

    let requested = params.get("user_id").map(String::as_str).unwrap_or_default();
    if !scope_matches(&auth_user, requested) {
        tracing::debug!(
            caller = %auth_user.id,
            requested = %requested,
            "User scope mismatch, answering 404"
        );
        return Err(ApiError::not_found("Not found"));
    }

    request.extensions_mut().insert(Owner { user_id: auth_user.id });
    Ok(next.run(request).await)
}

fn scope_matches(auth_user: &AuthUser, requested: &str) -> bool {
    Uuid::parse_str(requested).map_or(false, |id| id == auth_user.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_must_be_the_callers_own_id() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
        };

        assert!(scope_matches(&user, &user.id.to_string()));
        assert!(scope_matches(&user, &user.id.simple().to_string()));
        assert!(!scope_matches(&user, &Uuid::new_v4().to_string()));
        assert!(!scope_matches(&user, "not-a-uuid"));
        assert!(!scope_matches(&user, ""));
    }
}
