use tracing::{debug, info};

use crate::api::format::SessionView;
use crate::api::requests::Credentials;
use crate::auth::{hash_password, issue_token, verify_password};
use crate::config::SecurityConfig;
use crate::database::{HealthStore, StoreError, User};
use crate::error::ApiError;

const EMAIL_TAKEN: &str = "email: Already registered";
const BAD_CREDENTIALS: &str = "Invalid email or password";

/// Create an account and open a session for it.
pub async fn register(
    store: &dyn HealthStore,
    security: &SecurityConfig,
    credentials: Credentials,
) -> Result<SessionView, ApiError> {
    if store.find_user_by_email(&credentials.email).await?.is_some() {
        return Err(ApiError::validation_error(EMAIL_TAKEN));
    }

    let password_hash = hash_password(&credentials.password)?;
    let user = match store.create_user(&credentials.email, &password_hash).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => return Err(ApiError::validation_error(EMAIL_TAKEN)),
        Err(e) => return Err(e.into()),
    };

    info!(user = %user.id, "User registered");
    open_session(security, user)
}

/// Check credentials and open a session.
///
/// Unknown email and wrong password answer the same 401.
pub async fn login(
    store: &dyn HealthStore,
    security: &SecurityConfig,
    credentials: Credentials,
) -> Result<SessionView, ApiError> {
    let user = store
        .find_user_by_email(&credentials.email)
        .await?
        .filter(|user| verify_password(&credentials.password, &user.password_hash))
        .ok_or_else(|| {
            debug!("Login rejected");
            ApiError::unauthorized(BAD_CREDENTIALS)
        })?;

    info!(user = %user.id, "User logged in");
    open_session(security, user)
}

/// Change the account email, refusing one already held by another account.
pub async fn change_email(store: &dyn HealthStore, user: User, email: String) -> Result<User, ApiError> {
    if user.email == email {
        return Ok(user);
    }
    if store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::validation_error(EMAIL_TAKEN));
    }

    match store.update_user_email(user.id, &email).await {
        Ok(updated) => Ok(updated),
        Err(StoreError::Conflict(_)) => Err(ApiError::validation_error(EMAIL_TAKEN)),
        Err(e) => Err(e.into()),
    }
}

fn open_session(security: &SecurityConfig, user: User) -> Result<SessionView, ApiError> {
    let token = issue_token(security, user.id, &user.email)?;
    Ok(SessionView {
        token,
        user: user.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryStore;

    fn creds(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let store = MemoryStore::new();
        let security = AppConfig::development().security;

        let session = register(&store, &security, creds("ada@example.com", "correct horse")).await.unwrap();
        assert_eq!(session.user.email, "ada@example.com");
        assert!(!session.token.is_empty());

        let again = login(&store, &security, creds("ada@example.com", "correct horse")).await.unwrap();
        assert_eq!(again.user.id, session.user.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_validation_error() {
        let store = MemoryStore::new();
        let security = AppConfig::development().security;

        register(&store, &security, creds("ada@example.com", "correct horse")).await.unwrap();
        let err = register(&store, &security, creds("ada@example.com", "another one")).await.unwrap_err();
        assert_eq!(err.message(), EMAIL_TAKEN);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let store = MemoryStore::new();
        let security = AppConfig::development().security;
        register(&store, &security, creds("ada@example.com", "correct horse")).await.unwrap();

        let wrong = login(&store, &security, creds("ada@example.com", "battery staple")).await.unwrap_err();
        let unknown = login(&store, &security, creds("bob@example.com", "correct horse")).await.unwrap_err();
        assert_eq!(wrong.status_code(), axum::http::StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.message(), unknown.message());
    }
}
