use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::{session_middleware, user_scope_guard};
use crate::AppState;

/// The full HTTP surface.
///
/// Every request passes through `session_middleware`, which only attaches an
/// identity. Rejection happens in the handlers (`whoami`) or in
/// `user_scope_guard` for the `/api/users/:user_id` tree.
pub fn app(state: AppState) -> Router {
    let max_body = state.config.api.max_request_size_bytes;
    let cors = cors_layer(&state.config.security.cors_origins);

    Router::new()
        // Public
        .route("/health", get(public::health::health_get))
        .merge(auth_routes())
        // Owner-scoped API
        .merge(user_routes())
        // Global middleware
        .layer(from_fn_with_state(state.clone(), session_middleware))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn auth_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/whoami", get(protected::whoami::whoami_get))
}

/// Everything under `/api/users/:user_id`, behind the ownership guard.
fn user_routes() -> Router<AppState> {
    use protected::{appointments, events, notifications, profile, tracks, uploads};

    Router::new()
        .route(
            "/api/users/:user_id",
            get(profile::profile_get).patch(profile::profile_patch),
        )
        // Tracks
        .route(
            "/api/users/:user_id/tracks",
            get(tracks::tracks_get).post(tracks::tracks_post),
        )
        .route(
            "/api/users/:user_id/tracks/:slug",
            get(tracks::track_get)
                .patch(tracks::track_patch)
                .delete(tracks::track_delete),
        )
        // Events
        .route(
            "/api/users/:user_id/tracks/:slug/events",
            get(events::events_get).post(events::events_post),
        )
        .route(
            "/api/users/:user_id/tracks/:slug/events/:event_id",
            get(events::event_get)
                .patch(events::event_patch)
                .delete(events::event_delete),
        )
        // Attachments
        .route(
            "/api/users/:user_id/tracks/:slug/events/:event_id/upload-url",
            post(uploads::upload_url_post),
        )
        .route(
            "/api/users/:user_id/tracks/:slug/events/:event_id/upload-confirm",
            post(uploads::upload_confirm_post),
        )
        .route(
            "/api/users/:user_id/tracks/:slug/events/:event_id/download-url",
            get(uploads::download_url_get),
        )
        // Cross-track views
        .route(
            "/api/users/:user_id/appointments/upcoming",
            get(appointments::upcoming_get),
        )
        .route(
            "/api/users/:user_id/hub/notifications",
            get(notifications::notifications_get).post(notifications::notifications_post),
        )
        .route(
            "/api/users/:user_id/hub/notifications/read-all",
            post(notifications::notifications_read_all_post),
        )
        .route(
            "/api/users/:user_id/hub/notifications/:notification_id/read",
            post(notifications::notification_read_post),
        )
        .route_layer(from_fn(user_scope_guard))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
