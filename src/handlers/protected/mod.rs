// handlers/protected/mod.rs - Protected handlers (session required)
//
// `whoami` only needs a session. Everything else lives under
// /api/users/:user_id and runs behind `user_scope_guard`, which hands each
// handler an `Owner` already checked against the caller.

use serde::Deserialize;

pub mod appointments;
pub mod events;
pub mod notifications;
pub mod profile;
pub mod tracks;
pub mod uploads;
pub mod whoami;

/// `/tracks/:slug`
#[derive(Debug, Deserialize)]
pub struct TrackPath {
    pub slug: String,
}

/// `/tracks/:slug/events/:event_id`
///
/// The event id stays a string so a malformed id is a 404, not a path rejection.
#[derive(Debug, Deserialize)]
pub struct EventPath {
    pub slug: String,
    pub event_id: String,
}
