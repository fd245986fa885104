pub mod accounts;
pub mod events;
pub mod slug;
pub mod tracks;
pub mod uploads;

pub use slug::{next_available_slug, slugify};
