pub mod event;
pub mod notification;
pub mod track;
pub mod upload;
pub mod user;

pub use event::{Event, EventChanges, EventType, NewEvent, UpcomingAppointment};
pub use notification::{NewNotification, Notification};
pub use track::{NewTrack, Track, TrackChanges, TrackFiles};
pub use upload::{NewPendingUpload, PendingUpload};
pub use user::User;
