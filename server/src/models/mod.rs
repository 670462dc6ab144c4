pub mod event;
pub mod review;
pub mod rsvp;
pub mod user;

pub use event::{Event, EventFields, NewEvent};
pub use review::{NewReview, Review, ReviewChanges};
pub use rsvp::{NewRsvp, Rsvp, RsvpStatus};
pub use user::User;
