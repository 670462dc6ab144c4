//! Who may do what to which event, RSVP or review.
//!
//! [`visibility`] answers "may this subject read this event", [`authorization`]
//! turns an action on a target into an allow/deny decision, and
//! [`validation`] checks the proposed state of a create or update.

pub mod authorization;
pub mod validation;
pub mod visibility;

pub use authorization::{Action, Authorizer, Decision, DenyReason, ReviewListPolicy};
pub use validation::{
    EventPayload, Rejection, ReviewPayload, RsvpPayload, UpdateMode, ValidationError, Validator,
};
pub use visibility::can_view;
