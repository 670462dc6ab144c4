//! Persistence for events, RSVPs and reviews.
//!
//! The policy layer never talks to a database directly; it receives an
//! `Arc<dyn EntityStore>` at construction. Both backends enforce the
//! one-RSVP and one-review per (event, user) rule atomically, so a
//! validation pre-check that loses a race still ends in
//! [`StoreError::Duplicate`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Event, EventFields, NewEvent, NewReview, NewRsvp, Review, ReviewChanges, Rsvp, RsvpStatus};
use crate::utils::pagination::{Page, PageRequest};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which (event, user) uniqueness rule was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateKind {
    Rsvp,
    Review,
}

impl DuplicateKind {
    pub fn message(&self) -> &'static str {
        match self {
            DuplicateKind::Rsvp => "You already have an RSVP for this event.",
            DuplicateKind::Review => "You have already reviewed this event.",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0:?} for event and user")]
    Duplicate(DuplicateKind),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventOrdering {
    #[default]
    StartTimeDesc,
    StartTimeAsc,
    CreatedAtDesc,
    CreatedAtAsc,
}

impl EventOrdering {
    /// Parses the `?ordering=` values the list endpoint accepts.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "-start_time" => Some(Self::StartTimeDesc),
            "start_time" => Some(Self::StartTimeAsc),
            "-created_at" => Some(Self::CreatedAtDesc),
            "created_at" => Some(Self::CreatedAtAsc),
            _ => None,
        }
    }
}

/// Filters for the public event listing.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub search: Option<String>,
    pub ordering: EventOrdering,
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Returns the subset of `ids` that do not name an existing user.
    async fn missing_users(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>>;

    async fn insert_event(&self, new: NewEvent) -> StoreResult<Event>;
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn list_public_events(&self, query: &EventQuery, page: PageRequest) -> StoreResult<Page<Event>>;
    /// Overwrites every writable field. The organizer is left untouched.
    async fn update_event(&self, id: Uuid, fields: EventFields) -> StoreResult<Event>;
    /// Deletes the event together with its RSVPs, reviews and invitations.
    async fn delete_event(&self, id: Uuid) -> StoreResult<()>;

    async fn insert_rsvp(&self, new: NewRsvp) -> StoreResult<Rsvp>;
    async fn find_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>>;
    async fn update_rsvp_status(&self, id: Uuid, status: RsvpStatus) -> StoreResult<Rsvp>;

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review>;
    async fn find_review(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Review>>;
    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> StoreResult<Review>;
    async fn list_reviews(&self, event_id: Uuid, page: PageRequest) -> StoreResult<Page<Review>>;
}
