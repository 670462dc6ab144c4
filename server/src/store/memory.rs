use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DuplicateKind, EntityStore, EventOrdering, EventQuery, StoreError, StoreResult};
use crate::auth::IdentityProvider;
use crate::models::{
    Event, EventFields, NewEvent, NewReview, NewRsvp, Review, ReviewChanges, Rsvp, RsvpStatus, User,
};
use crate::utils::pagination::{Page, PageRequest};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tokens: HashMap<String, Uuid>,
    events: HashMap<Uuid, Event>,
    rsvps: HashMap<Uuid, Rsvp>,
    reviews: HashMap<Uuid, Review>,
}

/// Process-local store. Every mutation, including the uniqueness check that
/// precedes an insert, happens under one write lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stands in for the account service when there is no database.
    pub async fn register_user(&self, username: &str, email: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.tables.write().await.users.insert(user.id, user.clone());
        user
    }

    pub async fn issue_token(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tables.write().await.tokens.insert(token.clone(), user_id);
        token
    }
}

fn matches_search(event: &Event, organizer: Option<&User>, needle: &str) -> bool {
    [&event.title, &event.description, &event.location]
        .into_iter()
        .chain(organizer.map(|user| &user.username))
        .any(|field| field.to_lowercase().contains(needle))
}

fn sort_events(events: &mut [Event], ordering: EventOrdering) {
    events.sort_by(|a, b| {
        let primary = match ordering {
            EventOrdering::StartTimeDesc => b.start_time.cmp(&a.start_time),
            EventOrdering::StartTimeAsc => a.start_time.cmp(&b.start_time),
            EventOrdering::CreatedAtDesc => b.created_at.cmp(&a.created_at),
            EventOrdering::CreatedAtAsc => a.created_at.cmp(&b.created_at),
        };
        primary.then_with(|| a.title.cmp(&b.title))
    });
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn missing_users(&self, ids: &[Uuid]) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter(|id| !tables.users.contains_key(*id))
            .copied()
            .collect())
    }

    async fn insert_event(&self, new: NewEvent) -> StoreResult<Event> {
        let now = Utc::now();
        let EventFields {
            title,
            description,
            location,
            start_time,
            end_time,
            is_public,
            invited,
        } = new.fields;
        let event = Event {
            id: Uuid::new_v4(),
            title,
            description,
            organizer_id: new.organizer_id,
            location,
            start_time,
            end_time,
            is_public,
            invited,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_public_events(&self, query: &EventQuery, page: PageRequest) -> StoreResult<Page<Event>> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let tables = self.tables.read().await;
        let mut events: Vec<Event> = tables
            .events
            .values()
            .filter(|event| event.is_public)
            .filter(|event| {
                needle.as_deref().map_or(true, |n| {
                    matches_search(event, tables.users.get(&event.organizer_id), n)
                })
            })
            .cloned()
            .collect();
        drop(tables);
        sort_events(&mut events, query.ordering);

        Ok(Page::from_all(events, page))
    }

    async fn update_event(&self, id: Uuid, fields: EventFields) -> StoreResult<Event> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "Event", id })?;

        event.title = fields.title;
        event.description = fields.description;
        event.location = fields.location;
        event.start_time = fields.start_time;
        event.end_time = fields.end_time;
        event.is_public = fields.is_public;
        event.invited = fields.invited;
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.events.remove(&id).is_none() {
            return Err(StoreError::NotFound { entity: "Event", id });
        }
        tables.rsvps.retain(|_, rsvp| rsvp.event_id != id);
        tables.reviews.retain(|_, review| review.event_id != id);
        Ok(())
    }

    async fn insert_rsvp(&self, new: NewRsvp) -> StoreResult<Rsvp> {
        let mut tables = self.tables.write().await;
        if tables
            .rsvps
            .values()
            .any(|r| r.event_id == new.event_id && r.user_id == new.user_id)
        {
            return Err(StoreError::Duplicate(DuplicateKind::Rsvp));
        }

        let rsvp = Rsvp {
            id: Uuid::new_v4(),
            event_id: new.event_id,
            user_id: new.user_id,
            status: new.status,
            updated_at: Utc::now(),
        };
        tables.rsvps.insert(rsvp.id, rsvp.clone());
        Ok(rsvp)
    }

    async fn find_rsvp(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Rsvp>> {
        Ok(self
            .tables
            .read()
            .await
            .rsvps
            .values()
            .find(|r| r.event_id == event_id && r.user_id == user_id)
            .cloned())
    }

    async fn update_rsvp_status(&self, id: Uuid, status: RsvpStatus) -> StoreResult<Rsvp> {
        let mut tables = self.tables.write().await;
        let rsvp = tables
            .rsvps
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "RSVP", id })?;
        rsvp.status = status;
        rsvp.updated_at = Utc::now();
        Ok(rsvp.clone())
    }

    async fn insert_review(&self, new: NewReview) -> StoreResult<Review> {
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .values()
            .any(|r| r.event_id == new.event_id && r.user_id == new.user_id)
        {
            return Err(StoreError::Duplicate(DuplicateKind::Review));
        }

        let review = Review {
            id: Uuid::new_v4(),
            event_id: new.event_id,
            user_id: new.user_id,
            rating: new.rating,
            comment: new.comment,
            created_at: Utc::now(),
        };
        tables.reviews.insert(review.id, review.clone());
        Ok(review)
    }

    async fn find_review(&self, event_id: Uuid, user_id: Uuid) -> StoreResult<Option<Review>> {
        Ok(self
            .tables
            .read()
            .await
            .reviews
            .values()
            .find(|r| r.event_id == event_id && r.user_id == user_id)
            .cloned())
    }

    async fn update_review(&self, id: Uuid, changes: ReviewChanges) -> StoreResult<Review> {
        let mut tables = self.tables.write().await;
        let review = tables
            .reviews
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "Review", id })?;
        review.rating = changes.rating;
        review.comment = changes.comment;
        Ok(review.clone())
    }

    async fn list_reviews(&self, event_id: Uuid, page: PageRequest) -> StoreResult<Page<Review>> {
        let mut reviews: Vec<Review> = self
            .tables
            .read()
            .await
            .reviews
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(Page::from_all(reviews, page))
    }
}

#[async_trait]
impl IdentityProvider for MemoryStore {
    async fn resolve_token(&self, token: &str) -> StoreResult<Option<Uuid>> {
        Ok(self.tables.read().await.tokens.get(token).copied())
    }
}
