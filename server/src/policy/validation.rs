//! Field-level checks on proposed entity states.
//!
//! Each rule is a plain function returning `Result<_, Rejection>`.
//! [`Validator`] composes them in a fixed order and adds the checks that need
//! the store (duplicates, unknown invitees). The first failing rule wins.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::review::{MAX_RATING, MIN_RATING};
use crate::models::{
    Event, EventFields, NewEvent, NewReview, NewRsvp, Review, ReviewChanges, Rsvp, RsvpStatus,
};
use crate::store::{DuplicateKind, EntityStore, StoreError};

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_LOCATION_LEN: usize = 255;

/// Key used for rejections that are not about a single field.
pub const DETAIL: &str = "detail";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct Rejection {
    pub field: &'static str,
    pub message: String,
}

impl Rejection {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    pub fn detail(message: impl Into<String>) -> Self {
        Self::new(DETAIL, message)
    }

    pub fn required(field: &'static str) -> Self {
        Self::new(field, "This field is required.")
    }

    pub fn duplicate(kind: DuplicateKind) -> Self {
        Self::detail(kind.message())
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Event body for create, replace and partial update. Unknown keys such as
/// `organizer` are dropped during deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_public: Option<bool>,
    pub invited: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RsvpPayload {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPayload {
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

/// PUT replaces the writable fields, PATCH merges over the stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Replace,
    Merge,
}

pub fn check_title(title: &str) -> Result<(), Rejection> {
    if title.trim().is_empty() {
        return Err(Rejection::new("title", "This field may not be blank."));
    }
    check_max_len("title", title, MAX_TITLE_LEN)
}

pub fn check_max_len(field: &'static str, value: &str, max: usize) -> Result<(), Rejection> {
    if value.chars().count() > max {
        return Err(Rejection::new(
            field,
            format!("Ensure this field has no more than {max} characters."),
        ));
    }
    Ok(())
}

pub fn check_time_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), Rejection> {
    if end <= start {
        return Err(Rejection::new("end_time", "end_time must be after start_time."));
    }
    Ok(())
}

pub fn parse_status(raw: Option<&str>) -> Result<RsvpStatus, Rejection> {
    let raw = raw.ok_or_else(|| Rejection::required("status"))?;
    raw.parse()
        .map_err(|_| Rejection::new("status", "Invalid RSVP status."))
}

pub fn check_rating(raw: Option<i64>) -> Result<i16, Rejection> {
    let raw = raw.ok_or_else(|| Rejection::required("rating"))?;
    if raw < i64::from(MIN_RATING) || raw > i64::from(MAX_RATING) {
        return Err(Rejection::new(
            "rating",
            format!("rating must be between {MIN_RATING} and {MAX_RATING}."),
        ));
    }
    // in range, so the narrowing cannot truncate
    Ok(raw as i16)
}

/// A private event only accepts RSVPs from its organizer and invitees.
pub fn check_invited(user_id: Uuid, event: &Event) -> Result<(), Rejection> {
    if event.is_public || event.is_organized_by(user_id) || event.is_invited(user_id) {
        return Ok(());
    }
    Err(Rejection::new("event", "You are not invited to this private event."))
}

pub fn check_owner_or_organizer(
    actor: Uuid,
    owner_id: Uuid,
    event: &Event,
    message: &str,
) -> Result<(), Rejection> {
    if actor == owner_id || event.is_organized_by(actor) {
        return Ok(());
    }
    Err(Rejection::detail(message))
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[derive(Clone)]
pub struct Validator {
    store: Arc<dyn EntityStore>,
}

impl Validator {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// The organizer is always `actor`, whatever the payload says.
    pub async fn event_create(
        &self,
        actor: Uuid,
        payload: EventPayload,
    ) -> Result<NewEvent, ValidationError> {
        let title = payload.title.ok_or_else(|| Rejection::required("title"))?;
        let start_time = payload
            .start_time
            .ok_or_else(|| Rejection::required("start_time"))?;
        let end_time = payload
            .end_time
            .ok_or_else(|| Rejection::required("end_time"))?;

        let fields = EventFields {
            title,
            description: payload.description.unwrap_or_default(),
            location: payload.location.unwrap_or_default(),
            start_time,
            end_time,
            is_public: payload.is_public.unwrap_or(true),
            invited: dedup(payload.invited.unwrap_or_default()),
        };
        self.check_event_fields(&fields).await?;

        Ok(NewEvent {
            organizer_id: actor,
            fields,
        })
    }

    /// Produces the full set of writable fields after the update. The
    /// organizer is not among them, so it stays pinned to `existing`.
    pub async fn event_update(
        &self,
        existing: &Event,
        payload: EventPayload,
        mode: UpdateMode,
    ) -> Result<EventFields, ValidationError> {
        if mode == UpdateMode::Replace {
            if payload.title.is_none() {
                return Err(Rejection::required("title").into());
            }
            if payload.start_time.is_none() {
                return Err(Rejection::required("start_time").into());
            }
            if payload.end_time.is_none() {
                return Err(Rejection::required("end_time").into());
            }
        }

        let current = existing.fields();
        let fields = EventFields {
            title: payload.title.unwrap_or(current.title),
            description: payload.description.unwrap_or(current.description),
            location: payload.location.unwrap_or(current.location),
            start_time: payload.start_time.unwrap_or(current.start_time),
            end_time: payload.end_time.unwrap_or(current.end_time),
            is_public: payload.is_public.unwrap_or(current.is_public),
            invited: payload.invited.map(dedup).unwrap_or(current.invited),
        };
        self.check_event_fields(&fields).await?;
        Ok(fields)
    }

    async fn check_event_fields(&self, fields: &EventFields) -> Result<(), ValidationError> {
        check_title(&fields.title)?;
        check_max_len("location", &fields.location, MAX_LOCATION_LEN)?;
        check_time_window(fields.start_time, fields.end_time)?;

        let missing = self.store.missing_users(&fields.invited).await?;
        if let Some(id) = missing.first() {
            return Err(Rejection::new(
                "invited",
                format!("Invalid pk \"{id}\" - object does not exist."),
            )
            .into());
        }
        Ok(())
    }

    /// The RSVP is always for `actor`; the event comes from the route.
    pub async fn rsvp_create(
        &self,
        actor: Uuid,
        event: &Event,
        payload: RsvpPayload,
    ) -> Result<NewRsvp, ValidationError> {
        let status = parse_status(payload.status.as_deref())?;
        if self.store.find_rsvp(event.id, actor).await?.is_some() {
            return Err(Rejection::duplicate(DuplicateKind::Rsvp).into());
        }
        check_invited(actor, event)?;

        Ok(NewRsvp {
            event_id: event.id,
            user_id: actor,
            status,
        })
    }

    /// Returns the status to store. Omitting `status` keeps the current one.
    pub fn rsvp_update(
        &self,
        actor: Uuid,
        rsvp: &Rsvp,
        event: &Event,
        payload: RsvpPayload,
    ) -> Result<RsvpStatus, Rejection> {
        check_owner_or_organizer(actor, rsvp.user_id, event, "You cannot modify someone else's RSVP.")?;
        match payload.status {
            Some(raw) => parse_status(Some(&raw)),
            None => Ok(rsvp.status),
        }
    }

    pub async fn review_create(
        &self,
        actor: Uuid,
        event: &Event,
        payload: ReviewPayload,
    ) -> Result<NewReview, ValidationError> {
        let rating = check_rating(payload.rating)?;
        if self.store.find_review(event.id, actor).await?.is_some() {
            return Err(Rejection::duplicate(DuplicateKind::Review).into());
        }

        Ok(NewReview {
            event_id: event.id,
            user_id: actor,
            rating,
            comment: payload.comment.unwrap_or_default(),
        })
    }

    pub fn review_update(
        &self,
        actor: Uuid,
        review: &Review,
        event: &Event,
        payload: ReviewPayload,
    ) -> Result<ReviewChanges, Rejection> {
        check_owner_or_organizer(actor, review.user_id, event, "You cannot modify someone else's review.")?;
        let rating = match payload.rating {
            Some(raw) => check_rating(Some(raw))?,
            None => review.rating,
        };

        Ok(ReviewChanges {
            rating,
            comment: payload.comment.unwrap_or_else(|| review.comment.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::store::MemoryStore;
    use chrono::Duration;

    struct Fixture {
        store: Arc<MemoryStore>,
        validator: Validator,
        organizer: User,
        guest: User,
        stranger: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let organizer = store.register_user("org", "org@example.com").await;
        let guest = store.register_user("guest", "guest@example.com").await;
        let stranger = store.register_user("stranger", "stranger@example.com").await;
        let validator = Validator::new(store.clone());
        Fixture {
            store,
            validator,
            organizer,
            guest,
            stranger,
        }
    }

    fn payload(hours: i64) -> EventPayload {
        let start = Utc::now() + Duration::days(2);
        EventPayload {
            title: Some("Hack night".to_string()),
            start_time: Some(start),
            end_time: Some(start + Duration::hours(hours)),
            ..Default::default()
        }
    }

    async fn private_event(f: &Fixture) -> Event {
        let mut p = payload(2);
        p.is_public = Some(false);
        p.invited = Some(vec![f.guest.id]);
        let new = f.validator.event_create(f.organizer.id, p).await.unwrap();
        f.store.insert_event(new).await.unwrap()
    }

    fn rejection(err: ValidationError) -> Rejection {
        match err {
            ValidationError::Rejected(r) => r,
            ValidationError::Store(e) => panic!("unexpected store error: {e}"),
        }
    }

    #[test]
    fn test_time_window() {
        let now = Utc::now();
        assert!(check_time_window(now, now + Duration::minutes(1)).is_ok());
        assert_eq!(check_time_window(now, now).unwrap_err().field, "end_time");
        assert_eq!(
            check_time_window(now, now - Duration::hours(1)).unwrap_err().field,
            "end_time"
        );
    }

    #[test]
    fn test_rating_bounds() {
        for rating in 1..=5 {
            assert_eq!(check_rating(Some(rating)).unwrap(), rating as i16);
        }
        for rating in [0, 6, -1, 100, i64::MAX] {
            assert_eq!(check_rating(Some(rating)).unwrap_err().field, "rating");
        }
        assert_eq!(check_rating(None).unwrap_err(), Rejection::required("rating"));
    }

    #[test]
    fn test_status_values() {
        assert_eq!(parse_status(Some("Maybe")).unwrap(), RsvpStatus::Maybe);
        assert_eq!(parse_status(Some("Not Going")).unwrap(), RsvpStatus::NotGoing);
        assert_eq!(parse_status(Some("Sure")).unwrap_err().field, "status");
        assert_eq!(parse_status(None).unwrap_err().field, "status");
    }

    #[test]
    fn test_title_rules() {
        assert!(check_title("Picnic").is_ok());
        assert_eq!(check_title("   ").unwrap_err().field, "title");
        assert_eq!(check_title(&"x".repeat(256)).unwrap_err().field, "title");
    }

    #[tokio::test]
    async fn test_event_create_pins_organizer_and_defaults() {
        let f = fixture().await;
        let new = f.validator.event_create(f.guest.id, payload(1)).await.unwrap();

        assert_eq!(new.organizer_id, f.guest.id);
        assert!(new.fields.is_public);
        assert!(new.fields.invited.is_empty());
    }

    #[tokio::test]
    async fn test_event_create_rejects_bad_window() {
        let f = fixture().await;
        let err = f.validator.event_create(f.organizer.id, payload(0)).await.unwrap_err();
        assert_eq!(rejection(err).field, "end_time");

        let err = f.validator.event_create(f.organizer.id, payload(-3)).await.unwrap_err();
        assert_eq!(rejection(err).field, "end_time");
    }

    #[tokio::test]
    async fn test_event_create_requires_fields() {
        let f = fixture().await;
        let err = f
            .validator
            .event_create(f.organizer.id, EventPayload::default())
            .await
            .unwrap_err();
        assert_eq!(rejection(err), Rejection::required("title"));
    }

    #[tokio::test]
    async fn test_event_create_rejects_unknown_invitee() {
        let f = fixture().await;
        let mut p = payload(1);
        p.invited = Some(vec![f.guest.id, Uuid::new_v4()]);

        let err = f.validator.event_create(f.organizer.id, p).await.unwrap_err();
        assert_eq!(rejection(err).field, "invited");
    }

    #[tokio::test]
    async fn test_event_update_merges_and_checks_window() {
        let f = fixture().await;
        let event = private_event(&f).await;

        let patch = EventPayload {
            end_time: Some(event.start_time - Duration::minutes(5)),
            ..Default::default()
        };
        let err = f
            .validator
            .event_update(&event, patch, UpdateMode::Merge)
            .await
            .unwrap_err();
        assert_eq!(rejection(err).field, "end_time");

        let patch = EventPayload {
            title: Some("Renamed".to_string()),
            ..Default::default()
        };
        let fields = f
            .validator
            .event_update(&event, patch, UpdateMode::Merge)
            .await
            .unwrap();
        assert_eq!(fields.title, "Renamed");
        assert_eq!(fields.invited, vec![f.guest.id]);
        assert!(!fields.is_public);
    }

    #[tokio::test]
    async fn test_event_replace_requires_full_body() {
        let f = fixture().await;
        let event = private_event(&f).await;
        let patch = EventPayload {
            title: Some("Only a title".to_string()),
            ..Default::default()
        };

        let err = f
            .validator
            .event_update(&event, patch, UpdateMode::Replace)
            .await
            .unwrap_err();
        assert_eq!(rejection(err), Rejection::required("start_time"));
    }

    #[tokio::test]
    async fn test_rsvp_create_rules_in_order() {
        let f = fixture().await;
        let event = private_event(&f).await;

        let bad_status = RsvpPayload { status: Some("Yes".to_string()) };
        let err = f
            .validator
            .rsvp_create(f.stranger.id, &event, bad_status)
            .await
            .unwrap_err();
        assert_eq!(rejection(err).field, "status");

        let going = RsvpPayload { status: Some("Going".to_string()) };
        let err = f
            .validator
            .rsvp_create(f.stranger.id, &event, going.clone())
            .await
            .unwrap_err();
        assert_eq!(rejection(err).field, "event");

        let new = f.validator.rsvp_create(f.guest.id, &event, going.clone()).await.unwrap();
        assert_eq!(new.user_id, f.guest.id);
        f.store.insert_rsvp(new).await.unwrap();

        let err = f
            .validator
            .rsvp_create(f.guest.id, &event, going)
            .await
            .unwrap_err();
        assert_eq!(rejection(err), Rejection::duplicate(DuplicateKind::Rsvp));
    }

    #[tokio::test]
    async fn test_rsvp_update_ownership_and_status() {
        let f = fixture().await;
        let event = private_event(&f).await;
        let rsvp = f
            .store
            .insert_rsvp(NewRsvp {
                event_id: event.id,
                user_id: f.guest.id,
                status: RsvpStatus::Going,
            })
            .await
            .unwrap();
        let maybe = RsvpPayload { status: Some("Maybe".to_string()) };

        let err = f
            .validator
            .rsvp_update(f.stranger.id, &rsvp, &event, maybe.clone())
            .unwrap_err();
        assert_eq!(err.field, DETAIL);

        assert_eq!(
            f.validator.rsvp_update(f.organizer.id, &rsvp, &event, maybe).unwrap(),
            RsvpStatus::Maybe
        );
        assert_eq!(
            f.validator
                .rsvp_update(f.guest.id, &rsvp, &event, RsvpPayload::default())
                .unwrap(),
            RsvpStatus::Going
        );
    }

    #[tokio::test]
    async fn test_review_create_and_duplicate() {
        let f = fixture().await;
        let event = private_event(&f).await;
        let five = ReviewPayload { rating: Some(5), comment: Some("Great".to_string()) };

        let err = f
            .validator
            .review_create(f.guest.id, &event, ReviewPayload { rating: Some(9), comment: None })
            .await
            .unwrap_err();
        assert_eq!(rejection(err).field, "rating");

        let new = f.validator.review_create(f.guest.id, &event, five.clone()).await.unwrap();
        f.store.insert_review(new).await.unwrap();

        let err = f.validator.review_create(f.guest.id, &event, five).await.unwrap_err();
        assert_eq!(rejection(err), Rejection::duplicate(DuplicateKind::Review));
    }

    #[tokio::test]
    async fn test_review_update_keeps_omitted_fields() {
        let f = fixture().await;
        let event = private_event(&f).await;
        let review = f
            .store
            .insert_review(NewReview {
                event_id: event.id,
                user_id: f.guest.id,
                rating: 3,
                comment: "ok".to_string(),
            })
            .await
            .unwrap();

        let changes = f
            .validator
            .review_update(f.organizer.id, &review, &event, ReviewPayload { rating: Some(4), comment: None })
            .unwrap();
        assert_eq!(changes.rating, 4);
        assert_eq!(changes.comment, "ok");

        let err = f
            .validator
            .review_update(f.stranger.id, &review, &event, ReviewPayload::default())
            .unwrap_err();
        assert_eq!(err.field, DETAIL);

        let err = f
            .validator
            .review_update(f.guest.id, &review, &event, ReviewPayload { rating: Some(0), comment: None })
            .unwrap_err();
        assert_eq!(err.field, "rating");
    }
}
