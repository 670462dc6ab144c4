use super::visibility::can_view;
use crate::auth::Subject;
use crate::models::{Event, Review, Rsvp};

/// An operation together with the entity it targets.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    CreateEvent,
    ReadEvent(&'a Event),
    UpdateEvent(&'a Event),
    DeleteEvent(&'a Event),
    CreateRsvp(&'a Event),
    UpdateRsvp { rsvp: &'a Rsvp, event: &'a Event },
    CreateReview(&'a Event),
    UpdateReview { review: &'a Review, event: &'a Event },
    ReadReviewList(&'a Event),
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateEvent => "create_event",
            Action::ReadEvent(_) => "read_event",
            Action::UpdateEvent(_) => "update_event",
            Action::DeleteEvent(_) => "delete_event",
            Action::CreateRsvp(_) => "create_rsvp",
            Action::UpdateRsvp { .. } => "update_rsvp",
            Action::CreateReview(_) => "create_review",
            Action::UpdateReview { .. } => "update_review",
            Action::ReadReviewList(_) => "read_review_list",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    Unauthenticated,
    NotOrganizer,
    NotInvited,
    NotOwnerOrOrganizer,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "UNAUTHENTICATED",
            DenyReason::NotOrganizer => "NOT_ORGANIZER",
            DenyReason::NotInvited => "NOT_INVITED",
            DenyReason::NotOwnerOrOrganizer => "NOT_OWNER_OR_ORGANIZER",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "Authentication credentials were not provided.",
            DenyReason::NotOrganizer => "Only the organizer can modify this event.",
            DenyReason::NotInvited => "You are not invited to this private event.",
            DenyReason::NotOwnerOrOrganizer => {
                "Only the owner or the event organizer can modify this."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Whether listing an event's reviews requires being able to see the event.
/// Historically the listing was open to anyone, even for private events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewListPolicy {
    #[default]
    Open,
    EventVisibility,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Authorizer {
    review_list: ReviewListPolicy,
}

impl Authorizer {
    pub fn new(review_list: ReviewListPolicy) -> Self {
        Self { review_list }
    }

    pub fn review_list_policy(&self) -> ReviewListPolicy {
        self.review_list
    }

    pub fn authorize(&self, subject: &Subject, action: Action<'_>) -> Decision {
        let decision = self.evaluate(subject, action);
        if let Decision::Deny(reason) = decision {
            tracing::debug!(
                action = action.name(),
                subject = ?subject.user_id(),
                reason = reason.code(),
                "Authorization denied"
            );
        }
        decision
    }

    fn evaluate(&self, subject: &Subject, action: Action<'_>) -> Decision {
        match action {
            Action::ReadEvent(event) => visible(subject, event),
            Action::ReadReviewList(event) => match self.review_list {
                ReviewListPolicy::Open => Decision::Allow,
                ReviewListPolicy::EventVisibility => visible(subject, event),
            },
            _ if !subject.is_authenticated() => Decision::Deny(DenyReason::Unauthenticated),
            Action::CreateEvent => Decision::Allow,
            Action::UpdateEvent(event) | Action::DeleteEvent(event) => {
                allow_if(subject.is(event.organizer_id), DenyReason::NotOrganizer)
            }
            Action::CreateRsvp(event) | Action::CreateReview(event) => {
                allow_if(can_view(subject, event), DenyReason::NotInvited)
            }
            Action::UpdateRsvp { rsvp, event } => allow_if(
                subject.is(rsvp.user_id) || subject.is(event.organizer_id),
                DenyReason::NotOwnerOrOrganizer,
            ),
            Action::UpdateReview { review, event } => allow_if(
                subject.is(review.user_id) || subject.is(event.organizer_id),
                DenyReason::NotOwnerOrOrganizer,
            ),
        }
    }
}

fn visible(subject: &Subject, event: &Event) -> Decision {
    if can_view(subject, event) {
        Decision::Allow
    } else if subject.is_authenticated() {
        Decision::Deny(DenyReason::NotInvited)
    } else {
        Decision::Deny(DenyReason::Unauthenticated)
    }
}

fn allow_if(condition: bool, reason: DenyReason) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RsvpStatus;
    use crate::policy::visibility::tests::event;
    use chrono::Utc;
    use uuid::Uuid;

    fn rsvp(event: &Event, user_id: Uuid) -> Rsvp {
        Rsvp {
            id: Uuid::new_v4(),
            event_id: event.id,
            user_id,
            status: RsvpStatus::Going,
            updated_at: Utc::now(),
        }
    }

    fn review(event: &Event, user_id: Uuid) -> Review {
        Review {
            id: Uuid::new_v4(),
            event_id: event.id,
            user_id,
            rating: 4,
            comment: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_create_event_requires_authentication() {
        let authz = Authorizer::default();
        assert_eq!(
            authz.authorize(&Subject::Anonymous, Action::CreateEvent),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert!(authz
            .authorize(&Subject::User(Uuid::new_v4()), Action::CreateEvent)
            .is_allowed());
    }

    #[test]
    fn test_read_private_event_reasons() {
        let authz = Authorizer::default();
        let guest = Uuid::new_v4();
        let private = event(Uuid::new_v4(), false, vec![guest]);

        assert_eq!(
            authz.authorize(&Subject::Anonymous, Action::ReadEvent(&private)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            authz.authorize(&Subject::User(Uuid::new_v4()), Action::ReadEvent(&private)),
            Decision::Deny(DenyReason::NotInvited)
        );
        assert!(authz
            .authorize(&Subject::User(guest), Action::ReadEvent(&private))
            .is_allowed());
    }

    #[test]
    fn test_only_organizer_updates_or_deletes() {
        let authz = Authorizer::default();
        let guest = Uuid::new_v4();
        let event = event(Uuid::new_v4(), false, vec![guest]);
        let organizer = Subject::User(event.organizer_id);

        assert!(authz.authorize(&organizer, Action::UpdateEvent(&event)).is_allowed());
        assert!(authz.authorize(&organizer, Action::DeleteEvent(&event)).is_allowed());
        assert_eq!(
            authz.authorize(&Subject::User(guest), Action::UpdateEvent(&event)),
            Decision::Deny(DenyReason::NotOrganizer)
        );
        assert_eq!(
            authz.authorize(&Subject::Anonymous, Action::DeleteEvent(&event)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_create_rsvp_and_review_require_visibility() {
        let authz = Authorizer::default();
        let guest = Uuid::new_v4();
        let stranger = Subject::User(Uuid::new_v4());
        let private = event(Uuid::new_v4(), false, vec![guest]);
        let public = event(Uuid::new_v4(), true, vec![]);

        assert_eq!(
            authz.authorize(&stranger, Action::CreateRsvp(&private)),
            Decision::Deny(DenyReason::NotInvited)
        );
        assert_eq!(
            authz.authorize(&stranger, Action::CreateReview(&private)),
            Decision::Deny(DenyReason::NotInvited)
        );
        assert!(authz.authorize(&Subject::User(guest), Action::CreateRsvp(&private)).is_allowed());
        assert!(authz.authorize(&stranger, Action::CreateReview(&public)).is_allowed());
        assert_eq!(
            authz.authorize(&Subject::Anonymous, Action::CreateRsvp(&public)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_update_rsvp_owner_or_organizer() {
        let authz = Authorizer::default();
        let owner = Uuid::new_v4();
        let event = event(Uuid::new_v4(), true, vec![]);
        let rsvp = rsvp(&event, owner);
        let action = Action::UpdateRsvp { rsvp: &rsvp, event: &event };

        assert!(authz.authorize(&Subject::User(owner), action).is_allowed());
        assert!(authz.authorize(&Subject::User(event.organizer_id), action).is_allowed());
        assert_eq!(
            authz.authorize(&Subject::User(Uuid::new_v4()), action),
            Decision::Deny(DenyReason::NotOwnerOrOrganizer)
        );
    }

    #[test]
    fn test_update_review_owner_or_organizer() {
        let authz = Authorizer::default();
        let owner = Uuid::new_v4();
        let event = event(Uuid::new_v4(), true, vec![]);
        let review = review(&event, owner);
        let action = Action::UpdateReview { review: &review, event: &event };

        assert!(authz.authorize(&Subject::User(owner), action).is_allowed());
        assert!(authz.authorize(&Subject::User(event.organizer_id), action).is_allowed());
        assert_eq!(
            authz.authorize(&Subject::User(Uuid::new_v4()), action),
            Decision::Deny(DenyReason::NotOwnerOrOrganizer)
        );
        assert_eq!(
            authz.authorize(&Subject::Anonymous, action),
            Decision::Deny(DenyReason::Unauthenticated)
        );
    }

    #[test]
    fn test_review_list_is_open_by_default_even_for_private_events() {
        let private = event(Uuid::new_v4(), false, vec![]);
        let authz = Authorizer::default();

        assert!(authz
            .authorize(&Subject::Anonymous, Action::ReadReviewList(&private))
            .is_allowed());
    }

    #[test]
    fn test_review_list_gated_when_visibility_policy_selected() {
        let private = event(Uuid::new_v4(), false, vec![]);
        let authz = Authorizer::new(ReviewListPolicy::EventVisibility);

        assert_eq!(
            authz.authorize(&Subject::Anonymous, Action::ReadReviewList(&private)),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert!(authz
            .authorize(&Subject::User(private.organizer_id), Action::ReadReviewList(&private))
            .is_allowed());
    }
}
