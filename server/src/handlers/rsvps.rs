use axum::extract::{Path, State};
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::auth::Subject;
use crate::policy::{Action, RsvpPayload};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::JsonBody;
use crate::utils::response::{created, ok};

/// RSVPs are always made by the caller for themselves. Any `user` or `event`
/// in the body is ignored.
pub async fn create_rsvp(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
    JsonBody(payload): JsonBody<RsvpPayload>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    state
        .authorizer
        .authorize(&subject, Action::CreateRsvp(&event))
        .into_result()?;
    let actor = subject.require_user()?;

    let new = state.validator.rsvp_create(actor, &event, payload).await?;
    let rsvp = state.store.insert_rsvp(new).await?;

    info!(event_id = %event.id, user_id = %actor, status = %rsvp.status, "RSVP created");
    Ok(created(rsvp))
}

pub async fn update_rsvp(
    State(state): State<AppState>,
    subject: Subject,
    Path((event_id, user_id)): Path<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<RsvpPayload>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    let rsvp = state
        .store
        .find_rsvp(event.id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("RSVP"))?;
    state
        .authorizer
        .authorize(&subject, Action::UpdateRsvp { rsvp: &rsvp, event: &event })
        .into_result()?;
    let actor = subject.require_user()?;

    let status = state.validator.rsvp_update(actor, &rsvp, &event, payload)?;
    let updated = state.store.update_rsvp_status(rsvp.id, status).await?;

    info!(event_id = %event.id, user_id = %user_id, actor = %actor, status = %status, "RSVP updated");
    Ok(ok(updated))
}
