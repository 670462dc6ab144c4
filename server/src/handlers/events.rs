use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::auth::Subject;
use crate::policy::{Action, EventPayload, UpdateMode};
use crate::state::AppState;
use crate::store::{EventOrdering, EventQuery};
use crate::utils::error::AppError;
use crate::utils::extract::{JsonBody, QueryParams};
use crate::utils::pagination::PageRequest;
use crate::utils::response::{created, no_content, ok};

#[derive(Debug, Default, Deserialize)]
pub struct EventListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

/// Lists public events only. Private events are reachable by id alone.
pub async fn list_events(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<EventListParams>,
) -> Result<Response, AppError> {
    let query = EventQuery {
        search: params.search,
        ordering: params
            .ordering
            .as_deref()
            .and_then(EventOrdering::parse)
            .unwrap_or_default(),
    };
    let page = PageRequest::new(params.page, params.page_size);

    let events = state.store.list_public_events(&query, page).await?;
    if !page.is_within(events.count) {
        return Err(AppError::NotFound("Invalid page.".to_string()));
    }
    Ok(ok(events))
}

pub async fn create_event(
    State(state): State<AppState>,
    subject: Subject,
    JsonBody(payload): JsonBody<EventPayload>,
) -> Result<Response, AppError> {
    state
        .authorizer
        .authorize(&subject, Action::CreateEvent)
        .into_result()?;
    let actor = subject.require_user()?;

    let new = state.validator.event_create(actor, payload).await?;
    let event = state.store.insert_event(new).await?;

    info!(event_id = %event.id, organizer = %actor, is_public = event.is_public, "Event created");
    Ok(created(event))
}

pub async fn get_event(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    state
        .authorizer
        .authorize(&subject, Action::ReadEvent(&event))
        .into_result()?;

    Ok(ok(event))
}

pub async fn replace_event(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
    JsonBody(payload): JsonBody<EventPayload>,
) -> Result<Response, AppError> {
    update_event(state, subject, event_id, payload, UpdateMode::Replace).await
}

pub async fn patch_event(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
    JsonBody(payload): JsonBody<EventPayload>,
) -> Result<Response, AppError> {
    update_event(state, subject, event_id, payload, UpdateMode::Merge).await
}

async fn update_event(
    state: AppState,
    subject: Subject,
    event_id: Uuid,
    payload: EventPayload,
    mode: UpdateMode,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    state
        .authorizer
        .authorize(&subject, Action::UpdateEvent(&event))
        .into_result()?;

    let fields = state.validator.event_update(&event, payload, mode).await?;
    let updated = state.store.update_event(event.id, fields).await?;

    info!(event_id = %updated.id, ?mode, "Event updated");
    Ok(ok(updated))
}

pub async fn delete_event(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    state
        .authorizer
        .authorize(&subject, Action::DeleteEvent(&event))
        .into_result()?;

    state.store.delete_event(event.id).await?;

    info!(event_id = %event.id, "Event deleted");
    Ok(no_content())
}
