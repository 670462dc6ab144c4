use axum::extract::{Path, State};
use axum::response::Response;
use tracing::info;
use uuid::Uuid;

use crate::auth::Subject;
use crate::policy::{Action, ReviewPayload};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::extract::{JsonBody, QueryParams};
use crate::utils::pagination::{PageParams, PageRequest};
use crate::utils::response::{created, ok};

pub async fn list_reviews(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
    QueryParams(params): QueryParams<PageParams>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    state
        .authorizer
        .authorize(&subject, Action::ReadReviewList(&event))
        .into_result()?;

    let page = PageRequest::from(params);
    let reviews = state.store.list_reviews(event.id, page).await?;
    if !page.is_within(reviews.count) {
        return Err(AppError::NotFound("Invalid page.".to_string()));
    }
    Ok(ok(reviews))
}

pub async fn create_review(
    State(state): State<AppState>,
    subject: Subject,
    Path(event_id): Path<Uuid>,
    JsonBody(payload): JsonBody<ReviewPayload>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    state
        .authorizer
        .authorize(&subject, Action::CreateReview(&event))
        .into_result()?;
    let actor = subject.require_user()?;

    let new = state.validator.review_create(actor, &event, payload).await?;
    let review = state.store.insert_review(new).await?;

    info!(event_id = %event.id, user_id = %actor, rating = review.rating, "Review created");
    Ok(created(review))
}

pub async fn update_review(
    State(state): State<AppState>,
    subject: Subject,
    Path((event_id, user_id)): Path<(Uuid, Uuid)>,
    JsonBody(payload): JsonBody<ReviewPayload>,
) -> Result<Response, AppError> {
    let event = state.load_event(event_id).await?;
    let review = state
        .store
        .find_review(event.id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Review"))?;
    state
        .authorizer
        .authorize(&subject, Action::UpdateReview { review: &review, event: &event })
        .into_result()?;
    let actor = subject.require_user()?;

    let changes = state.validator.review_update(actor, &review, &event, payload)?;
    let updated = state.store.update_review(review.id, changes).await?;

    info!(event_id = %event.id, user_id = %user_id, actor = %actor, "Review updated");
    Ok(ok(updated))
}
