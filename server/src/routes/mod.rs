use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{events, health_check, reviews, rsvps};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/events/", get(events::list_events).post(events::create_event))
        .route(
            "/events/:event_id/",
            get(events::get_event)
                .put(events::replace_event)
                .patch(events::patch_event)
                .delete(events::delete_event),
        )
        .route("/events/:event_id/rsvp/", post(rsvps::create_rsvp))
        .route("/events/:event_id/rsvp/:user_id/", patch(rsvps::update_rsvp))
        .route(
            "/events/:event_id/reviews/",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/events/:event_id/reviews/:user_id/", patch(reviews::update_review))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(config.allowed_origins.as_deref()))
}
