use axum::response::Response;
use serde::Serialize;

use crate::utils::response::ok;

pub mod events;
pub mod reviews;
pub mod rsvps;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    ok(HealthPayload {
        status: "ok",
        service: "eventhub-api",
    })
}
