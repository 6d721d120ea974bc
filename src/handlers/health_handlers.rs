//! Banner & liveness handlers.
//!
//! - GET /         -> service banner
//! - GET /healthz  -> simple liveness ("ok")

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::models::photo::MessageResponse;

pub const BANNER: &str = "Photo upload API running!";

/// `GET /`
pub async fn home() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: BANNER.into(),
    })
}

/// `GET /healthz`
///
/// Liveness probe. Always returns 200 OK and never calls the media store.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}
