//! Defines the gateway's HTTP surface.
//!
//! ## Structure
//! - `GET  /`: service banner
//! - `GET  /healthz`: liveness
//! - `POST /upload`: submit an image (multipart `image`, optional `event`)
//! - `GET  /photos`: one page of hosted image URLs (`?next_cursor=`)
//!
//! Request bodies are capped by `RequestBodyLimitLayer` before any handler
//! runs; CORS is limited to a single client origin when one is configured.

use crate::{
    handlers::{
        health_handlers::{healthz, home},
        photo_handlers::{list_photos, upload_photo},
    },
    services::gallery_service::GalleryService,
};
use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Room left for multipart boundaries, headers and the `event` field on top
/// of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router with its layers and shared `GalleryService` state.
pub fn routes(service: GalleryService, cors: CorsLayer) -> Router {
    let body_limit = service
        .options()
        .max_upload_bytes
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/upload", post(upload_photo))
        .route("/photos", get(list_photos))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// CORS for the gallery frontend: one origin when configured, any otherwise.
pub fn cors_layer(allowed_origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match allowed_origin {
        Some(origin) => {
            let value = HeaderValue::from_str(origin.trim_end_matches('/'))
                .with_context(|| format!("invalid allowed origin `{}`", origin))?;
            Ok(cors.allow_origin(value))
        }
        None => {
            tracing::warn!("CORS configured to allow all origins");
            Ok(cors.allow_origin(Any))
        }
    }
}
