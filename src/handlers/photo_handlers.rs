//! HTTP handlers for submitting and listing gallery photos.
//! Validation and storage live in `GalleryService`; these handlers only
//! translate between multipart/query input and the JSON contract.

use crate::{
    errors::AppError,
    models::{
        photo::{PhotosResponse, UploadResponse},
        upload::ImageUpload,
    },
    services::gallery_service::{GalleryService, UploadError},
};
use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::debug;

/// Query params accepted by `GET /photos`.
#[derive(Debug, Deserialize)]
pub struct PhotosQuery {
    pub next_cursor: Option<String>,
}

/// POST `/upload`: multipart form with an `image` file and optional `event`.
pub async fn upload_photo(
    State(service): State<GalleryService>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    // Bodies that are not multipart at all carry no image part either.
    let multipart = multipart.map_err(|rejection| {
        debug!("rejecting non-multipart upload: {}", rejection.body_text());
        UploadError::MissingImage
    })?;
    let upload = read_upload_form(multipart).await?;
    let stored = service.submit(upload).await?;

    Ok(Json(UploadResponse {
        message: "Upload successful".into(),
        url: stored.secure_url,
    }))
}

/// GET `/photos`: one page of gallery URLs, newest first.
pub async fn list_photos(
    State(service): State<GalleryService>,
    Query(q): Query<PhotosQuery>,
) -> Result<Json<PhotosResponse>, AppError> {
    let page = service.list(q.next_cursor).await?;
    Ok(Json(page.into()))
}

/// Collect the `image` and `event` fields. Unknown fields are skipped and
/// only the first `image` part is kept.
async fn read_upload_form(mut multipart: Multipart) -> Result<ImageUpload, AppError> {
    let mut image = None;
    let mut event = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") if image.is_none() => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                image = Some((filename, content_type, data));
            }
            Some("event") if event.is_none() => {
                event = Some(field.text().await.map_err(multipart_error)?);
            }
            other => debug!("skipping multipart field {:?}", other),
        }
    }

    let (filename, content_type, data) = image.ok_or(UploadError::MissingImage)?;
    Ok(ImageUpload {
        filename,
        content_type,
        data,
        event,
    })
}

fn multipart_error(err: MultipartError) -> AppError {
    let status = err.status();
    debug!("rejecting multipart body ({}): {}", status, err.body_text());
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large("Image exceeds the maximum upload size")
    } else {
        AppError::bad_request("Malformed multipart form")
    }
}
