//! GalleryService: validates submitted images, optionally normalizes them,
//! and delegates storage and listing to a [`MediaStore`].
//!
//! The service is stateless apart from its immutable options and the store
//! handle, so it is cheap to clone into every request.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    models::{
        photo::{ListQuery, ListingPage, StoredImage},
        upload::{EventTag, GALLERY_ROOT, ImageUpload, StorePayload, is_allowed_extension},
    },
    services::{
        media_store::{MediaStore, StoreError, StoreResult},
        normalize::{NormalizeError, normalize_image},
    },
};

/// Behaviour switches for the gateway, fixed at startup.
#[derive(Clone, Debug)]
pub struct GalleryOptions {
    /// Largest accepted image payload in bytes.
    pub max_upload_bytes: usize,
    /// Images returned per listing page.
    pub page_size: usize,
    /// Flatten/downscale/re-encode uploads before forwarding them.
    pub normalize_images: bool,
    /// Enforce the filename extension allow-list.
    pub enforce_extensions: bool,
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            page_size: 30,
            normalize_images: false,
            enforce_extensions: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No image part")]
    MissingImage,
    #[error("No file selected")]
    EmptyFilename,
    #[error("File type not allowed")]
    DisallowedExtension(String),
    #[error("Uploaded file is empty")]
    EmptyPayload,
    #[error("Image of {size} bytes exceeds the maximum upload size of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("Uploaded file is not a valid image")]
    InvalidImage(#[source] NormalizeError),
    #[error(transparent)]
    Normalize(NormalizeError),
    #[error("image worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct GalleryService {
    store: Arc<dyn MediaStore>,
    options: Arc<GalleryOptions>,
}

impl GalleryService {
    pub fn new(store: Arc<dyn MediaStore>, options: GalleryOptions) -> Self {
        Self {
            store,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &GalleryOptions {
        &self.options
    }

    /// Check an upload against the request rules without touching the store.
    ///
    /// Order matters: the first failing rule decides the client message.
    pub fn validate(&self, upload: &ImageUpload) -> Result<(), UploadError> {
        if upload.filename.trim().is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        if self.options.enforce_extensions && !is_allowed_extension(&upload.filename) {
            return Err(UploadError::DisallowedExtension(
                upload.extension().unwrap_or_default(),
            ));
        }
        if upload.data.len() > self.options.max_upload_bytes {
            return Err(UploadError::TooLarge {
                size: upload.data.len(),
                limit: self.options.max_upload_bytes,
            });
        }
        if upload.data.is_empty() {
            return Err(UploadError::EmptyPayload);
        }
        Ok(())
    }

    /// Validate, optionally normalize, and push an image into its event folder.
    pub async fn submit(&self, upload: ImageUpload) -> Result<StoredImage, UploadError> {
        self.validate(&upload)?;

        let tag = EventTag::sanitize(upload.event.as_deref());
        let folder = tag.folder();
        let payload = if self.options.normalize_images {
            self.normalize(upload).await?
        } else {
            StorePayload {
                filename: upload.filename,
                content_type: upload.content_type,
                data: upload.data,
            }
        };

        let size = payload.data.len();
        let stored = self.store.upload(payload, &folder).await?;
        info!(
            event = tag.as_str(),
            folder = %folder,
            size,
            url = %stored.secure_url,
            "image uploaded"
        );

        Ok(stored)
    }

    /// Fetch one page of the gallery, newest first. Empty cursors are
    /// treated as a request for the first page.
    pub async fn list(&self, next_cursor: Option<String>) -> StoreResult<ListingPage> {
        let query = ListQuery {
            prefix: GALLERY_ROOT.to_string(),
            max_results: self.options.page_size,
            next_cursor: next_cursor.filter(|cursor| !cursor.is_empty()),
            newest_first: true,
        };
        debug!(?query, "listing gallery page");
        self.store.list(query).await
    }

    async fn normalize(&self, upload: ImageUpload) -> Result<StorePayload, UploadError> {
        let original_size = upload.data.len();
        let data = upload.data;
        let normalized = tokio::task::spawn_blocking(move || normalize_image(&data))
            .await?
            .map_err(|err| match err {
                NormalizeError::Decode(_) => UploadError::InvalidImage(err),
                NormalizeError::Encode(_) => UploadError::Normalize(err),
            })?;

        debug!(
            original_size,
            normalized_size = normalized.data.len(),
            width = normalized.width,
            height = normalized.height,
            "image normalized"
        );

        Ok(StorePayload {
            filename: jpeg_filename(&upload.filename),
            content_type: Some("image/jpeg".into()),
            data: normalized.data.into(),
        })
    }
}

/// Swap the extension of `filename` for `.jpg`.
fn jpeg_filename(filename: &str) -> String {
    let stem = match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    };
    format!("{}.jpg", stem)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::{io::Cursor, sync::Mutex};

    /// In-memory store that records uploads and serves them back newest
    /// first, using the position in that order as its cursor.
    #[derive(Default)]
    pub(crate) struct RecordingStore {
        pub uploads: Mutex<Vec<(StorePayload, String)>>,
        pub queries: Mutex<Vec<ListQuery>>,
        pub fail: bool,
    }

    impl RecordingStore {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn upload_count(&self) -> usize {
            self.uploads.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl MediaStore for RecordingStore {
        async fn upload(&self, payload: StorePayload, folder: &str) -> StoreResult<StoredImage> {
            if self.fail {
                return Err(StoreError::Rejected {
                    status: 401,
                    message: "Invalid api_key secret-value".into(),
                });
            }
            let mut uploads = self.uploads.lock().unwrap();
            let url = format!("https://res.example.com/{}/{}", folder, uploads.len());
            uploads.push((payload, folder.to_string()));
            Ok(StoredImage {
                secure_url: url,
                public_id: None,
                created_at: None,
            })
        }

        async fn list(&self, query: ListQuery) -> StoreResult<ListingPage> {
            if self.fail {
                return Err(StoreError::Decode("boom".into()));
            }
            self.queries.lock().unwrap().push(query.clone());

            let uploads = self.uploads.lock().unwrap();
            let newest_first: Vec<String> = uploads
                .iter()
                .enumerate()
                .rev()
                .filter(|(_, (_, folder))| folder.starts_with(&query.prefix))
                .map(|(i, (_, folder))| format!("https://res.example.com/{}/{}", folder, i))
                .collect();

            let start = match query.next_cursor.as_deref() {
                Some(cursor) => cursor
                    .parse::<usize>()
                    .map_err(|err| StoreError::Decode(err.to_string()))?,
                None => 0,
            };
            let end = (start + query.max_results).min(newest_first.len());
            let images = newest_first[start.min(end)..end]
                .iter()
                .map(|url| StoredImage {
                    secure_url: url.clone(),
                    public_id: None,
                    created_at: None,
                })
                .collect();
            let next_cursor = (end < newest_first.len()).then(|| end.to_string());

            Ok(ListingPage {
                images,
                next_cursor,
            })
        }
    }

    pub(crate) fn transparent_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 0, 0]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn upload(filename: &str, data: &[u8], event: Option<&str>) -> ImageUpload {
        ImageUpload {
            filename: filename.into(),
            content_type: Some("image/png".into()),
            data: Bytes::copy_from_slice(data),
            event: event.map(Into::into),
        }
    }

    fn service(store: Arc<RecordingStore>, options: GalleryOptions) -> GalleryService {
        GalleryService::new(store, options)
    }

    #[tokio::test]
    async fn submit_uses_sanitized_event_folder() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(store.clone(), GalleryOptions::default());

        let stored = svc
            .submit(upload("a.png", b"bytes", Some("haldi!!")))
            .await
            .unwrap();

        assert!(stored.secure_url.starts_with("https://"));
        let uploads = store.uploads.lock().unwrap();
        assert_eq!(uploads[0].1, "wedding-gallery/haldi");
        assert_eq!(uploads[0].0.data.as_ref(), b"bytes");
    }

    #[tokio::test]
    async fn rejected_uploads_never_reach_the_store() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store.clone(),
            GalleryOptions {
                max_upload_bytes: 4,
                ..GalleryOptions::default()
            },
        );

        assert!(matches!(
            svc.submit(upload("", b"abc", None)).await,
            Err(UploadError::EmptyFilename)
        ));
        assert!(matches!(
            svc.submit(upload("a.gif", b"abc", None)).await,
            Err(UploadError::DisallowedExtension(ext)) if ext == "gif"
        ));
        assert!(matches!(
            svc.submit(upload("a.png", b"", None)).await,
            Err(UploadError::EmptyPayload)
        ));
        assert!(matches!(
            svc.submit(upload("a.png", b"too large", None)).await,
            Err(UploadError::TooLarge { size: 9, limit: 4 })
        ));
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn extension_check_can_be_disabled() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store.clone(),
            GalleryOptions {
                enforce_extensions: false,
                ..GalleryOptions::default()
            },
        );

        svc.submit(upload("clip.gif", b"GIF89a", None)).await.unwrap();
        assert_eq!(store.upload_count(), 1);
    }

    #[tokio::test]
    async fn normalization_rewrites_payload_as_jpeg() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store.clone(),
            GalleryOptions {
                normalize_images: true,
                ..GalleryOptions::default()
            },
        );

        svc.submit(upload("party.png", &transparent_png(500, 500), Some("haldi")))
            .await
            .unwrap();

        let uploads = store.uploads.lock().unwrap();
        let (payload, folder) = &uploads[0];
        assert_eq!(folder, "wedding-gallery/haldi");
        assert_eq!(payload.filename, "party.jpg");
        assert_eq!(payload.content_type.as_deref(), Some("image/jpeg"));
        assert_eq!(
            image::guess_format(&payload.data).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[tokio::test]
    async fn normalization_rejects_undecodable_payloads() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store.clone(),
            GalleryOptions {
                normalize_images: true,
                ..GalleryOptions::default()
            },
        );

        let result = svc.submit(upload("fake.png", b"not an image", None)).await;
        assert!(matches!(result, Err(UploadError::InvalidImage(_))));
        assert_eq!(store.upload_count(), 0);
    }

    #[tokio::test]
    async fn list_requests_newest_first_page_under_gallery_root() {
        let store = Arc::new(RecordingStore::default());
        let svc = service(
            store.clone(),
            GalleryOptions {
                page_size: 10,
                ..GalleryOptions::default()
            },
        );

        svc.list(Some(String::new())).await.unwrap();

        let queries = store.queries.lock().unwrap();
        assert_eq!(
            queries[0],
            ListQuery {
                prefix: "wedding-gallery".into(),
                max_results: 10,
                next_cursor: None,
                newest_first: true,
            }
        );
    }

    #[test]
    fn jpeg_filename_replaces_extension() {
        assert_eq!(jpeg_filename("IMG_1.HEIC"), "IMG_1.jpg");
        assert_eq!(jpeg_filename("archive.tar.png"), "archive.tar.jpg");
        assert_eq!(jpeg_filename("noext"), "noext.jpg");
    }
}
