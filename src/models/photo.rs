//! Stored images and listing pages as reported by the media store, plus the
//! JSON bodies the gateway sends back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An image hosted by the media store. The gateway never keeps a copy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct StoredImage {
    /// HTTPS URL assigned by the store.
    pub secure_url: String,

    /// Store identifier, when reported.
    #[serde(default)]
    pub public_id: Option<String>,

    /// Creation time, when reported.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Parameters for one page of the gallery listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    /// Only resources whose public id starts with this prefix.
    pub prefix: String,
    pub max_results: usize,
    /// Opaque cursor from a previous page.
    pub next_cursor: Option<String>,
    /// Sort by creation time, newest first.
    pub newest_first: bool,
}

/// A batch of stored images and the store's continuation cursor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListingPage {
    pub images: Vec<StoredImage>,
    pub next_cursor: Option<String>,
}

/// `{"message": ...}`
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

/// Body returned by `POST /upload` on success.
#[derive(Serialize, Deserialize, Debug)]
pub struct UploadResponse {
    pub message: String,
    pub url: String,
}

/// Body returned by `GET /photos`. `next_cursor` serializes as `null` once
/// the listing is exhausted.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PhotosResponse {
    pub photos: Vec<String>,
    pub next_cursor: Option<String>,
}

impl From<ListingPage> for PhotosResponse {
    fn from(page: ListingPage) -> Self {
        Self {
            photos: page.images.into_iter().map(|img| img.secure_url).collect(),
            next_cursor: page.next_cursor,
        }
    }
}
