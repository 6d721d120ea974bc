//! Boundary to the external media host.
//!
//! The gateway only needs two operations from the host: push one image into a
//! folder and page through everything under a prefix. Keeping them behind a
//! trait lets the HTTP layer be exercised against an in-memory store.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    photo::{ListQuery, ListingPage, StoredImage},
    upload::StorePayload,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("media store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("media store response could not be decoded: {0}")]
    Decode(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Upload `payload` into `folder` and return the hosted image.
    async fn upload(&self, payload: StorePayload, folder: &str) -> StoreResult<StoredImage>;

    /// Fetch one page of images matching `query`.
    async fn list(&self, query: ListQuery) -> StoreResult<ListingPage>;
}
