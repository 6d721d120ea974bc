//! Cloudinary-backed [`MediaStore`].
//!
//! Uploads go through the signed Upload API; listings use the Admin API
//! (`resources/image/upload`) with HTTP basic auth. Both calls share one
//! `reqwest::Client` configured with the store timeout.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha1::{Digest, Sha1};
use std::{fmt, time::Duration};
use tracing::debug;

use crate::{
    models::{
        photo::{ListQuery, ListingPage, StoredImage},
        upload::StorePayload,
    },
    services::media_store::{MediaStore, StoreError, StoreResult},
};

/// Account credentials for the Cloudinary API.
#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Scheme and host of the API, e.g. `https://api.cloudinary.com`.
    pub api_base: String,
}

impl fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct CloudinaryStore {
    client: Client,
    credentials: CloudinaryCredentials,
}

#[derive(Debug, Deserialize)]
struct ResourcesResponse {
    #[serde(default)]
    resources: Vec<StoredImage>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryStore {
    pub fn new(credentials: CloudinaryCredentials, timeout: Duration) -> StoreResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            credentials,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.credentials.api_base.trim_end_matches('/'),
            self.credentials.cloud_name,
            path
        )
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> StoreResult<T> {
        let status = response.status();
        let body = response.text().await?;
        decode_body(status, &body)
    }
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, payload: StorePayload, folder: &str) -> StoreResult<StoredImage> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("folder", folder), ("timestamp", &timestamp)],
            &self.credentials.api_secret,
        );

        let len = payload.data.len() as u64;
        let mut file = Part::stream_with_length(payload.data, len).file_name(payload.filename);
        if let Some(content_type) = payload.content_type.as_deref() {
            file = file.mime_str(content_type)?;
        }

        let form = Form::new()
            .part("file", file)
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature);

        let url = self.endpoint("image/upload");
        debug!("uploading image to {} (folder {})", url, folder);

        let response = self.client.post(&url).multipart(form).send().await?;
        Self::decode(response).await
    }

    async fn list(&self, query: ListQuery) -> StoreResult<ListingPage> {
        let mut params: Vec<(&str, String)> = vec![
            ("prefix", query.prefix.clone()),
            ("max_results", query.max_results.to_string()),
        ];
        if query.newest_first {
            params.push(("direction", "desc".into()));
        }
        if let Some(cursor) = query.next_cursor.clone() {
            params.push(("next_cursor", cursor));
        }

        let url = self.endpoint("resources/image/upload");
        debug!("listing images from {} (prefix {})", url, query.prefix);

        let response = self
            .client
            .get(&url)
            .basic_auth(
                &self.credentials.api_key,
                Some(&self.credentials.api_secret),
            )
            .query(&params)
            .send()
            .await?;

        let body: ResourcesResponse = Self::decode(response).await?;
        Ok(ListingPage {
            images: body.resources,
            next_cursor: body.next_cursor.filter(|cursor| !cursor.is_empty()),
        })
    }
}

/// Compute a Cloudinary request signature: parameters sorted by name, joined
/// as `k=v` pairs with `&`, the API secret appended, SHA-1 hex encoded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha1::digest(format!("{}{}", joined, api_secret).as_bytes()))
}

/// Turn a raw API response into `T`, or into a [`StoreError`] carrying the
/// API's own error message for non-success statuses.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &str) -> StoreResult<T> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|env| env.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(body).map_err(|err| StoreError::Decode(err.to_string()))
}
