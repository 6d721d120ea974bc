use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};

use crate::services::{cloudinary::CloudinaryCredentials, gallery_service::GalleryOptions};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_PAGE_SIZE: usize = 30;
const MAX_PAGE_SIZE: usize = 100;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub api_base: String,
    pub allowed_origin: Option<String>,
    pub max_upload_bytes: usize,
    pub page_size: usize,
    pub normalize_images: bool,
    pub enforce_extensions: bool,
    pub store_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Wedding gallery upload gateway")]
pub struct Args {
    /// Host to bind to (overrides GALLERY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Cloudinary cloud name (overrides CLOUDINARY_CLOUD_NAME)
    #[arg(long)]
    pub cloud_name: Option<String>,

    /// Cloudinary API key (overrides CLOUDINARY_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Cloudinary API secret (overrides CLOUDINARY_API_SECRET)
    #[arg(long)]
    pub api_secret: Option<String>,

    /// Cloudinary API base URL (overrides CLOUDINARY_API_BASE)
    #[arg(long)]
    pub api_base: Option<String>,

    /// Single origin allowed by CORS (overrides GALLERY_ALLOWED_ORIGIN)
    #[arg(long)]
    pub allowed_origin: Option<String>,

    /// Maximum accepted image size in bytes (overrides GALLERY_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Photos returned per listing page (overrides GALLERY_PAGE_SIZE)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Flatten, downscale and re-encode uploads before forwarding them
    #[arg(long)]
    pub normalize_images: Option<bool>,

    /// Reject filenames outside the image extension allow-list
    #[arg(long)]
    pub enforce_extensions: Option<bool>,

    /// Timeout in seconds for calls to the media store
    #[arg(long)]
    pub store_timeout_secs: Option<u64>,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // `.env` is optional; a missing file is not an error.
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                return Err(err).context("loading .env file");
            }
        }

        Self::from_args(Args::parse())
    }

    /// Merge parsed CLI args with environment fallbacks and defaults.
    pub fn from_args(args: Args) -> Result<Self> {
        // --- Environment fallback ---
        let env_host = env::var("GALLERY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = env_parse::<u16>("PORT")?.unwrap_or(5000);
        let env_api_base = env::var("CLOUDINARY_API_BASE")
            .unwrap_or_else(|_| "https://api.cloudinary.com".into());
        let env_origin = env::var("GALLERY_ALLOWED_ORIGIN").ok();
        let env_max_upload =
            env_parse::<usize>("GALLERY_MAX_UPLOAD_BYTES")?.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        let env_page_size = env_parse::<usize>("GALLERY_PAGE_SIZE")?.unwrap_or(DEFAULT_PAGE_SIZE);
        let env_normalize = env_parse::<bool>("GALLERY_NORMALIZE_IMAGES")?.unwrap_or(false);
        let env_enforce = env_parse::<bool>("GALLERY_ENFORCE_EXTENSIONS")?.unwrap_or(true);
        let env_timeout = env_parse::<u64>("GALLERY_STORE_TIMEOUT_SECS")?.unwrap_or(30);

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            cloud_name: required(args.cloud_name, "CLOUDINARY_CLOUD_NAME")?,
            api_key: required(args.api_key, "CLOUDINARY_API_KEY")?,
            api_secret: required(args.api_secret, "CLOUDINARY_API_SECRET")?,
            api_base: args.api_base.unwrap_or(env_api_base),
            allowed_origin: args
                .allowed_origin
                .or(env_origin)
                .filter(|origin| !origin.trim().is_empty()),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            page_size: args
                .page_size
                .unwrap_or(env_page_size)
                .clamp(1, MAX_PAGE_SIZE),
            normalize_images: args.normalize_images.unwrap_or(env_normalize),
            enforce_extensions: args.enforce_extensions.unwrap_or(env_enforce),
            store_timeout: Duration::from_secs(
                args.store_timeout_secs.unwrap_or(env_timeout).max(1),
            ),
        };

        if cfg.max_upload_bytes == 0 {
            bail!("max upload size must be greater than zero");
        }

        Ok(cfg)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gallery_options(&self) -> GalleryOptions {
        GalleryOptions {
            max_upload_bytes: self.max_upload_bytes,
            page_size: self.page_size,
            normalize_images: self.normalize_images,
            enforce_extensions: self.enforce_extensions,
        }
    }

    pub fn cloudinary_credentials(&self) -> CloudinaryCredentials {
        CloudinaryCredentials {
            cloud_name: self.cloud_name.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("allowed_origin", &self.allowed_origin)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("page_size", &self.page_size)
            .field("normalize_images", &self.normalize_images)
            .field("enforce_extensions", &self.enforce_extensions)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

fn required(arg: Option<String>, var: &str) -> Result<String> {
    match arg {
        Some(value) => Ok(value),
        None => env::var(var).with_context(|| format!("{} must be set", var)),
    }
}

fn env_parse<T>(var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("parsing {} value `{}`", var, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", var)),
    }
}
