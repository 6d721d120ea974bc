use anyhow::{Context, Result};
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

use services::{cloudinary::CloudinaryStore, gallery_service::GalleryService};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting wedding-gallery with config: {:?}", cfg);

    // --- Initialize media store + gateway service ---
    let store = CloudinaryStore::new(cfg.cloudinary_credentials(), cfg.store_timeout)
        .context("building media store client")?;
    let gallery = GalleryService::new(Arc::new(store), cfg.gallery_options());

    if cfg.normalize_images {
        tracing::info!("Server-side image normalization enabled");
    }

    // --- Build router ---
    let cors = routes::routes::cors_layer(cfg.allowed_origin.as_deref())?;
    let app: Router = routes::routes::routes(gallery, cors);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
