//! Core data models for the gallery gateway.
//!
//! Nothing here is persisted locally: uploads are described on their way to
//! the media store and listings are mapped straight from its responses.

pub mod photo;
pub mod upload;
