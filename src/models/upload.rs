//! Describes an image submitted by a client and where it will be stored.

use bytes::Bytes;
use std::fmt;

/// Root folder in the media store that holds every gallery upload.
pub const GALLERY_ROOT: &str = "wedding-gallery";

/// Tag used when a request carries no usable event label.
pub const DEFAULT_EVENT_TAG: &str = "other";

/// Extensions accepted when the allow-list check is enabled (lowercase).
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "heic"];

/// Sanitized event label that partitions uploads into sub-folders.
///
/// Only ASCII letters, digits and `-` survive sanitization, so the tag is
/// always a single safe path segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventTag(String);

impl EventTag {
    /// Build a tag from an untrusted label. Absent or fully stripped labels
    /// fall back to [`DEFAULT_EVENT_TAG`].
    pub fn sanitize(raw: Option<&str>) -> Self {
        let cleaned: String = raw
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
            .collect();

        if cleaned.is_empty() {
            Self(DEFAULT_EVENT_TAG.to_string())
        } else {
            Self(cleaned)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store folder for this tag: `wedding-gallery/<tag>`.
    pub fn folder(&self) -> String {
        format!("{}/{}", GALLERY_ROOT, self.0)
    }
}

impl fmt::Display for EventTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image as received from the multipart form, before validation.
#[derive(Clone, Debug)]
pub struct ImageUpload {
    /// Client-declared filename of the `image` part.
    pub filename: String,

    /// Declared MIME type, if the client sent one.
    pub content_type: Option<String>,

    /// Raw image bytes.
    pub data: Bytes,

    /// Free-text event label from the `event` field.
    pub event: Option<String>,
}

impl ImageUpload {
    /// Lowercased extension of the declared filename, if any.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.filename)
    }
}

/// Payload handed to the media store once validation (and optional
/// normalization) succeeded.
#[derive(Clone, Debug)]
pub struct StorePayload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Extract the lowercased extension of `filename`, ignoring any directory
/// components a client may have included.
pub fn file_extension(filename: &str) -> Option<String> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether `filename` carries one of the [`ALLOWED_EXTENSIONS`].
pub fn is_allowed_extension(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_everything_but_alphanumerics_and_hyphens() {
        let tag = EventTag::sanitize(Some("Haldi & Mehndi/../night-2"));
        assert_eq!(tag.as_str(), "HaldiMehndinight-2");
    }

    #[test]
    fn sanitize_defaults_to_other() {
        assert_eq!(EventTag::sanitize(None).as_str(), DEFAULT_EVENT_TAG);
        assert_eq!(EventTag::sanitize(Some("")).as_str(), DEFAULT_EVENT_TAG);
        assert_eq!(EventTag::sanitize(Some("  ./ ")).as_str(), DEFAULT_EVENT_TAG);
    }

    #[test]
    fn sanitize_drops_non_ascii_letters() {
        assert_eq!(EventTag::sanitize(Some("sangeet-ñ-日本")).as_str(), "sangeet--");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "haldi",
            "Reception 2024!",
            "../../etc/passwd",
            "",
            "---",
            "émoji 🎉 party",
        ];
        for input in inputs {
            let once = EventTag::sanitize(Some(input));
            let twice = EventTag::sanitize(Some(once.as_str()));
            assert_eq!(once, twice, "input {:?}", input);
            assert!(
                once.as_str()
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-')
            );
        }
    }

    #[test]
    fn folder_is_rooted_in_gallery() {
        assert_eq!(
            EventTag::sanitize(Some("haldi")).folder(),
            "wedding-gallery/haldi"
        );
        assert_eq!(EventTag::sanitize(None).folder(), "wedding-gallery/other");
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert!(is_allowed_extension("IMG_0001.JPG"));
        assert!(is_allowed_extension("photo.heic"));
        assert!(is_allowed_extension("dir/photo.webp"));
        assert!(!is_allowed_extension("animation.gif"));
        assert!(!is_allowed_extension("noextension"));
        assert!(!is_allowed_extension(".png"));
        assert!(!is_allowed_extension("trailing."));
    }
}
