//! Optional server-side image normalization.
//!
//! Decodes the upload, flattens any alpha channel onto white, bounds the
//! longest side to [`MAX_DIMENSION`] and re-encodes as JPEG. All functions
//! here are blocking; callers run them through `spawn_blocking`.

use image::{
    ImageError, Rgb, RgbImage,
    codecs::jpeg::JpegEncoder,
    imageops::{self, FilterType},
};
use thiserror::Error;

/// Longest side allowed after normalization, in pixels.
pub const MAX_DIMENSION: u32 = 1920;

/// JPEG quality used for re-encoding.
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("payload is not a decodable image: {0}")]
    Decode(#[source] ImageError),
    #[error("failed to encode normalized image: {0}")]
    Encode(#[source] ImageError),
}

/// Result of a successful normalization.
#[derive(Debug)]
pub struct NormalizedImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode, flatten, downscale and re-encode `data` as JPEG.
pub fn normalize_image(data: &[u8]) -> Result<NormalizedImage, NormalizeError> {
    let decoded = image::load_from_memory(data).map_err(NormalizeError::Decode)?;

    let flattened = if decoded.color().has_alpha() {
        flatten_on_white(&decoded.to_rgba8())
    } else {
        decoded.to_rgb8()
    };

    let (width, height) = bounded_dimensions(flattened.width(), flattened.height(), MAX_DIMENSION);
    let resized = if (width, height) == flattened.dimensions() {
        flattened
    } else {
        imageops::resize(&flattened, width, height, FilterType::Lanczos3)
    };

    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&resized)
        .map_err(NormalizeError::Encode)?;

    Ok(NormalizedImage {
        data: out,
        width,
        height,
    })
}

/// Composite an RGBA image over an opaque white background.
pub fn flatten_on_white(rgba: &image::RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = u16::from(a);
        let blend = |c: u8| -> u8 {
            let value = u16::from(c) * alpha + 255 * (255 - alpha);
            ((value + 127) / 255) as u8
        };
        out.put_pixel(x, y, Rgb([blend(r), blend(g), blend(b)]));
    }
    out
}

/// Scale `(width, height)` down so neither side exceeds `max`, keeping the
/// aspect ratio. Images already within bounds are left alone.
pub fn bounded_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let scale = f64::from(max) / f64::from(width.max(height));
    let scaled = |side: u32| -> u32 {
        ((f64::from(side) * scale).round() as u32).clamp(1, max)
    };
    (scaled(width), scaled(height))
}
