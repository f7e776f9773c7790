//! Lossy WebP encoding through libwebp.
//!
//! Only built for native targets. In the browser the canvas encoder handles
//! lossy WebP instead.

use super::error::validate_rgb;
use super::EncodeError;

/// Whether this build can encode lossy WebP.
pub const LOSSY_WEBP_AVAILABLE: bool = cfg!(not(target_arch = "wasm32"));

/// Encode RGB pixel data to lossy WebP bytes.
///
/// `quality` uses the same 1-100 scale as [`super::encode_jpeg`].
#[cfg(not(target_arch = "wasm32"))]
pub fn encode_webp(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_rgb(pixels, width, height)?;

    let quality = f32::from(quality.clamp(1, 100));
    let encoded = ::webp::Encoder::from_rgb(pixels, width, height).encode(quality);
    if encoded.is_empty() {
        return Err(EncodeError::EncodingFailed(
            "libwebp returned no data".to_string(),
        ));
    }
    Ok(encoded.to_vec())
}

#[cfg(target_arch = "wasm32")]
pub fn encode_webp(
    pixels: &[u8],
    width: u32,
    height: u32,
    _quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_rgb(pixels, width, height)?;
    Err(EncodeError::EncodingFailed(
        "lossy WebP is not available in this build".to_string(),
    ))
}
