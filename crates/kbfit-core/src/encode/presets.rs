//! One-shot re-encodes: fixed quality, format conversion, exact resize.
//!
//! These are the simple tools next to the target-size search. Each makes a
//! single render and a single compress call.

use super::{Codec, EncodeError, OutputFormat};
use crate::decode::DecodedImage;

/// Quality used by conversion and resize when the format honours it.
pub const CONVERT_QUALITY: f32 = 0.92;

/// Quality used when the requested compression level is unusable.
pub const DEFAULT_COMPRESS_QUALITY: f32 = 0.75;

/// Bounds applied to a user-supplied compression level.
pub const COMPRESS_QUALITY_RANGE: (f32, f32) = (0.01, 0.95);

/// Bytes produced by a single re-encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
}

impl EncodedImage {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Turn a 0-100 slider value into a quality factor.
///
/// Zero or NaN input falls back to [`DEFAULT_COMPRESS_QUALITY`];
/// everything else, negatives included, is clamped into
/// [`COMPRESS_QUALITY_RANGE`].
pub fn quality_from_percent(percent: f32) -> f32 {
    let factor = percent / 100.0;
    if factor.is_nan() || factor == 0.0 {
        return DEFAULT_COMPRESS_QUALITY;
    }
    factor.clamp(COMPRESS_QUALITY_RANGE.0, COMPRESS_QUALITY_RANGE.1)
}

/// Re-encode at the source dimensions with a user-chosen quality.
pub fn compress_with_quality<C: Codec>(
    codec: &C,
    image: &DecodedImage,
    format: OutputFormat,
    quality_percent: f32,
) -> Result<EncodedImage, EncodeError> {
    let quality = quality_from_percent(quality_percent);
    encode_at(codec, image, image.width, image.height, format, quality)
}

/// Re-encode at the source dimensions into another format.
pub fn convert_format<C: Codec>(
    codec: &C,
    image: &DecodedImage,
    format: OutputFormat,
) -> Result<EncodedImage, EncodeError> {
    encode_at(codec, image, image.width, image.height, format, CONVERT_QUALITY)
}

/// Render at exactly `width` x `height` (aspect ratio not preserved) and encode.
pub fn resize_exact<C: Codec>(
    codec: &C,
    image: &DecodedImage,
    width: u32,
    height: u32,
    format: OutputFormat,
) -> Result<EncodedImage, EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }
    encode_at(codec, image, width, height, format, CONVERT_QUALITY)
}

fn encode_at<C: Codec>(
    codec: &C,
    image: &DecodedImage,
    width: u32,
    height: u32,
    format: OutputFormat,
    quality: f32,
) -> Result<EncodedImage, EncodeError> {
    let canvas = codec.render(image, width, height)?;
    let bytes = codec.compress(&canvas, format, quality)?;
    log::info!(
        "Encoded {}x{} {} at quality {:.2}: {} bytes",
        width,
        height,
        format,
        quality,
        bytes.len()
    );
    Ok(EncodedImage {
        bytes,
        width,
        height,
        format,
    })
}
