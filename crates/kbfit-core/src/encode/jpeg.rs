//! JPEG encoding.
//!
//! JPEG is the workhorse of the target-size search: its output size is
//! monotonic in the quality setting for a fixed canvas, which is what makes
//! bisection over quality sound.

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use std::io::Cursor;

use super::error::validate_rgb;
use super::EncodeError;

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100, where 100 is highest quality)
///
/// # Quality Guidelines
///
/// * 90-100: High quality, suitable for archival or further editing
/// * 80-90: Good quality, recommended for most uses
/// * 60-80: Medium quality, acceptable for web/social media
/// * Below 60: Low quality, visible artifacts
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_rgb(pixels, width, height)?;

    let quality = quality.clamp(1, 100);
    let mut buffer = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);

    encoder
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    Ok(buffer.into_inner())
}

/// Map a quality factor in `[0, 1]` onto the 1-100 JPEG scale.
///
/// Out-of-range and NaN factors are clamped; NaN maps to the lowest quality.
pub fn quality_to_percent(quality: f32) -> u8 {
    if quality.is_nan() {
        return 1;
    }
    (quality.clamp(0.0, 1.0) * 100.0).round().clamp(1.0, 100.0) as u8
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Same input always produces same output.
        #[test]
        fn prop_deterministic_output(
            (width, height) in (1u32..=20, 1u32..=20),
            quality in 1u8..=100,
        ) {
            let pixels = vec![100u8; (width * height * 3) as usize];

            let first = encode_jpeg(&pixels, width, height, quality);
            let second = encode_jpeg(&pixels, width, height, quality);

            prop_assert!(first.is_ok() && second.is_ok());
            prop_assert_eq!(first.unwrap(), second.unwrap());
        }

        /// Mismatched buffers are rejected before encoding.
        #[test]
        fn prop_invalid_pixel_length_returns_error(
            (width, height) in (1u32..=30, 1u32..=30),
            delta in 1usize..=10,
            shorter in any::<bool>(),
        ) {
            let expected = (width * height * 3) as usize;
            let actual = if shorter { expected.saturating_sub(delta) } else { expected + delta };
            prop_assume!(actual != expected);

            let result = encode_jpeg(&vec![128u8; actual], width, height, 80);
            prop_assert!(matches!(result, Err(EncodeError::InvalidPixelData { .. })), "mismatched buffer should be rejected");
        }

        /// Every factor maps into the valid JPEG range.
        #[test]
        fn prop_quality_percent_in_range(q in -10.0f32..10.0) {
            let percent = quality_to_percent(q);
            prop_assert!((1..=100).contains(&percent));
        }
    }
}
