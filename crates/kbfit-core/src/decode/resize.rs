//! Image resizing and dimension arithmetic.
//!
//! Provides resize operations using the `image` crate's algorithms, plus the
//! pure dimension calculations the target-size search relies on. All resize
//! functions return new `DecodedImage` instances without modifying the input.

use super::{DecodeError, DecodedImage, FilterType};

/// Resize an image to exact dimensions.
///
/// # Arguments
///
/// * `image` - The source image to resize
/// * `width` - Target width in pixels
/// * `height` - Target height in pixels
/// * `filter` - Interpolation filter to use
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for zero target dimensions and
/// `DecodeError::CorruptedFile` if the source buffer does not match its
/// dimensions.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidFormat);
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgb_image = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Dimensions after capping the width at `max_width`, preserving aspect ratio.
///
/// Both sides are scaled by `max_width / width` and rounded to the nearest
/// integer (never below 1). Images at or under the cap keep their size.
pub fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }

    let ratio = max_width as f64 / width as f64;
    let new_width = (width as f64 * ratio).round() as u32;
    let new_height = (height as f64 * ratio).round() as u32;
    (new_width.max(1), new_height.max(1))
}

/// Scale both dimensions by `factor`, rounding each to the nearest integer.
///
/// Used for the progressive shrink of the dimension fallback. Results never
/// drop below 1x1.
pub fn scale_dimensions(width: u32, height: u32, factor: f64) -> (u32, u32) {
    let new_width = (width as f64 * factor).round() as u32;
    let new_height = (height as f64 * factor).round() as u32;
    (new_width.max(1), new_height.max(1))
}

/// Suggest a max-width setting for a freshly selected image.
///
/// Large photos get a web-friendly cap; anything up to 1000px is left at
/// its own width.
pub fn suggest_max_width(width: u32) -> u32 {
    if width > 3000 {
        1280
    } else if width > 2000 {
        1080
    } else if width > 1000 {
        720
    } else {
        width
    }
}
