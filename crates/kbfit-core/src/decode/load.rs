//! Decoding of uploaded image bytes.

use std::io::Cursor;

use image::ImageReader;

use super::{DecodeError, DecodedImage};

/// Largest upload accepted for decoding (20 MB).
pub const MAX_INPUT_BYTES: usize = 20 * 1024 * 1024;

/// Decode JPEG, PNG or WebP bytes into an RGB image.
///
/// The format is sniffed from the content, not from a file name. Inputs
/// over [`MAX_INPUT_BYTES`] are rejected before any decoding work.
///
/// # Errors
///
/// * `DecodeError::EmptyInput` for a zero-length buffer
/// * `DecodeError::FileTooLarge` above the size limit
/// * `DecodeError::InvalidFormat` if the format cannot be recognized
/// * `DecodeError::CorruptedFile` if decoding fails
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    decode_image_with_limit(bytes, MAX_INPUT_BYTES)
}

/// Same as [`decode_image`] with a caller-chosen size limit.
pub fn decode_image_with_limit(bytes: &[u8], limit: usize) -> Result<DecodedImage, DecodeError> {
    check_input_size(bytes.len(), limit)?;

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let decoded = DecodedImage::from_rgb_image(img.into_rgb8());
    log::debug!(
        "Decoded {} input bytes into {}x{} image",
        bytes.len(),
        decoded.width,
        decoded.height
    );
    Ok(decoded)
}

/// Validate an input length against the upload limit.
pub fn check_input_size(size: usize, limit: usize) -> Result<(), DecodeError> {
    if size == 0 {
        return Err(DecodeError::EmptyInput);
    }
    if size > limit {
        return Err(DecodeError::FileTooLarge { size, limit });
    }
    Ok(())
}
