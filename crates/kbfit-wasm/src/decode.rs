//! Image decoding WASM bindings.
//!
//! This module exposes the kbfit-core decoding and resizing functions to JavaScript.
//!
//! # Functions
//!
//! - [`decode_image`] - Decode JPEG, PNG or WebP bytes (20 MB limit)
//! - [`suggest_max_width`] - Default max-width setting for a freshly selected image
//! - [`file_info`] - Name and size label for a selected file
//! - [`resize`] - Resize an image to exact dimensions
//!
//! # Example
//!
//! ```typescript
//! import { decode_image, suggest_max_width } from '@kbfit/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const image = decode_image(bytes);
//! maxWidthInput.value = suggest_max_width(image.width);
//! ```

use crate::types::{filter_from_u8, JsDecodedImage};
use kbfit_core::{decode, naming};
use wasm_bindgen::prelude::*;

/// Decode an uploaded image.
///
/// The format is detected from the bytes. Inputs above 20 MB are rejected
/// before decoding.
///
/// # Errors
///
/// Returns an error if:
/// - The buffer is empty or larger than 20 MB
/// - The bytes are not JPEG, PNG or WebP
/// - The file is corrupted or truncated
#[wasm_bindgen]
pub fn decode_image(bytes: &[u8]) -> Result<JsDecodedImage, JsValue> {
    decode::decode_image(bytes)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Maximum accepted upload size in bytes.
#[wasm_bindgen]
pub fn max_input_bytes() -> usize {
    decode::MAX_INPUT_BYTES
}

/// Suggest a max-width for the target-size form.
///
/// Wider than 3000px → 1280, wider than 2000px → 1080, wider than 1000px →
/// 720, otherwise the image's own width.
#[wasm_bindgen]
pub fn suggest_max_width(width: u32) -> u32 {
    decode::suggest_max_width(width)
}

/// Label for a selected file: its name and size in MB.
#[wasm_bindgen]
pub fn file_info(name: &str, size: usize) -> String {
    naming::file_info(name, size)
}

/// Resize an image to exact dimensions.
///
/// # Arguments
///
/// * `image` - The source image to resize
/// * `width` - Target width in pixels
/// * `height` - Target height in pixels
/// * `filter` - Resize algorithm: 0=Nearest (fastest), 1=Bilinear (default), 2=Lanczos3 (best quality)
///
/// # Errors
///
/// Returns an error if width or height is zero.
#[wasm_bindgen]
pub fn resize(
    image: &JsDecodedImage,
    width: u32,
    height: u32,
    filter: u8,
) -> Result<JsDecodedImage, JsValue> {
    let decoded = image.to_decoded();
    let filter_type = filter_from_u8(filter);

    decode::resize(&decoded, width, height, filter_type)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
