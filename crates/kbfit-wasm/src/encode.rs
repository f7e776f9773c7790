//! One-shot encoding WASM bindings.
//!
//! These back the compress, convert and resize tools. Each performs a single
//! encode with the native codec.
//!
//! # Functions
//!
//! - [`compress_image`] - Re-encode at a 0-100 quality level
//! - [`convert_image`] - Re-encode into another format
//! - [`resize_image`] - Re-encode at exact dimensions
//!
//! `format` arguments accept a MIME type (`"image/webp"`) or a short name
//! (`"webp"`); anything unrecognized means JPEG.
//!
//! # Example
//!
//! ```typescript
//! import { compress_image } from '@kbfit/wasm';
//!
//! const out = compress_image(image, 70, 'image/jpeg');
//! const blob = new Blob([out.bytes()], { type: out.mime_type });
//! link.download = out.filename; // "compressed.jpg"
//! ```

use crate::types::{filter_from_u8, JsDecodedImage, JsEncodedImage};
use kbfit_core::encode::{self, OutputFormat, RasterCodec};
use kbfit_core::naming::Operation;
use wasm_bindgen::prelude::*;

/// Re-encode at the image's own size with a 0-100 quality level.
///
/// The level is clamped to 1-95; zero or negative means 75. PNG ignores it.
#[wasm_bindgen]
pub fn compress_image(
    image: &JsDecodedImage,
    quality: f32,
    format: &str,
) -> Result<JsEncodedImage, JsValue> {
    let format = OutputFormat::from_mime_or_default(format);
    encode::compress_with_quality(&RasterCodec::default(), &image.to_decoded(), format, quality)
        .map(|encoded| JsEncodedImage::new(encoded, Operation::Compress))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Re-encode at the image's own size into `format`.
#[wasm_bindgen]
pub fn convert_image(image: &JsDecodedImage, format: &str) -> Result<JsEncodedImage, JsValue> {
    let format = OutputFormat::from_mime_or_default(format);
    encode::convert_format(&RasterCodec::default(), &image.to_decoded(), format)
        .map(|encoded| JsEncodedImage::new(encoded, Operation::Convert))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Render at exactly `width` x `height` and encode.
///
/// # Arguments
///
/// * `filter` - Resize algorithm: 0=Nearest, 1=Bilinear (default), 2=Lanczos3
///
/// # Errors
///
/// Returns an error if width or height is zero.
#[wasm_bindgen]
pub fn resize_image(
    image: &JsDecodedImage,
    width: u32,
    height: u32,
    format: &str,
    filter: u8,
) -> Result<JsEncodedImage, JsValue> {
    let format = OutputFormat::from_mime_or_default(format);
    let codec = RasterCodec::new(filter_from_u8(filter));
    encode::resize_exact(&codec, &image.to_decoded(), width, height, format)
        .map(|encoded| JsEncodedImage::new(encoded, Operation::Resize))
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Tests for encode bindings.
///
/// The `JsValue` error paths only work on wasm32 targets; the core functions
/// are exercised directly here.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_produces_jpeg() {
        let img = JsDecodedImage::new(10, 10, vec![128u8; 10 * 10 * 3]);
        let encoded = encode::compress_with_quality(
            &RasterCodec::default(),
            &img.to_decoded(),
            OutputFormat::from_mime_or_default("image/jpeg"),
            80.0,
        )
        .unwrap();
        let js = JsEncodedImage::new(encoded, Operation::Compress);

        assert_eq!(&js.bytes()[0..2], &[0xFF, 0xD8]);
        assert_eq!(js.filename(), "compressed.jpg");
    }

    #[test]
    fn test_unknown_format_means_jpeg() {
        assert_eq!(
            OutputFormat::from_mime_or_default("image/gif"),
            OutputFormat::Jpeg
        );
    }
}
