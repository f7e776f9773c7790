//! Image encoding for kbfit.
//!
//! This module provides functionality for:
//! - Encoding RGB buffers to JPEG and WebP (quality-controlled) and PNG
//! - The [`Codec`] capability consumed by the target-size search
//! - One-shot compress / convert / resize operations
//!
//! # Architecture
//!
//! The encoding pipeline is designed to be used from Web Workers via WASM bindings.
//! All operations are synchronous and single-threaded within WASM.
//!
//! # Examples
//!
//! ```ignore
//! use kbfit_core::encode::{Codec, OutputFormat, RasterCodec};
//!
//! let codec = RasterCodec::default();
//! let canvas = codec.render(&image, 1280, 960)?;
//! let jpeg_bytes = codec.compress(&canvas, OutputFormat::Jpeg, 0.8)?;
//! ```

mod codec;
mod error;
mod format;
mod jpeg;
mod lossless;
mod lossy_webp;
mod presets;

pub use codec::{Codec, RasterCanvas, RasterCodec};
pub use error::EncodeError;
pub use format::OutputFormat;
pub use jpeg::{encode_jpeg, quality_to_percent};
pub use lossless::{encode_png, encode_webp_lossless};
pub use lossy_webp::{encode_webp, LOSSY_WEBP_AVAILABLE};
pub use presets::{
    compress_with_quality, convert_format, quality_from_percent, resize_exact, EncodedImage,
    CONVERT_QUALITY, DEFAULT_COMPRESS_QUALITY,
};
