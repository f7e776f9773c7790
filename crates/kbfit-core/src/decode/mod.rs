//! Image decoding and resizing for kbfit.
//!
//! This module provides functionality for:
//! - Decoding uploaded JPEG, PNG and WebP bytes into RGB pixel buffers
//! - Enforcing the upload size limit
//! - Resizing and the dimension arithmetic used by the target-size search
//!
//! # Architecture
//!
//! The pipeline is designed to be used from Web Workers via WASM bindings.
//! All operations are synchronous and single-threaded within WASM.
//!
//! # Examples
//!
//! ```ignore
//! use kbfit_core::decode::{decode_image, fit_to_width};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let image = decode_image(&bytes).unwrap();
//! let (w, h) = fit_to_width(image.width, image.height, 1280);
//! ```

mod load;
mod resize;
mod types;

pub use load::{check_input_size, decode_image, decode_image_with_limit, MAX_INPUT_BYTES};
pub use resize::{fit_to_width, resize, scale_dimensions, suggest_max_width};
pub use types::{DecodeError, DecodedImage, FilterType};
