//! kbfit WASM - WebAssembly bindings for kbfit
//!
//! This crate provides WASM bindings to expose the kbfit-core functionality
//! to JavaScript/TypeScript applications.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper types for image data
//! - `decode` - Decoding bindings (JPEG, PNG, WebP, resize, max-width suggestion)
//! - `encode` - One-shot compress, convert and resize
//! - `search` - Target-size encoding with the native or a JavaScript codec
//! - `batch` - Selection of several files encoded in sequence
//!
//! # Usage
//!
//! ```typescript
//! import init, { decode_image, encode_to_target } from '@kbfit/wasm';
//!
//! await init();
//!
//! const image = decode_image(new Uint8Array(await file.arrayBuffer()));
//! const result = encode_to_target(image, { targetKb: 200, maxWidth: 1280, format: 'image/jpeg' });
//! console.log(`${result.size_label} at ${result.width}x${result.height}`);
//! ```

use wasm_bindgen::prelude::*;

mod batch;
mod decode;
mod encode;
mod logger;
mod search;
mod types;

// Re-export public types
pub use batch::JsBatch;
pub use decode::{decode_image, file_info, max_input_bytes, resize, suggest_max_width};
pub use encode::{compress_image, convert_image, resize_image};
pub use search::{encode_to_target, encode_to_target_async, JsSearchResult};
pub use types::{JsDecodedImage, JsEncodedImage};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logger::install(log::LevelFilter::Info);
}

/// Change the console log level: "off", "error", "warn", "info", "debug" or "trace".
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter = logger::parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown log level: {level}")))?;
    log::set_max_level(filter);
    Ok(())
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
