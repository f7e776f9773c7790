//! Multi-file selection WASM bindings.
//!
//! The page adds uploaded files to a [`JsBatch`] and then encodes them all
//! with one request. Files are decoded when added, so oversized or broken
//! uploads are rejected up front.
//!
//! # Example
//!
//! ```typescript
//! const batch = new JsBatch();
//! for (const file of input.files) {
//!   batch.add_file(file.name, new Uint8Array(await file.arrayBuffer()));
//! }
//! const outcomes = batch.encode_all({ targetKb: 100 }, undefined, (p) => bar.value = p);
//! for (const { name, result, error } of outcomes) { ... }
//!
//! // Cancellable, with the browser's encoder
//! const controller = new AbortController();
//! const outcomes = await batch.encode_all_async(
//!   { targetKb: 100, format: 'image/webp' }, codec, undefined, onProgress, controller.signal,
//! );
//! ```

use js_sys::{Array, Function, Object, Promise, Reflect};
use kbfit_core::batch::{batch_progress, encode_batch};
use kbfit_core::decode::{self, DecodedImage};
use kbfit_core::search::{EncodingRequest, SearchError, SearchResult};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::search::{
    native_encoder, parse_policy, parse_request, report_progress, search_error_to_js,
    JsSearchResult, PromiseCodec,
};
use crate::types::JsDecodedImage;

struct BatchEntry {
    name: String,
    image: DecodedImage,
}

/// Selected files awaiting a batch encode.
#[wasm_bindgen]
#[derive(Default)]
pub struct JsBatch {
    entries: Vec<BatchEntry>,
}

#[wasm_bindgen]
impl JsBatch {
    #[wasm_bindgen(constructor)]
    pub fn new() -> JsBatch {
        JsBatch::default()
    }

    /// Decode and add an uploaded file.
    ///
    /// # Errors
    ///
    /// Returns an error for empty, oversized (> 20 MB) or undecodable input.
    /// The batch is unchanged in that case.
    pub fn add_file(&mut self, name: String, bytes: &[u8]) -> Result<(), JsValue> {
        let image = decode::decode_image(bytes)
            .map_err(|e| JsValue::from_str(&format!("{name}: {e}")))?;
        self.push(name, image);
        Ok(())
    }

    /// Add already decoded pixels.
    pub fn add_image(&mut self, name: String, image: &JsDecodedImage) {
        self.push(name, image.to_decoded());
    }

    #[wasm_bindgen(getter)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File names in selection order.
    pub fn names(&self) -> Array {
        self.entries
            .iter()
            .map(|entry| JsValue::from_str(&entry.name))
            .collect()
    }

    /// Remove the file at `index`. Returns false if out of range.
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            return false;
        }
        self.entries.remove(index);
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Encode every file in order with the native codec.
    ///
    /// Returns one `{ name, result?, error? }` object per file. A failure on
    /// one file does not stop the others.
    pub fn encode_all(
        &self,
        request: JsValue,
        policy: JsValue,
        on_progress: Option<Function>,
    ) -> Result<Array, JsValue> {
        let request = parse_request(request).map_err(|e| search_error_to_js(&e))?;
        let policy = parse_policy(policy).map_err(|e| search_error_to_js(&e))?;
        let encoder = native_encoder(policy, &request).map_err(|e| search_error_to_js(&e))?;

        let images = self.entries.iter().map(|entry| &entry.image);
        let report = encode_batch(images, &request, &encoder, |fraction| {
            report_progress(on_progress.as_ref(), fraction)
        });
        log::info!(
            "Batch finished: {} of {} succeeded",
            report.succeeded(),
            report.total
        );

        let outcomes = Array::new();
        for (entry, result) in self.entries.iter().zip(report.results) {
            outcomes.push(&JsValue::from(outcome(&entry.name, result, &request)?));
        }
        Ok(outcomes)
    }

    /// Encode every file in order with a JavaScript codec.
    ///
    /// `codec` has the same shape as for `encode_to_target_async`. The
    /// `signal` is checked before every trial; once aborted, the file in
    /// progress gets a `Cancelled` error and the remaining files are skipped.
    /// Resolves to the same `{ name, result?, error? }` array as
    /// [`JsBatch::encode_all`], holding only the files that were processed.
    pub fn encode_all_async(
        &self,
        request: JsValue,
        codec: Function,
        policy: JsValue,
        on_progress: Option<Function>,
        signal: Option<web_sys::AbortSignal>,
    ) -> Promise {
        // The promise outlives this borrow of the batch
        let entries: Vec<(String, DecodedImage)> = self
            .entries
            .iter()
            .map(|entry| (entry.name.clone(), entry.image.clone()))
            .collect();

        future_to_promise(async move {
            let request = parse_request(request).map_err(|e| search_error_to_js(&e))?;
            let policy = parse_policy(policy).map_err(|e| search_error_to_js(&e))?;
            let driver = PromiseCodec::new(codec, policy.filter);
            let total = entries.len();

            let outcomes = Array::new();
            for (index, (name, image)) in entries.iter().enumerate() {
                let result = driver
                    .run(
                        image,
                        &request,
                        &policy,
                        |fraction| {
                            report_progress(
                                on_progress.as_ref(),
                                batch_progress(index, fraction, total),
                            )
                        },
                        signal.as_ref(),
                    )
                    .await;

                let cancelled = matches!(result, Err(SearchError::Cancelled));
                outcomes.push(&JsValue::from(outcome(name, result, &request)?));
                if cancelled {
                    log::info!("Batch cancelled after {} of {} files", index, total);
                    break;
                }
                report_progress(on_progress.as_ref(), batch_progress(index + 1, 0.0, total));
            }
            Ok(outcomes.into())
        })
    }
}

fn outcome(
    name: &str,
    result: Result<SearchResult, SearchError>,
    request: &EncodingRequest,
) -> Result<Object, JsValue> {
    let outcome = Object::new();
    Reflect::set(&outcome, &"name".into(), &JsValue::from_str(name))?;
    match result {
        Ok(found) => {
            let result = JsSearchResult::new(found, request);
            Reflect::set(&outcome, &"result".into(), &JsValue::from(result))?;
        }
        Err(err) => {
            Reflect::set(&outcome, &"error".into(), &search_error_to_js(&err))?;
        }
    }
    Ok(outcome)
}

impl JsBatch {
    fn push(&mut self, name: String, image: DecodedImage) {
        log::debug!(
            "Batch: added {} ({}x{})",
            name,
            image.width,
            image.height
        );
        self.entries.push(BatchEntry { name, image });
    }
}
