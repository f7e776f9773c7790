//! Target-size encoding WASM bindings.
//!
//! Two drivers of the same search:
//!
//! - [`encode_to_target`] runs synchronously with the native codec (JPEG with
//!   quality, lossless PNG). Best called from a Web Worker. Lossy WebP is not
//!   in the wasm build of the native codec, so WebP targets are refused here.
//! - [`encode_to_target_async`] hands every trial to a JavaScript codec
//!   returning a promise, typically `OffscreenCanvas.convertToBlob`, which
//!   also gives lossy WebP.
//!
//! Requests are plain objects: `{ targetKb | targetBytes, maxWidth?, format? }`.
//! Policies are optional partial objects in camelCase (`{ bisectIterations: 8 }`).
//!
//! Search failures are thrown as `Error` objects whose `name` is one of
//! `InvalidRequest`, `CodecFailure`, `TargetUnattainable` or `Cancelled`.
//! `TargetUnattainable` errors carry a `closest` property with the smallest
//! candidate tried.
//!
//! # Example
//!
//! ```typescript
//! const codec = async (rgba, width, height, mime, quality) => {
//!   const canvas = new OffscreenCanvas(width, height);
//!   canvas.getContext('2d').putImageData(new ImageData(new Uint8ClampedArray(rgba.buffer), width, height), 0, 0);
//!   const blob = await canvas.convertToBlob({ type: mime, quality });
//!   return new Uint8Array(await blob.arrayBuffer());
//! };
//!
//! const controller = new AbortController();
//! const result = await encode_to_target_async(
//!   image.width, image.height, image.pixels(),
//!   { targetKb: 200, format: 'image/webp' },
//!   codec, undefined, (p) => bar.value = p, controller.signal,
//! );
//! link.download = result.filename(file.name); // "photo-200kb.webp"
//! ```

use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use kbfit_core::decode::{self, DecodedImage, FilterType};
use kbfit_core::encode::{Codec, EncodeError, OutputFormat, RasterCodec};
use kbfit_core::naming::{format_kb, target_filename};
use kbfit_core::search::{
    EncodingRequest, SearchError, SearchPolicy, SearchResult, TargetSearch, TargetSizeEncoder,
    Trial,
};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::types::JsDecodedImage;

/// Request object as sent by the page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestInit {
    target_kb: Option<f64>,
    target_bytes: Option<f64>,
    max_width: Option<u32>,
    format: Option<String>,
}

impl RequestInit {
    /// `targetBytes` wins over `targetKb`. A `maxWidth` of 0 means no cap,
    /// matching an empty form field.
    pub(crate) fn into_request(self) -> Result<EncodingRequest, SearchError> {
        let target = match (self.target_bytes, self.target_kb) {
            (Some(bytes), _) => bytes,
            (None, Some(kb)) => kb * 1024.0,
            (None, None) => {
                return Err(SearchError::InvalidRequest(
                    "targetKb or targetBytes is required".to_string(),
                ))
            }
        };
        if !target.is_finite() || target < 1.0 {
            return Err(SearchError::InvalidRequest(format!(
                "target size must be positive, got {target} bytes"
            )));
        }

        let format = OutputFormat::from_mime_or_default(self.format.as_deref().unwrap_or(""));
        let mut request = EncodingRequest::new(target.floor() as u64, format);
        if let Some(max_width) = self.max_width.filter(|w| *w > 0) {
            request = request.with_max_width(max_width);
        }
        Ok(request)
    }
}

pub(crate) fn parse_request(value: JsValue) -> Result<EncodingRequest, SearchError> {
    let init: RequestInit = serde_wasm_bindgen::from_value(value)
        .map_err(|e| SearchError::InvalidRequest(e.to_string()))?;
    init.into_request()
}

/// `undefined` or `null` means the default policy.
pub(crate) fn parse_policy(value: JsValue) -> Result<SearchPolicy, SearchError> {
    if value.is_undefined() || value.is_null() {
        return Ok(SearchPolicy::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| SearchError::InvalidRequest(e.to_string()))
}

/// Build the `Error` thrown to JavaScript.
pub(crate) fn search_error_to_js(err: &SearchError) -> JsValue {
    let error = js_sys::Error::new(&err.to_string());
    error.set_name(err.kind());

    if let SearchError::TargetUnattainable {
        closest: Some(closest),
        ..
    } = err
    {
        if let Ok(stats) = serde_wasm_bindgen::to_value(closest) {
            let _ = Reflect::set(&error, &JsValue::from_str("closest"), &stats);
        }
    }

    error.into()
}

/// Native encoder for `request`, refusing formats whose quality the native
/// codec cannot vary in this build.
pub(crate) fn native_encoder(
    policy: SearchPolicy,
    request: &EncodingRequest,
) -> Result<TargetSizeEncoder<RasterCodec>, SearchError> {
    let encoder = TargetSizeEncoder::native(policy);
    if request.format.is_lossy() && !encoder.codec().honors_quality(request.format) {
        return Err(SearchError::InvalidRequest(format!(
            "{} targets need a browser codec: use the async encoder",
            request.format.mime_type()
        )));
    }
    Ok(encoder)
}

pub(crate) fn report_progress(callback: Option<&Function>, fraction: f32) {
    if let Some(callback) = callback {
        if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_f64(f64::from(fraction))) {
            log::warn!("Progress callback threw: {:?}", e);
        }
    }
}

/// A successful target-size encode.
#[wasm_bindgen]
pub struct JsSearchResult {
    inner: SearchResult,
    target_kb: u64,
}

#[wasm_bindgen]
impl JsSearchResult {
    /// Encoded file bytes as Uint8Array (copied).
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn size(&self) -> usize {
        self.inner.size()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Quality factor in `[0, 1]` of the returned bytes.
    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> f32 {
        self.inner.quality
    }

    /// Compress calls made.
    #[wasm_bindgen(getter)]
    pub fn trials(&self) -> u32 {
        self.inner.trials
    }

    /// `"probe"`, `"quality-search"` or `"dimension-fallback"`.
    #[wasm_bindgen(getter)]
    pub fn strategy(&self) -> String {
        self.inner.strategy.as_str().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.inner.format.mime_type().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn size_label(&self) -> String {
        format_kb(self.inner.size())
    }

    /// Download name derived from the uploaded file's name,
    /// e.g. `photo.png` → `photo-200kb.jpg`.
    pub fn filename(&self, input_name: &str) -> String {
        target_filename(input_name, self.target_kb, self.inner.format)
    }

    pub fn free(self) {}
}

impl JsSearchResult {
    pub(crate) fn new(inner: SearchResult, request: &EncodingRequest) -> Self {
        Self {
            inner,
            target_kb: request.target_kb(),
        }
    }
}

/// Encode `image` to at most the requested size with the native codec.
///
/// # Arguments
///
/// * `request` - `{ targetKb | targetBytes, maxWidth?, format? }`
/// * `policy` - Optional partial search policy
/// * `on_progress` - Optional callback receiving a fraction in `[0, 1]`
#[wasm_bindgen]
pub fn encode_to_target(
    image: &JsDecodedImage,
    request: JsValue,
    policy: JsValue,
    on_progress: Option<Function>,
) -> Result<JsSearchResult, JsValue> {
    let request = parse_request(request).map_err(|e| search_error_to_js(&e))?;
    let policy = parse_policy(policy).map_err(|e| search_error_to_js(&e))?;

    native_encoder(policy, &request)
        .map_err(|e| search_error_to_js(&e))?
        .encode_with_progress(&image.to_decoded(), &request, |fraction| {
            report_progress(on_progress.as_ref(), fraction)
        })
        .map(|result| JsSearchResult::new(result, &request))
        .map_err(|e| search_error_to_js(&e))
}

/// Encode RGB pixels to at most the requested size with a JavaScript codec.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `request` - `{ targetKb | targetBytes, maxWidth?, format? }`
/// * `codec` - `(rgba, width, height, mime, quality) => Promise<Uint8Array | null>`;
///   `null` or a rejection aborts the search with `CodecFailure`
/// * `policy` - Optional partial search policy
/// * `on_progress` - Optional callback receiving a fraction in `[0, 1]`
/// * `signal` - Optional `AbortSignal`, checked before every trial
#[allow(clippy::too_many_arguments)]
#[wasm_bindgen]
pub async fn encode_to_target_async(
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    request: JsValue,
    codec: Function,
    policy: JsValue,
    on_progress: Option<Function>,
    signal: Option<web_sys::AbortSignal>,
) -> Result<JsSearchResult, JsValue> {
    let image = DecodedImage {
        width,
        height,
        pixels,
    };
    let request = parse_request(request).map_err(|e| search_error_to_js(&e))?;
    let policy = parse_policy(policy).map_err(|e| search_error_to_js(&e))?;

    let driver = PromiseCodec::new(codec, policy.filter);
    driver
        .run(
            &image,
            &request,
            &policy,
            |fraction| report_progress(on_progress.as_ref(), fraction),
            signal.as_ref(),
        )
        .await
        .map(|result| JsSearchResult::new(result, &request))
        .map_err(|e| search_error_to_js(&e))
}

/// Asynchronous driver around a JavaScript compress function.
pub(crate) struct PromiseCodec {
    compress: Function,
    filter: FilterType,
}

impl PromiseCodec {
    pub(crate) fn new(compress: Function, filter: FilterType) -> Self {
        Self { compress, filter }
    }

    pub(crate) async fn run<F: FnMut(f32)>(
        &self,
        image: &DecodedImage,
        request: &EncodingRequest,
        policy: &SearchPolicy,
        mut on_progress: F,
        signal: Option<&web_sys::AbortSignal>,
    ) -> Result<SearchResult, SearchError> {
        // Canvas encoders honour quality for JPEG and WebP.
        let mut search = TargetSearch::new(image, request, policy, request.format.is_lossy())?;
        let mut canvas: Option<((u32, u32), Uint8Array)> = None;

        while let Some(trial) = search.next_trial() {
            if signal.is_some_and(|s| s.aborted()) {
                log::info!("Target search aborted after {} trials", search.trials());
                return Err(SearchError::Cancelled);
            }

            let dims = trial.dimensions();
            let rgba = match canvas.take() {
                Some((canvas_dims, rgba)) if canvas_dims == dims => rgba,
                _ => self.render(image, trial.width, trial.height)?,
            };

            let bytes = self.compress(&rgba, trial, request.format).await?;
            canvas = Some((dims, rgba));

            search.record(bytes);
            on_progress(search.progress());
        }

        let result = search.finish();
        match &result {
            Ok(found) => {
                log::info!(
                    "Encoded {}x{} {} at quality {:.3}: {} bytes in {} trials ({})",
                    found.width,
                    found.height,
                    found.format,
                    found.quality,
                    found.size(),
                    found.trials,
                    found.strategy.as_str()
                );
                on_progress(1.0);
            }
            Err(err) => log::warn!("{err}"),
        }
        result
    }

    fn render(&self, image: &DecodedImage, width: u32, height: u32) -> Result<Uint8Array, SearchError> {
        let rendered = decode::resize(image, width, height, self.filter)
            .map_err(|e| EncodeError::RenderFailed(e.to_string()))?;
        Ok(Uint8Array::from(rendered.to_rgba_bytes().as_slice()))
    }

    async fn compress(
        &self,
        rgba: &Uint8Array,
        trial: Trial,
        format: OutputFormat,
    ) -> Result<Vec<u8>, SearchError> {
        let args = Array::of5(
            rgba,
            &JsValue::from(trial.width),
            &JsValue::from(trial.height),
            &JsValue::from_str(format.mime_type()),
            &JsValue::from_f64(f64::from(trial.quality)),
        );

        let returned = self
            .compress
            .apply(&JsValue::NULL, &args)
            .map_err(|e| codec_failure(&e))?;
        let resolved = JsFuture::from(Promise::resolve(&returned))
            .await
            .map_err(|e| codec_failure(&e))?;

        if resolved.is_null() || resolved.is_undefined() {
            return Err(EncodeError::EncodingFailed(format!(
                "codec produced no {} data",
                format.mime_type()
            ))
            .into());
        }

        let array: Uint8Array = resolved.dyn_into().map_err(|_| {
            EncodeError::EncodingFailed("codec must resolve to a Uint8Array".to_string())
        })?;
        Ok(array.to_vec())
    }
}

fn codec_failure(value: &JsValue) -> SearchError {
    let message = value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| "codec threw a non-error value".to_string());
    EncodeError::EncodingFailed(message).into()
}
