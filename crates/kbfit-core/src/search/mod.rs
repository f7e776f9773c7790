//! Target-size encoding for kbfit.
//!
//! This module provides functionality for:
//! - Finding the quality (and, if needed, the dimensions) at which an image
//!   compresses to at most a given number of bytes
//! - Bounding the work: at most `1 + bisect_iterations + fallback_steps`
//!   compress calls per image
//! - Progress reporting and cancellation between trials
//!
//! # Architecture
//!
//! The decision logic lives in [`TargetSearch`], which performs no I/O.
//! [`TargetSizeEncoder`] drives it with any synchronous [`Codec`]; the WASM
//! crate drives the same state machine with an asynchronous browser codec.
//!
//! # Examples
//!
//! ```ignore
//! use kbfit_core::encode::{OutputFormat, RasterCodec};
//! use kbfit_core::search::{EncodingRequest, TargetSizeEncoder};
//!
//! let encoder = TargetSizeEncoder::new(RasterCodec::default());
//! let request = EncodingRequest::from_kb(200, OutputFormat::Jpeg).with_max_width(1280);
//! let result = encoder.encode(&image, &request)?;
//! assert!(result.size() <= 200 * 1024);
//! ```

mod cancel;
mod error;
mod plan;
mod policy;
mod request;

pub use cancel::CancelToken;
pub use error::{CandidateStats, SearchError};
pub use plan::{SearchResult, Strategy, TargetSearch, Trial};
pub use policy::{SearchPolicy, MAX_BISECT_ITERATIONS, MAX_FALLBACK_STEPS};
pub use request::EncodingRequest;

use crate::decode::DecodedImage;
use crate::encode::{Codec, RasterCodec};

/// Synchronous driver of [`TargetSearch`].
#[derive(Debug, Clone)]
pub struct TargetSizeEncoder<C> {
    codec: C,
    policy: SearchPolicy,
    cancel: Option<CancelToken>,
}

impl<C: Codec> TargetSizeEncoder<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            policy: SearchPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_policy(mut self, policy: SearchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Abort with [`SearchError::Cancelled`] once `token` is set.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &SearchPolicy {
        &self.policy
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn encode(
        &self,
        image: &DecodedImage,
        request: &EncodingRequest,
    ) -> Result<SearchResult, SearchError> {
        self.encode_with_progress(image, request, |_| {})
    }

    /// Run the search, calling `on_progress` with a fraction in `[0, 1]`
    /// after every trial.
    pub fn encode_with_progress<F>(
        &self,
        image: &DecodedImage,
        request: &EncodingRequest,
        mut on_progress: F,
    ) -> Result<SearchResult, SearchError>
    where
        F: FnMut(f32),
    {
        let honors_quality = self.codec.honors_quality(request.format);
        let mut search = TargetSearch::new(image, request, &self.policy, honors_quality)?;

        // Quality trials share dimensions, so one render serves all of them.
        let mut canvas: Option<((u32, u32), C::Canvas)> = None;

        while let Some(trial) = search.next_trial() {
            if self.is_cancelled() {
                log::info!("Target search cancelled after {} trials", search.trials());
                return Err(SearchError::Cancelled);
            }

            let dims = trial.dimensions();
            let rendered = match canvas.take() {
                Some((canvas_dims, rendered)) if canvas_dims == dims => rendered,
                _ => self.codec.render(image, trial.width, trial.height)?,
            };

            let bytes = self.codec.compress(&rendered, request.format, trial.quality)?;
            canvas = Some((dims, rendered));

            search.record(bytes);
            on_progress(search.progress());
        }

        match search.finish() {
            Ok(result) => {
                log::info!(
                    "Encoded {}x{} {} at quality {:.3}: {} bytes of {} in {} trials ({})",
                    result.width,
                    result.height,
                    result.format,
                    result.quality,
                    result.size(),
                    request.target_bytes,
                    result.trials,
                    result.strategy.as_str()
                );
                on_progress(1.0);
                Ok(result)
            }
            Err(err) => {
                log::warn!("{err}");
                Err(err)
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

impl TargetSizeEncoder<RasterCodec> {
    /// Encoder on the native codec, resampling with the policy's filter.
    pub fn native(policy: SearchPolicy) -> Self {
        TargetSizeEncoder::new(RasterCodec::new(policy.filter)).with_policy(policy)
    }
}

/// One-off search with the default policy.
pub fn encode_to_target<C: Codec>(
    image: &DecodedImage,
    request: &EncodingRequest,
    codec: C,
) -> Result<SearchResult, SearchError> {
    TargetSizeEncoder::new(codec).encode(image, request)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::encode::{EncodeError, OutputFormat};

    /// Codec whose output size is a function of area and quality.
    #[derive(Default)]
    struct ModelCodec {
        renders: Cell<u32>,
        compresses: Cell<u32>,
        fail_at: Option<u32>,
    }

    impl Codec for ModelCodec {
        type Canvas = (u32, u32);

        fn render(
            &self,
            _source: &DecodedImage,
            width: u32,
            height: u32,
        ) -> Result<(u32, u32), EncodeError> {
            self.renders.set(self.renders.get() + 1);
            Ok((width, height))
        }

        fn compress(
            &self,
            canvas: &(u32, u32),
            _format: OutputFormat,
            quality: f32,
        ) -> Result<Vec<u8>, EncodeError> {
            let n = self.compresses.get() + 1;
            self.compresses.set(n);
            if self.fail_at == Some(n) {
                return Err(EncodeError::EncodingFailed("model failure".into()));
            }
            let area = (canvas.0 * canvas.1) as f32;
            Ok(vec![0; (area * (0.02 + quality * quality * 0.5)) as usize])
        }
    }

    fn image(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(
            width,
            height,
            vec![0; DecodedImage::expected_len(width, height)],
        )
    }

    #[test]
    fn test_quality_trials_reuse_canvas() {
        let encoder = TargetSizeEncoder::new(ModelCodec::default())
            .with_policy(SearchPolicy::unguarded());
        let req = EncodingRequest::new(10_000, OutputFormat::Jpeg);

        let result = encoder.encode(&image(200, 200), &req).unwrap();

        assert_eq!(result.strategy, Strategy::QualitySearch);
        assert_eq!(encoder.codec().renders.get(), 1);
        assert_eq!(encoder.codec().compresses.get(), 13);
        assert_eq!(result.trials, 13);
    }

    #[test]
    fn test_fallback_renders_each_shrink() {
        let policy = SearchPolicy {
            fallback_quality: 0.05,
            ..SearchPolicy::unguarded()
        };
        let encoder = TargetSizeEncoder::new(ModelCodec::default()).with_policy(policy);
        // Floor quality gives ~0.021 bytes per pixel: 200x200 -> 850, 162x162 -> 557
        let req = EncodingRequest::new(600, OutputFormat::Jpeg);

        let result = encoder.encode(&image(200, 200), &req).unwrap();

        assert_eq!(result.strategy, Strategy::DimensionFallback);
        assert_eq!((result.width, result.height), (162, 162));
        assert!(result.size() <= 600);
        assert_eq!(result.trials, 15);
        assert_eq!(encoder.codec().renders.get(), 3);
    }

    #[test]
    fn test_progress_reaches_one() {
        let encoder = TargetSizeEncoder::new(ModelCodec::default())
            .with_policy(SearchPolicy::unguarded());
        let req = EncodingRequest::new(10_000, OutputFormat::Jpeg);

        let mut seen = Vec::new();
        encoder
            .encode_with_progress(&image(200, 200), &req, |p| seen.push(p))
            .unwrap();

        assert_eq!(seen.len(), 14);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last(), Some(&1.0));
    }

    #[test]
    fn test_cancelled_before_first_trial() {
        let token = CancelToken::new();
        token.cancel();
        let encoder = TargetSizeEncoder::new(ModelCodec::default())
            .with_policy(SearchPolicy::unguarded())
            .with_cancel_token(token);
        let req = EncodingRequest::new(10_000, OutputFormat::Jpeg);

        let err = encoder.encode(&image(200, 200), &req).unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
        assert_eq!(encoder.codec().compresses.get(), 0);
    }

    #[test]
    fn test_cancelled_mid_search() {
        let token = CancelToken::new();
        let encoder = TargetSizeEncoder::new(ModelCodec::default())
            .with_policy(SearchPolicy::unguarded())
            .with_cancel_token(token.clone());
        let req = EncodingRequest::new(10_000, OutputFormat::Jpeg);

        let mut calls = 0;
        let err = encoder
            .encode_with_progress(&image(200, 200), &req, |_| {
                calls += 1;
                if calls == 3 {
                    token.cancel();
                }
            })
            .unwrap_err();

        assert!(matches!(err, SearchError::Cancelled));
        assert_eq!(encoder.codec().compresses.get(), 3);
    }

    #[test]
    fn test_codec_failure_propagates() {
        let codec = ModelCodec {
            fail_at: Some(2),
            ..ModelCodec::default()
        };
        let encoder = TargetSizeEncoder::new(codec).with_policy(SearchPolicy::unguarded());
        let req = EncodingRequest::new(10_000, OutputFormat::Jpeg);

        let err = encoder.encode(&image(200, 200), &req).unwrap_err();
        assert_eq!(err.kind(), "CodecFailure");
    }

    #[test]
    fn test_invalid_request_makes_no_calls() {
        let encoder = TargetSizeEncoder::new(ModelCodec::default());
        let req = EncodingRequest::from_kb(5, OutputFormat::Jpeg);

        let err = encoder.encode(&image(200, 200), &req).unwrap_err();
        assert_eq!(err.kind(), "InvalidRequest");
        assert_eq!(encoder.codec().renders.get(), 0);
    }

    #[test]
    fn test_native_encoder_uses_policy_filter() {
        let policy = SearchPolicy {
            filter: crate::decode::FilterType::Lanczos3,
            ..SearchPolicy::default()
        };
        let encoder = TargetSizeEncoder::native(policy);
        assert_eq!(encoder.codec().filter(), crate::decode::FilterType::Lanczos3);
    }

    #[test]
    fn test_encode_to_target_native_jpeg() {
        let img = image(64, 64);
        let req = EncodingRequest::from_kb(20, OutputFormat::Jpeg);
        let result = encode_to_target(&img, &req, RasterCodec::default()).unwrap();

        assert_eq!(result.strategy, Strategy::Probe);
        assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
        assert!(result.size() <= 20 * 1024);
    }
}
