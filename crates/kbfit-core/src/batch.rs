//! Sequential target-size encoding of several images.
//!
//! Images are processed one at a time in the order given. Each image gets
//! its own result; a failure on one image does not stop the rest. Only
//! cancellation ends the batch early.

use crate::decode::DecodedImage;
use crate::encode::Codec;
use crate::search::{EncodingRequest, SearchError, SearchResult, TargetSizeEncoder};

/// Per-image outcomes of a batch.
#[derive(Debug)]
pub struct BatchReport {
    /// One entry per processed image, in input order.
    pub results: Vec<Result<SearchResult, SearchError>>,
    /// Images in the batch, processed or not.
    pub total: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    /// True when cancellation stopped the batch before the last image.
    pub fn was_cancelled(&self) -> bool {
        matches!(self.results.last(), Some(Err(SearchError::Cancelled)))
    }
}

/// Encode every image with the same request.
///
/// `on_progress` receives `(completed + current_fraction) / count` after
/// every trial of every image.
pub fn encode_batch<'a, I, C, F>(
    images: I,
    request: &EncodingRequest,
    encoder: &TargetSizeEncoder<C>,
    mut on_progress: F,
) -> BatchReport
where
    I: IntoIterator<Item = &'a DecodedImage>,
    I::IntoIter: ExactSizeIterator,
    C: Codec,
    F: FnMut(f32),
{
    let images = images.into_iter();
    let total = images.len();
    let mut results = Vec::with_capacity(total);

    for (index, image) in images.enumerate() {
        let result = encoder.encode_with_progress(image, request, |fraction| {
            on_progress(batch_progress(index, fraction, total));
        });

        match &result {
            Ok(found) => log::debug!("Batch item {}/{}: {} bytes", index + 1, total, found.size()),
            Err(err) => log::warn!("Batch item {}/{} failed: {}", index + 1, total, err),
        }

        let cancelled = matches!(result, Err(SearchError::Cancelled));
        results.push(result);
        if cancelled {
            break;
        }
        on_progress(batch_progress(index + 1, 0.0, total));
    }

    BatchReport { results, total }
}

/// Overall progress with `completed` images done and the current one at
/// `current`. An empty batch counts as complete.
pub fn batch_progress(completed: usize, current: f32, total: usize) -> f32 {
    if total == 0 {
        return 1.0;
    }
    ((completed as f32 + current) / total as f32).min(1.0)
}
