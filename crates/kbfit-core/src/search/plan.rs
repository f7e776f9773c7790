//! The target-size search as a sans-IO state machine.
//!
//! [`TargetSearch`] decides which (quality, width, height) to try next and
//! digests the compressed bytes of each trial; it never renders or encodes
//! itself. A driver loops `next_trial` → render/compress → `record` until
//! `next_trial` returns `None`, then calls `finish`. The synchronous driver
//! lives in this crate, the asynchronous one in the WASM bindings.
//!
//! Phases:
//! 1. probe at the highest quality on the working canvas
//! 2. bisect the quality window for a fixed number of steps
//! 3. shrink dimensions step by step at a fixed quality
//!
//! Formats whose quality the codec ignores skip phase 2.

use serde::Serialize;

use super::{CandidateStats, EncodingRequest, SearchError, SearchPolicy};
use crate::decode::{scale_dimensions, DecodedImage};
use crate::encode::OutputFormat;

/// One encode the driver should perform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trial {
    pub quality: f32,
    pub width: u32,
    pub height: u32,
}

impl Trial {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Which phase produced the returned bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    Probe,
    QualitySearch,
    DimensionFallback,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::Probe => "probe",
            Strategy::QualitySearch => "quality-search",
            Strategy::DimensionFallback => "dimension-fallback",
        }
    }
}

/// A successful encode within the ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub quality: f32,
    pub format: OutputFormat,
    /// Compress calls made, including the winning one.
    pub trials: u32,
    pub strategy: Strategy,
}

impl SearchResult {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn stats(&self) -> CandidateStats {
        CandidateStats {
            quality: self.quality,
            width: self.width,
            height: self.height,
            size: self.size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Probe,
    Bisect { low: f32, high: f32, step: u32 },
    // width/height are the dimensions of the last fallback trial
    Fallback { step: u32, width: u32, height: u32 },
    Done,
}

#[derive(Debug)]
struct Best {
    bytes: Vec<u8>,
    stats: CandidateStats,
    strategy: Strategy,
}

/// State of one target-size search.
#[derive(Debug)]
pub struct TargetSearch {
    policy: SearchPolicy,
    target_bytes: u64,
    format: OutputFormat,
    quality_axis: bool,
    working: (u32, u32),
    phase: Phase,
    pending: Option<Trial>,
    best: Option<Best>,
    closest: Option<CandidateStats>,
    trials: u32,
}

impl TargetSearch {
    /// Validate the request and set up the probe.
    ///
    /// `honors_quality` tells whether the codec's output size responds to
    /// the quality factor for `request.format`; when false the bisection
    /// phase is skipped.
    pub fn new(
        image: &DecodedImage,
        request: &EncodingRequest,
        policy: &SearchPolicy,
        honors_quality: bool,
    ) -> Result<Self, SearchError> {
        policy.validate()?;
        request.validate(image, policy)?;

        let working = request.working_dimensions(image.width, image.height);
        log::debug!(
            "Target search: {} bytes as {}, source {}x{}, working {}x{}, quality axis {}",
            request.target_bytes,
            request.format,
            image.width,
            image.height,
            working.0,
            working.1,
            honors_quality
        );

        Ok(Self {
            policy: policy.clone(),
            target_bytes: request.target_bytes,
            format: request.format,
            quality_axis: honors_quality,
            working,
            phase: Phase::Probe,
            pending: None,
            best: None,
            closest: None,
            trials: 0,
        })
    }

    /// Dimensions after the one-time max-width downscale.
    pub fn working_dimensions(&self) -> (u32, u32) {
        self.working
    }

    pub fn target_bytes(&self) -> u64 {
        self.target_bytes
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Whether the bisection phase is part of this search.
    pub fn uses_quality(&self) -> bool {
        self.quality_axis
    }

    /// Compress results recorded so far.
    pub fn trials(&self) -> u32 {
        self.trials
    }

    /// Size of the best fitting candidate so far.
    pub fn best_size(&self) -> Option<usize> {
        self.best.as_ref().map(|b| b.stats.size)
    }

    /// Smallest oversized candidate so far.
    pub fn closest(&self) -> Option<CandidateStats> {
        self.closest
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Fraction of the trial budget consumed.
    pub fn progress(&self) -> f32 {
        (self.trials as f32 / self.policy.trial_budget() as f32).min(1.0)
    }

    /// The next encode to perform, or `None` once the search is over.
    ///
    /// Calling this again before [`record`](Self::record) returns the same
    /// trial.
    pub fn next_trial(&mut self) -> Option<Trial> {
        if let Some(trial) = self.pending {
            return Some(trial);
        }

        let (working_width, working_height) = self.working;
        let trial = match self.phase {
            Phase::Probe => Trial {
                quality: self.policy.probe_quality,
                width: working_width,
                height: working_height,
            },
            Phase::Bisect { low, high, .. } => Trial {
                quality: (low + high) / 2.0,
                width: working_width,
                height: working_height,
            },
            Phase::Fallback { width, height, .. } => {
                let (next_width, next_height) =
                    scale_dimensions(width, height, f64::from(self.policy.shrink_factor));
                let below_floor = self
                    .policy
                    .fallback_floor_width
                    .is_some_and(|floor| next_width < floor);

                if (next_width, next_height) == (width, height) || below_floor {
                    log::debug!(
                        "Dimension fallback stops at {}x{} (floor {:?})",
                        width,
                        height,
                        self.policy.fallback_floor_width
                    );
                    self.phase = Phase::Done;
                    return None;
                }

                Trial {
                    quality: self.policy.fallback_quality,
                    width: next_width,
                    height: next_height,
                }
            }
            Phase::Done => return None,
        };

        self.pending = Some(trial);
        Some(trial)
    }

    /// Digest the compressed bytes of the pending trial.
    pub fn record(&mut self, bytes: Vec<u8>) {
        let Some(trial) = self.pending.take() else {
            log::warn!("Ignoring {} bytes recorded without a pending trial", bytes.len());
            return;
        };

        self.trials += 1;
        let stats = CandidateStats {
            quality: trial.quality,
            width: trial.width,
            height: trial.height,
            size: bytes.len(),
        };
        let fits = bytes.len() as u64 <= self.target_bytes;

        log::debug!(
            "Trial {}: quality {:.3} at {}x{} -> {} bytes ({})",
            self.trials,
            trial.quality,
            trial.width,
            trial.height,
            stats.size,
            if fits { "fits" } else { "over" }
        );

        if !fits {
            self.note_oversize(stats);
        }

        self.phase = match self.phase {
            Phase::Probe => {
                if fits {
                    self.accept(bytes, stats, Strategy::Probe);
                    Phase::Done
                } else if self.quality_axis && self.policy.bisect_iterations > 0 {
                    Phase::Bisect {
                        low: self.policy.min_quality,
                        high: self.policy.max_quality,
                        step: 0,
                    }
                } else {
                    self.enter_fallback()
                }
            }
            Phase::Bisect { low, high, step } => {
                let (low, high) = if fits {
                    self.accept(bytes, stats, Strategy::QualitySearch);
                    (trial.quality, high)
                } else {
                    (low, trial.quality)
                };

                let step = step + 1;
                if step < self.policy.bisect_iterations {
                    Phase::Bisect { low, high, step }
                } else if self.best.is_some() {
                    Phase::Done
                } else {
                    self.enter_fallback()
                }
            }
            Phase::Fallback { step, .. } => {
                if fits {
                    self.accept(bytes, stats, Strategy::DimensionFallback);
                    Phase::Done
                } else if step + 1 < self.policy.fallback_steps {
                    Phase::Fallback {
                        step: step + 1,
                        width: trial.width,
                        height: trial.height,
                    }
                } else {
                    Phase::Done
                }
            }
            Phase::Done => Phase::Done,
        };
    }

    /// Consume the search and produce its outcome.
    pub fn finish(self) -> Result<SearchResult, SearchError> {
        match self.best {
            Some(best) => Ok(SearchResult {
                bytes: best.bytes,
                width: best.stats.width,
                height: best.stats.height,
                quality: best.stats.quality,
                format: self.format,
                trials: self.trials,
                strategy: best.strategy,
            }),
            None => Err(SearchError::TargetUnattainable {
                target_bytes: self.target_bytes,
                closest: self.closest,
            }),
        }
    }

    fn enter_fallback(&self) -> Phase {
        if self.policy.fallback_steps == 0 {
            return Phase::Done;
        }
        log::debug!(
            "No candidate fits {} bytes at {}x{}, shrinking dimensions",
            self.target_bytes,
            self.working.0,
            self.working.1
        );
        Phase::Fallback {
            step: 0,
            width: self.working.0,
            height: self.working.1,
        }
    }

    // The recorded best only moves to larger sizes, so a codec that is not
    // perfectly monotonic in quality cannot make the result worse.
    fn accept(&mut self, bytes: Vec<u8>, stats: CandidateStats, strategy: Strategy) {
        if let Some(best) = &self.best {
            if stats.size < best.stats.size {
                return;
            }
        }
        self.best = Some(Best {
            bytes,
            stats,
            strategy,
        });
    }

    fn note_oversize(&mut self, stats: CandidateStats) {
        match self.closest {
            Some(closest) if closest.size <= stats.size => {}
            _ => self.closest = Some(stats),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn image(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(
            width,
            height,
            vec![0; DecodedImage::expected_len(width, height)],
        )
    }

    proptest! {
        /// Whatever the size model, a success never exceeds the target and
        /// the trial count never exceeds the budget.
        #[test]
        fn prop_never_oversized_and_bounded(
            width in 1u32..=400,
            height in 1u32..=400,
            target in 1u64..=200_000,
            bytes_per_pixel in 0.01f32..4.0,
            honors_quality in any::<bool>(),
        ) {
            let img = image(width, height);
            let req = EncodingRequest::new(target, OutputFormat::Jpeg);
            let policy = SearchPolicy::unguarded();
            let mut search = TargetSearch::new(&img, &req, &policy, honors_quality).unwrap();

            let mut count = 0;
            while let Some(trial) = search.next_trial() {
                let area = (trial.width * trial.height) as f32;
                let size = (area * bytes_per_pixel * (0.2 + trial.quality)) as usize;
                search.record(vec![0u8; size]);
                count += 1;
                prop_assert!(count <= policy.trial_budget());
            }

            match search.finish() {
                Ok(result) => prop_assert!(result.size() as u64 <= target),
                Err(SearchError::TargetUnattainable { closest, .. }) => {
                    prop_assert!(closest.is_some_and(|c| c.size as u64 > target));
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }
    }
}
