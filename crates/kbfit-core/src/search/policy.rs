//! Tuning constants of the target-size search.

use serde::{Deserialize, Serialize};

use super::SearchError;
use crate::decode::FilterType;

/// Upper bound on bisection steps; beyond this the quality window is far
/// below the codec's granularity.
pub const MAX_BISECT_ITERATIONS: u32 = 32;

/// Upper bound on dimension fallback steps.
pub const MAX_FALLBACK_STEPS: u32 = 64;

/// Search configuration.
///
/// None of these values is required for correctness; they trade encode
/// count against how close the result lands to the ceiling. Deserialises
/// from a partial object, taking defaults for missing fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchPolicy {
    /// Smallest accepted target in bytes (`0` disables the check).
    pub min_target_bytes: u64,
    /// Quality of the first encode.
    pub probe_quality: f32,
    /// Lower end of the bisection window.
    pub min_quality: f32,
    /// Upper end of the bisection window.
    pub max_quality: f32,
    /// Fixed number of bisection encodes.
    pub bisect_iterations: u32,
    /// Quality used after each fallback shrink.
    pub fallback_quality: f32,
    /// Per-step dimension multiplier of the fallback.
    pub shrink_factor: f32,
    /// Maximum number of fallback shrinks.
    pub fallback_steps: u32,
    /// Width the fallback will not shrink below.
    pub fallback_floor_width: Option<u32>,
    /// Resampling filter for rendering the working canvas.
    pub filter: FilterType,
}

impl Default for SearchPolicy {
    fn default() -> Self {
        Self {
            min_target_bytes: 20 * 1024,
            probe_quality: 0.95,
            min_quality: 0.05,
            max_quality: 0.95,
            bisect_iterations: 12,
            fallback_quality: 0.7,
            shrink_factor: 0.9,
            fallback_steps: 6,
            fallback_floor_width: None,
            filter: FilterType::Bilinear,
        }
    }
}

impl SearchPolicy {
    /// Policy without the minimum-target usability guard.
    pub fn unguarded() -> Self {
        Self {
            min_target_bytes: 0,
            ..Self::default()
        }
    }

    /// Maximum number of compress calls one search can make.
    pub fn trial_budget(&self) -> u32 {
        1 + self.bisect_iterations + self.fallback_steps
    }

    /// Reject configurations the search cannot run with.
    pub fn validate(&self) -> Result<(), SearchError> {
        let unit = |name: &str, value: f32| -> Result<(), SearchError> {
            if value.is_finite() && value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(SearchError::InvalidRequest(format!(
                    "{name} must be in (0, 1], got {value}"
                )))
            }
        };

        unit("probeQuality", self.probe_quality)?;
        unit("minQuality", self.min_quality)?;
        unit("maxQuality", self.max_quality)?;
        unit("fallbackQuality", self.fallback_quality)?;

        if self.min_quality >= self.max_quality {
            return Err(SearchError::InvalidRequest(format!(
                "minQuality ({}) must be below maxQuality ({})",
                self.min_quality, self.max_quality
            )));
        }

        if !(self.shrink_factor.is_finite() && self.shrink_factor > 0.0 && self.shrink_factor < 1.0)
        {
            return Err(SearchError::InvalidRequest(format!(
                "shrinkFactor must be in (0, 1), got {}",
                self.shrink_factor
            )));
        }

        if self.bisect_iterations > MAX_BISECT_ITERATIONS {
            return Err(SearchError::InvalidRequest(format!(
                "bisectIterations must be at most {MAX_BISECT_ITERATIONS}, got {}",
                self.bisect_iterations
            )));
        }

        if self.fallback_steps > MAX_FALLBACK_STEPS {
            return Err(SearchError::InvalidRequest(format!(
                "fallbackSteps must be at most {MAX_FALLBACK_STEPS}, got {}",
                self.fallback_steps
            )));
        }

        if self.fallback_floor_width == Some(0) {
            return Err(SearchError::InvalidRequest(
                "fallbackFloorWidth must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
