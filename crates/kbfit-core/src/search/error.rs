use serde::Serialize;
use thiserror::Error;

use crate::encode::EncodeError;

/// Statistics of one compressed candidate, without its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateStats {
    pub quality: f32,
    pub width: u32,
    pub height: u32,
    pub size: usize,
}

/// Why a target-size search did not produce a result.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad dimensions, target or policy. Reported immediately, never retried.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The codec failed to render or compress a candidate.
    #[error("Codec failure: {0}")]
    CodecFailure(#[from] EncodeError),

    /// The trial budget ran out without any candidate fitting the ceiling.
    ///
    /// `closest` is the smallest candidate produced, which lets a caller
    /// suggest how far the target or max width needs to move.
    #[error("Target of {target_bytes} bytes is unattainable within the search budget")]
    TargetUnattainable {
        target_bytes: u64,
        closest: Option<CandidateStats>,
    },

    /// The caller cancelled the search between trials.
    #[error("Search cancelled")]
    Cancelled,
}

impl SearchError {
    /// Stable name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::InvalidRequest(_) => "InvalidRequest",
            SearchError::CodecFailure(_) => "CodecFailure",
            SearchError::TargetUnattainable { .. } => "TargetUnattainable",
            SearchError::Cancelled => "Cancelled",
        }
    }
}
