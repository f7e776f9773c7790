use serde::{Deserialize, Serialize};

use super::{SearchError, SearchPolicy};
use crate::decode::{fit_to_width, DecodedImage};
use crate::encode::OutputFormat;

/// What the caller wants out of one target-size encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingRequest {
    /// Output size ceiling in bytes.
    pub target_bytes: u64,
    /// Optional one-time downscale cap applied before the search.
    #[serde(default)]
    pub max_width: Option<u32>,
    #[serde(default)]
    pub format: OutputFormat,
}

impl EncodingRequest {
    pub fn new(target_bytes: u64, format: OutputFormat) -> Self {
        Self {
            target_bytes,
            max_width: None,
            format,
        }
    }

    /// Target given in kilobytes (1 KB = 1024 bytes).
    pub fn from_kb(target_kb: u32, format: OutputFormat) -> Self {
        Self::new(u64::from(target_kb) * 1024, format)
    }

    pub fn with_max_width(mut self, max_width: u32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    /// Target rounded down to whole kilobytes, as used in file names.
    pub fn target_kb(&self) -> u64 {
        self.target_bytes / 1024
    }

    /// Dimensions the search starts from.
    pub fn working_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        match self.max_width {
            Some(max_width) => fit_to_width(width, height, max_width),
            None => (width, height),
        }
    }

    /// Check the request against the source image and policy.
    pub fn validate(&self, image: &DecodedImage, policy: &SearchPolicy) -> Result<(), SearchError> {
        if image.width == 0 || image.height == 0 {
            return Err(SearchError::InvalidRequest(format!(
                "image dimensions must be non-zero, got {}x{}",
                image.width, image.height
            )));
        }

        if !image.is_consistent() {
            return Err(SearchError::InvalidRequest(format!(
                "pixel buffer holds {} bytes, {}x{} RGB needs {}",
                image.pixels.len(),
                image.width,
                image.height,
                DecodedImage::expected_len(image.width, image.height)
            )));
        }

        if self.target_bytes == 0 {
            return Err(SearchError::InvalidRequest(
                "target size must be positive".to_string(),
            ));
        }

        if self.target_bytes < policy.min_target_bytes {
            return Err(SearchError::InvalidRequest(format!(
                "minimum target size is {} KB",
                policy.min_target_bytes / 1024
            )));
        }

        if self.max_width == Some(0) {
            return Err(SearchError::InvalidRequest(
                "max width must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
