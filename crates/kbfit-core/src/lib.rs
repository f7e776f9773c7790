//! kbfit Core - Bounded-size image re-encoding
//!
//! This crate provides the core functionality for kbfit: decoding uploaded
//! images, one-shot compress/convert/resize, and the target-size search that
//! finds the quality and dimensions at which an image fits a byte ceiling.

pub mod batch;
pub mod decode;
pub mod encode;
pub mod naming;
pub mod search;

pub use batch::{encode_batch, BatchReport};
pub use decode::{decode_image, DecodeError, DecodedImage, FilterType};
pub use encode::{Codec, EncodeError, EncodedImage, OutputFormat, RasterCodec};
pub use naming::{file_info, format_kb, format_mb, operation_filename, target_filename, Operation};
pub use search::{
    encode_to_target, CancelToken, CandidateStats, EncodingRequest, SearchError, SearchPolicy,
    SearchResult, Strategy, TargetSearch, TargetSizeEncoder,
};
