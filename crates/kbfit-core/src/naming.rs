//! Download file names and human-readable sizes.

use crate::encode::OutputFormat;

/// Base name used when the input has none.
pub const FALLBACK_BASENAME: &str = "image";

/// The one-shot operations, each with a fixed output name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Compress,
    Convert,
    Resize,
}

impl Operation {
    pub fn stem(self) -> &'static str {
        match self {
            Operation::Compress => "compressed",
            Operation::Convert => "converted",
            Operation::Resize => "resized",
        }
    }
}

/// Strip the last extension from a file name.
///
/// Only a trailing `.ext` without further dots or slashes is removed, so
/// `archive.tar.gz` becomes `archive.tar` and `dir.v2/photo` is untouched.
pub fn basename(input_name: &str) -> &str {
    match input_name.rfind('.') {
        Some(dot)
            if dot + 1 < input_name.len() && !input_name[dot + 1..].contains('/') =>
        {
            &input_name[..dot]
        }
        _ => input_name,
    }
}

/// `<basename>-<targetKB>kb.<ext>` for a target-size result.
pub fn target_filename(input_name: &str, target_kb: u64, format: OutputFormat) -> String {
    let base = basename(input_name.trim());
    let base = if base.is_empty() {
        FALLBACK_BASENAME
    } else {
        base
    };
    format!("{base}-{target_kb}kb.{}", format.extension())
}

/// Fixed name for a one-shot operation result, e.g. `resized.png`.
pub fn operation_filename(operation: Operation, format: OutputFormat) -> String {
    format!("{}.{}", operation.stem(), format.extension())
}

pub fn format_kb(bytes: usize) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

pub fn format_mb(bytes: usize) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Label shown for a freshly selected upload: the name, a dash and the size in MB.
pub fn file_info(name: &str, bytes: usize) -> String {
    format!("{name} \u{2014} {}", format_mb(bytes))
}
