//! Source format tags and conversion rules.

use crate::error::CoreError;

/// The only format the generation service accepts.
pub const CANONICAL_FORMAT: &str = "pdf";

/// MIME type of [`CANONICAL_FORMAT`] documents.
pub const CANONICAL_MIME_TYPE: &str = "application/pdf";

/// Longest accepted format tag.
const MAX_FORMAT_LEN: usize = 10;

/// Normalize a client-supplied format tag.
///
/// Trims whitespace, drops a leading `.`, lowercases. The result must be
/// 1..=10 ASCII alphanumeric characters, since it ends up in scratch file
/// names during conversion.
pub fn normalize_format(raw: &str) -> Result<String, CoreError> {
    let tag = raw.trim().trim_start_matches('.').to_ascii_lowercase();

    if tag.is_empty() {
        return Err(CoreError::Validation("Format must not be empty".into()));
    }
    if tag.len() > MAX_FORMAT_LEN {
        return Err(CoreError::Validation(format!(
            "Format '{tag}' exceeds {MAX_FORMAT_LEN} characters"
        )));
    }
    if !tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CoreError::Validation(format!(
            "Format '{tag}' must be alphanumeric"
        )));
    }
    Ok(tag)
}

/// Whether a (normalized) format needs the conversion step.
pub fn needs_conversion(format: &str) -> bool {
    !format.eq_ignore_ascii_case(CANONICAL_FORMAT)
}
