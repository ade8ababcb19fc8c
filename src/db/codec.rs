//! JSON-text codecs for list and map columns.
//!
//! Tags, field options and submission payloads are stored as serialized JSON
//! text. Encoding happens on write, decoding on read; the in-memory types stay
//! proper collections.

use crate::types::SubmissionData;
use anyhow::Result;

/// Encode a string list. Empty lists are stored as NULL.
pub fn encode_list(items: &[String]) -> Result<Option<String>> {
    if items.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(items)?))
}

/// Decode a string list column. NULL or malformed text decodes to an empty list.
pub fn decode_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

/// Decode an optional list column, keeping NULL distinct from an empty list.
pub fn decode_optional_list(raw: Option<String>) -> Option<Vec<String>> {
    raw.map(|s| serde_json::from_str(&s).unwrap_or_default())
}

pub fn encode_submission(data: &SubmissionData) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

/// Decode a submission payload.
pub fn decode_submission(raw: &str) -> serde_json::Result<SubmissionData> {
    serde_json::from_str(raw)
}
