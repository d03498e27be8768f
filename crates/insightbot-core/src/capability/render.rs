//! Formatting helpers for capability results and log previews.

use serde::Serialize;

use insightbot_types::error::CapabilityError;

/// Records beyond this count are dropped before results reach the model.
pub const MAX_RECORDS_FOR_MODEL: usize = 100;

/// Message returned to the model when a lookup produced nothing.
pub fn no_data(what: &str) -> String {
    format!("No data found for {what}.")
}

/// Serialize a result set for the model.
///
/// Empty sets become a `no_data` message. Large sets are cut to
/// [`MAX_RECORDS_FOR_MODEL`] and flagged as truncated with the full count.
pub fn render_records<T: Serialize>(what: &str, records: &[T]) -> Result<String, CapabilityError> {
    if records.is_empty() {
        return Ok(no_data(what));
    }

    let shown = &records[..records.len().min(MAX_RECORDS_FOR_MODEL)];
    let body = serde_json::json!({
        "count": records.len(),
        "truncated": shown.len() < records.len(),
        "records": shown,
    });
    serde_json::to_string(&body).map_err(|e| CapabilityError::Failed(e.to_string()))
}

/// Serialize a single value for the model.
pub fn render_value<T: Serialize>(value: &T) -> Result<String, CapabilityError> {
    serde_json::to_string(value).map_err(|e| CapabilityError::Failed(e.to_string()))
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
///
/// Counts characters, not bytes, so multi-byte text never splits mid-char.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
