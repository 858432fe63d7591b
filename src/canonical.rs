//! Canonical JSON emission.

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize `value` as JCS (RFC 8785) canonical JSON.
///
/// Keys are sorted and whitespace is removed, so equal values always produce
/// identical bytes.
///
/// # Errors
///
/// Returns an error if `value` cannot be represented as JSON.
pub fn emit_jcs<T: Serialize>(value: &T) -> Result<String> {
    let json_value = serde_json::to_value(value).context("Failed to serialize value to JSON")?;
    let json_bytes = serde_json_canonicalizer::to_vec(&json_value)
        .context("Failed to canonicalize JSON using JCS")?;
    String::from_utf8(json_bytes).context("JCS output contained invalid UTF-8")
}
