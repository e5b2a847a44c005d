//! Raw value coercion and the canonical text encoding of snapshot values.

use crate::types::ParamValue;

/// Coerce a raw parameter value string, trying in order:
///
/// 1. a single finite float whose canonical form equals the trimmed input,
/// 2. a whitespace-separated sequence where every token is a finite float,
/// 3. text, with one symmetric surrounding quote pair removed.
pub fn coerce_value(raw: &str) -> ParamValue {
    let trimmed = raw.trim();

    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && f.to_string() == trimmed {
            return ParamValue::Float(f);
        }
    }

    if trimmed.split_whitespace().nth(1).is_some() {
        let floats: Option<Vec<f64>> = trimmed
            .split_whitespace()
            .map(|token| token.parse::<f64>().ok().filter(|f| f.is_finite()))
            .collect();
        if let Some(seq) = floats {
            return ParamValue::FloatSeq(seq);
        }
    }

    ParamValue::Text(strip_symmetric_quotes(trimmed).to_string())
}

/// Canonical text encoding persisted into parameter snapshots: floats via
/// `to_string`, sequences JSON-encoded, text JSON-quoted.
pub fn canonical_text(value: &ParamValue) -> String {
    match value {
        ParamValue::Float(f) => f.to_string(),
        ParamValue::FloatSeq(seq) => {
            serde_json::to_string(seq).unwrap_or_else(|_| "[]".to_string())
        }
        ParamValue::Text(s) => serde_json::Value::String(s.clone()).to_string(),
    }
}

fn strip_symmetric_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &s[1..s.len() - 1];
        }
    }
    s
}
