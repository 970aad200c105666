//! Canonical JSON bytes: the single serialization-for-hashing implementation.
//!
//! # Canonicalization rules
//!
//! 1. Object keys are sorted lexicographically (byte order).
//! 2. Compact form, no whitespace: `{"a":1,"b":2}`.
//! 3. Strings are escaped per RFC 8259 §7; non-ASCII passes through as UTF-8.
//! 4. Numbers must be integers (`i64` or `u64`). Floating-point values are
//!    rejected; costs and probabilities cross this boundary as fixed-point
//!    micro-units via [`to_micros`].
//! 5. `null`, `true`, `false` are written literally.

use std::fmt::Write as _;

use serde_json::Value;

/// Fixed-point scale for floating-point quantities in canonical JSON.
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Error type for canonical JSON serialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonError {
    /// A JSON number was not an integer.
    #[error("non-integer number in canonical JSON: {raw}")]
    NonIntegerNumber { raw: String },
}

/// Convert a finite float to fixed-point micro-units.
///
/// Returns `None` for infinite or NaN inputs (serialized as `null`) and for
/// magnitudes outside the `i64` range.
#[must_use]
pub fn to_micros(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * MICROS_PER_UNIT).round();
    #[allow(clippy::cast_precision_loss)]
    let in_range = scaled >= i64::MIN as f64 && scaled <= i64::MAX as f64;
    if !in_range {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(scaled as i64)
}

/// Produce canonical JSON bytes from a `serde_json::Value`.
///
/// # Errors
///
/// Returns [`CanonError::NonIntegerNumber`] if any number is not
/// representable as `i64` or `u64`.
pub fn canonical_json_bytes(value: &Value) -> Result<Vec<u8>, CanonError> {
    let mut out = String::new();
    emit(&mut out, value)?;
    Ok(out.into_bytes())
}

fn emit(out: &mut String, value: &Value) -> Result<(), CanonError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let _ = write!(out, "{i}");
            } else if let Some(u) = n.as_u64() {
                let _ = write!(out, "{u}");
            } else {
                return Err(CanonError::NonIntegerNumber { raw: n.to_string() });
            }
        }
        Value::String(s) => emit_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                emit(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                emit_string(out, key);
                out.push(':');
                emit(out, item)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn emit_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
