//! Single-line StatsD encoder.
//!
//! `<prefix|statsd>.<name>[.<field>]:<value><suffix>[|@<rate>]\n`

use std::io::Write;

/// Used when no prefix is configured.
pub const FALLBACK_PREFIX: &str = "statsd";

/// A scalar that can appear after the `:` separator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Text(&'a str),
    Int(i64),
    Float(f64),
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value<'_> {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(v)
    }
}

/// Append one line to `out`.
///
/// Returns `false` and leaves `out` untouched when the value cannot be
/// rendered (NaN or infinite floats); the caller just moves on.
pub fn encode_line(
    out: &mut Vec<u8>,
    prefix: &str,
    name: &str,
    field: &str,
    value: Value<'_>,
    suffix: &str,
    rate: f32,
) -> bool {
    if let Value::Float(f) = value {
        if !f.is_finite() {
            return false;
        }
    }

    if prefix.is_empty() {
        out.extend_from_slice(FALLBACK_PREFIX.as_bytes());
    } else {
        out.extend_from_slice(prefix.as_bytes());
    }
    out.push(b'.');

    // `.` separates name from field downstream, so it cannot survive in a name.
    for b in name.bytes() {
        out.push(if b == b'.' { b'_' } else { b });
    }

    if !field.is_empty() {
        out.push(b'.');
        out.extend_from_slice(field.as_bytes());
    }
    out.push(b':');

    // Writes into a Vec cannot fail.
    let _ = match value {
        Value::Text(s) => out.write_all(s.as_bytes()),
        Value::Int(i) => write!(out, "{i}"),
        Value::Float(f) => write!(out, "{f}"),
    };

    out.extend_from_slice(suffix.as_bytes());

    if rate > 0.0 && rate < 1.0 {
        let _ = write!(out, "|@{rate:.6}");
    }

    out.push(b'\n');
    true
}
