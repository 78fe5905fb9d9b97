//! Shared numeric coercion used by `WireValue` and `JsonVariant`.

use serde_json::Value;

use crate::error::ValueError;
use crate::format::parse_f64;

/// An intermediate numeric reading of a scalar, before narrowing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    pub(crate) fn from_text(text: &str) -> Option<Numeric> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i128>() {
            return Some(Numeric::Int(i));
        }
        parse_f64(text).ok().map(Numeric::Float)
    }

    /// Reads a JSON scalar. Booleans count as 0/1 and null as 0, matching the
    /// general-purpose conversion rules of host runtimes.
    pub(crate) fn from_json(value: &Value) -> Option<Numeric> {
        match value {
            Value::Null => Some(Numeric::Int(0)),
            Value::Bool(b) => Some(Numeric::Int(*b as i128)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Numeric::Int(i as i128))
                } else if let Some(u) = n.as_u64() {
                    Some(Numeric::Int(u as i128))
                } else {
                    n.as_f64().map(Numeric::Float)
                }
            }
            Value::String(s) => Numeric::from_text(s),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub(crate) fn to_int<T>(self, from: &str, to: &str) -> Result<T, ValueError>
    where
        T: TryFrom<i128>,
    {
        let wide = match self {
            Numeric::Int(i) => i,
            Numeric::Float(f) => {
                let r = f.round_ties_even();
                // i128 covers every target width; anything outside is an overflow.
                if !r.is_finite() || r.abs() >= 1.0e38 {
                    return Err(ValueError::cast(from, to));
                }
                r as i128
            }
        };
        T::try_from(wide).map_err(|_| ValueError::cast(from, to))
    }

    pub(crate) fn to_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Float(f) => f,
        }
    }
}

/// Short label of a JSON value's shape, used in cast errors.
pub(crate) fn json_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
