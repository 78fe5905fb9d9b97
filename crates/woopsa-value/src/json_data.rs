//! JsonVariant — a generic JSON value with keyed and indexed navigation.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;

use crate::error::ValueError;
use crate::format::{format_bool, format_f64, parse_bool};
use crate::numeric::{json_label, Numeric};

/// The shape of a [`JsonVariant`], fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Object,
    Array,
    Simple,
}

impl JsonShape {
    fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => JsonShape::Object,
            Value::Array(_) => JsonShape::Array,
            _ => JsonShape::Simple,
        }
    }
}

/// A deserialized JSON payload published as `JsonData`.
///
/// Objects and arrays render as JSON text; scalars render with the protocol's
/// primitive text rules (a string renders without quotes). The rendering is
/// computed on first use and cached.
#[derive(Debug, Clone)]
pub struct JsonVariant {
    data: Value,
    shape: JsonShape,
    text: OnceLock<String>,
}

macro_rules! int_coercions {
    ($($name:ident => $t:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> Result<$t, ValueError> {
                self.numeric(stringify!($t))?
                    .to_int(json_label(&self.data), stringify!($t))
            }
        )*
    };
}

impl JsonVariant {
    /// Parses JSON text. For objects and arrays the original text is kept as
    /// the rendering, so no re-serialization happens.
    pub fn from_text(text: &str) -> Result<Self, ValueError> {
        let data: Value =
            serde_json::from_str(text).map_err(|e| ValueError::Json(e.to_string()))?;
        let variant = Self::from_value(data);
        if variant.shape != JsonShape::Simple {
            let _ = variant.text.set(text.to_string());
        }
        Ok(variant)
    }

    pub fn from_value(data: Value) -> Self {
        Self {
            shape: JsonShape::of(&data),
            data,
            text: OnceLock::new(),
        }
    }

    pub fn shape(&self) -> JsonShape {
        self.shape
    }

    pub fn is_dictionary(&self) -> bool {
        self.shape == JsonShape::Object
    }

    pub fn is_array(&self) -> bool {
        self.shape == JsonShape::Array
    }

    pub fn is_simple(&self) -> bool {
        self.shape == JsonShape::Simple
    }

    pub fn as_value(&self) -> &Value {
        &self.data
    }

    pub fn into_value(self) -> Value {
        self.data
    }

    /// Keyed lookup.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if this is not an object
    /// - `MissingKey` if the object has no such key
    pub fn get(&self, key: &str) -> Result<JsonVariant, ValueError> {
        match &self.data {
            Value::Object(map) => map
                .get(key)
                .map(|v| JsonVariant::from_value(v.clone()))
                .ok_or_else(|| ValueError::MissingKey(key.to_string())),
            _ => Err(ValueError::InvalidOperation(
                "string indexer is only available on JsonVariant of type Object",
            )),
        }
    }

    /// Non-failing keyed lookup; `None` for a missing key or a non-object.
    pub fn try_get(&self, key: &str) -> Option<JsonVariant> {
        match &self.data {
            Value::Object(map) => map.get(key).map(|v| JsonVariant::from_value(v.clone())),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        matches!(&self.data, Value::Object(map) if map.contains_key(key))
    }

    /// Keys of an object; empty for every other shape.
    pub fn keys(&self) -> Vec<&str> {
        match &self.data {
            Value::Object(map) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn index(&self, index: usize) -> Result<JsonVariant, ValueError> {
        match &self.data {
            Value::Array(items) => items
                .get(index)
                .map(|v| JsonVariant::from_value(v.clone()))
                .ok_or(ValueError::IndexOutOfRange {
                    index,
                    len: items.len(),
                }),
            _ => Err(ValueError::InvalidOperation(
                "integer indexer is only available on JsonVariant of type Array",
            )),
        }
    }

    pub fn try_index(&self, index: usize) -> Option<JsonVariant> {
        match &self.data {
            Value::Array(items) => items.get(index).map(|v| JsonVariant::from_value(v.clone())),
            _ => None,
        }
    }

    pub fn len(&self) -> Result<usize, ValueError> {
        match &self.data {
            Value::Array(items) => Ok(items.len()),
            _ => Err(ValueError::InvalidOperation(
                "length is only available on JsonVariant of type Array",
            )),
        }
    }

    pub fn is_empty(&self) -> Result<bool, ValueError> {
        self.len().map(|n| n == 0)
    }

    /// The text rendering, computed once.
    pub fn as_text(&self) -> &str {
        self.text.get_or_init(|| match self.shape {
            JsonShape::Simple => scalar_text(&self.data),
            JsonShape::Object | JsonShape::Array => self.serialize(),
        })
    }

    /// JSON text of the payload regardless of shape (a string keeps its quotes).
    pub fn serialize(&self) -> String {
        self.data.to_string()
    }

    pub fn to_bool(&self) -> Result<bool, ValueError> {
        match &self.data {
            Value::Bool(b) => Ok(*b),
            Value::String(s) => parse_bool(s).map_err(|_| ValueError::cast("string", "bool")),
            other => Err(ValueError::cast(json_label(other), "bool")),
        }
    }

    int_coercions!(
        to_i8 => i8,
        to_i16 => i16,
        to_i32 => i32,
        to_i64 => i64,
        to_u8 => u8,
        to_u16 => u16,
        to_u32 => u32,
        to_u64 => u64,
    );

    pub fn to_f32(&self) -> Result<f32, ValueError> {
        Ok(self.numeric("f32")?.to_f64() as f32)
    }

    pub fn to_f64(&self) -> Result<f64, ValueError> {
        Ok(self.numeric("f64")?.to_f64())
    }

    fn numeric(&self, to: &str) -> Result<Numeric, ValueError> {
        if !self.is_simple() {
            return Err(ValueError::cast(json_label(&self.data), to));
        }
        Numeric::from_json(&self.data).ok_or_else(|| ValueError::cast(json_label(&self.data), to))
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => format_bool(*b).to_string(),
        Value::Number(n) if n.is_f64() => n.as_f64().map(format_f64).unwrap_or_default(),
        other => other.to_string(),
    }
}

impl PartialEq for JsonVariant {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Display for JsonVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_text())
    }
}

impl Serialize for JsonVariant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.data.serialize(serializer)
    }
}

impl From<Value> for JsonVariant {
    fn from(value: Value) -> Self {
        JsonVariant::from_value(value)
    }
}
