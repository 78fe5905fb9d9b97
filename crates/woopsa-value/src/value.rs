//! WireValue — an immutable typed value as published by a property or method.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::{json, Map, Value};

use crate::error::ValueError;
use crate::format::{
    format_bool, format_date_time, format_f32, format_f64, format_time_span, parse_bool,
    parse_date_time, parse_f64, parse_time_span, time_span_from_seconds, time_span_seconds,
};
use crate::json_data::JsonVariant;
use crate::kind::ValueKind;
use crate::numeric::Numeric;

/// Payload of a [`WireValue`], keeping the native width of numbers.
#[derive(Debug, Clone, PartialEq)]
pub enum WireData {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Text(String),
    DateTime(DateTime<Utc>),
    TimeSpan(TimeDelta),
    Json(JsonVariant),
}

impl WireData {
    /// The kind this payload is published under.
    pub fn natural_kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Logical,
            Self::I8(_)
            | Self::I16(_)
            | Self::I32(_)
            | Self::I64(_)
            | Self::U8(_)
            | Self::U16(_)
            | Self::U32(_)
            | Self::U64(_) => ValueKind::Integer,
            Self::F32(_) | Self::F64(_) => ValueKind::Real,
            Self::Text(_) => ValueKind::Text,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::TimeSpan(_) => ValueKind::TimeSpan,
            Self::Json(_) => ValueKind::JsonData,
        }
    }

    /// Name of the payload type, used in cast errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::Text(_) => "Text",
            Self::DateTime(_) => "DateTime",
            Self::TimeSpan(_) => "TimeSpan",
            Self::Json(_) => "JsonData",
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        Some(match self {
            Self::I8(v) => Numeric::Int(*v as i128),
            Self::I16(v) => Numeric::Int(*v as i128),
            Self::I32(v) => Numeric::Int(*v as i128),
            Self::I64(v) => Numeric::Int(*v as i128),
            Self::U8(v) => Numeric::Int(*v as i128),
            Self::U16(v) => Numeric::Int(*v as i128),
            Self::U32(v) => Numeric::Int(*v as i128),
            Self::U64(v) => Numeric::Int(*v as i128),
            Self::F32(v) => Numeric::Float(*v as f64),
            Self::F64(v) => Numeric::Float(*v),
            Self::Text(t) => return Numeric::from_text(t),
            Self::Json(j) if j.is_simple() => return Numeric::from_json(j.as_value()),
            _ => return None,
        })
    }
}

macro_rules! wire_data_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for WireData {
                fn from(v: $t) -> Self {
                    WireData::$variant(v)
                }
            }
        )*
    };
}

wire_data_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => Text,
    DateTime<Utc> => DateTime,
    TimeDelta => TimeSpan,
    JsonVariant => Json,
);

impl From<&str> for WireData {
    fn from(v: &str) -> Self {
        WireData::Text(v.to_string())
    }
}

/// An immutable protocol value with an optional capture timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct WireValue {
    kind: ValueKind,
    data: WireData,
    timestamp: Option<DateTime<Utc>>,
}

macro_rules! int_coercions {
    ($($name:ident => $t:ty),* $(,)?) => {
        $(
            pub fn $name(&self) -> Result<$t, ValueError> {
                self.numeric(stringify!($t))?
                    .to_int(self.data.label(), stringify!($t))
            }
        )*
    };
}

impl WireValue {
    /// Builds a value of an explicit kind.
    ///
    /// # Errors
    ///
    /// `Cast` when the payload is not of the requested kind.
    pub fn new(data: impl Into<WireData>, kind: ValueKind) -> Result<Self, ValueError> {
        let data = data.into();
        if data.natural_kind() != kind && data != WireData::Null {
            return Err(ValueError::cast(data.label(), kind.as_str()));
        }
        Ok(Self {
            kind,
            data,
            timestamp: None,
        })
    }

    pub fn null() -> Self {
        Self {
            kind: ValueKind::Null,
            data: WireData::Null,
            timestamp: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ValueKind::Text,
            data: WireData::Text(text.into()),
            timestamp: None,
        }
    }

    pub fn json(data: JsonVariant) -> Self {
        Self {
            kind: ValueKind::JsonData,
            data: WireData::Json(data),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: Option<DateTime<Utc>>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Decodes canonical protocol text into a value of `kind`.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self, ValueError> {
        let data = match kind {
            ValueKind::Null => WireData::Null,
            ValueKind::Logical => WireData::Bool(parse_bool(text)?),
            ValueKind::Integer => {
                let t = text.trim();
                if let Ok(i) = t.parse::<i64>() {
                    WireData::I64(i)
                } else {
                    WireData::U64(t.parse::<u64>().map_err(|_| ValueError::parse(kind, text))?)
                }
            }
            ValueKind::Real => WireData::F64(parse_f64(text)?),
            ValueKind::DateTime => WireData::DateTime(parse_date_time(text)?),
            ValueKind::TimeSpan => WireData::TimeSpan(parse_time_span(text)?),
            ValueKind::Text => WireData::Text(text.to_string()),
            ValueKind::JsonData => WireData::Json(JsonVariant::from_text(text)?),
        };
        Ok(Self {
            kind,
            data,
            timestamp: None,
        })
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn data(&self) -> &WireData {
        &self.data
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn is_null(&self) -> bool {
        self.data == WireData::Null
    }

    /// Canonical protocol text of the value.
    pub fn as_text(&self) -> String {
        match &self.data {
            WireData::Null => String::new(),
            WireData::Bool(b) => format_bool(*b).to_string(),
            WireData::I8(v) => v.to_string(),
            WireData::I16(v) => v.to_string(),
            WireData::I32(v) => v.to_string(),
            WireData::I64(v) => v.to_string(),
            WireData::U8(v) => v.to_string(),
            WireData::U16(v) => v.to_string(),
            WireData::U32(v) => v.to_string(),
            WireData::U64(v) => v.to_string(),
            WireData::F32(v) => format_f32(*v),
            WireData::F64(v) => format_f64(*v),
            WireData::Text(t) => t.clone(),
            WireData::DateTime(dt) => format_date_time(dt),
            WireData::TimeSpan(ts) => format_time_span(ts),
            WireData::Json(j) => j.as_text().to_string(),
        }
    }

    pub fn to_bool(&self) -> Result<bool, ValueError> {
        match &self.data {
            WireData::Bool(b) => Ok(*b),
            WireData::Text(t) => parse_bool(t).map_err(|_| ValueError::cast("Text", "bool")),
            WireData::Json(j) => j.to_bool(),
            other => Err(ValueError::cast(other.label(), "bool")),
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

    pub fn to_date_time(&self) -> Result<DateTime<Utc>, ValueError> {
        match &self.data {
            WireData::DateTime(dt) => Ok(*dt),
            WireData::Text(t) => parse_date_time(t),
            WireData::Json(j) if j.is_simple() => parse_date_time(j.as_text()),
            other => Err(ValueError::cast(other.label(), "DateTime")),
        }
    }

    pub fn to_time_span(&self) -> Result<TimeDelta, ValueError> {
        match &self.data {
            WireData::TimeSpan(ts) => Ok(*ts),
            WireData::Text(t) => parse_time_span(t),
            other => {
                let seconds = other
                    .numeric()
                    .ok_or_else(|| ValueError::cast(other.label(), "TimeSpan"))?
                    .to_f64();
                time_span_from_seconds(seconds)
                    .ok_or_else(|| ValueError::cast(other.label(), "TimeSpan"))
            }
        }
    }

    /// The value as JSON data: JSON payloads as-is, text parsed as JSON,
    /// other scalars wrapped.
    pub fn to_json_data(&self) -> Result<JsonVariant, ValueError> {
        match &self.data {
            WireData::Json(j) => Ok(j.clone()),
            WireData::Text(t) => JsonVariant::from_text(t),
            _ => Ok(JsonVariant::from_value(self.json_value())),
        }
    }

    /// The protocol's JSON representation: `{"Value", "Type", "TimeStamp"?}`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("Value".to_string(), self.json_value());
        map.insert("Type".to_string(), json!(self.kind.as_str()));
        if let Some(ts) = &self.timestamp {
            map.insert("TimeStamp".to_string(), json!(format_date_time(ts)));
        }
        Value::Object(map)
    }

    fn json_value(&self) -> Value {
        match &self.data {
            WireData::Null => Value::Null,
            WireData::Bool(b) => json!(b),
            WireData::I8(v) => json!(v),
            WireData::I16(v) => json!(v),
            WireData::I32(v) => json!(v),
            WireData::I64(v) => json!(v),
            WireData::U8(v) => json!(v),
            WireData::U16(v) => json!(v),
            WireData::U32(v) => json!(v),
            WireData::U64(v) => json!(v),
            // Non-finite reals have no JSON number form; they travel as text.
            WireData::F32(v) if v.is_finite() => json!(v),
            WireData::F64(v) if v.is_finite() => json!(v),
            WireData::TimeSpan(ts) => json!(time_span_seconds(ts)),
            WireData::Json(j) => j.as_value().clone(),
            _ => Value::String(self.as_text()),
        }
    }

    fn numeric(&self, to: &str) -> Result<Numeric, ValueError> {
        self.data
            .numeric()
            .ok_or_else(|| ValueError::cast(self.data.label(), to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_requires_matching_kind() {
        assert!(WireValue::new(1i32, ValueKind::Integer).is_ok());
        assert!(WireValue::new(1.5f32, ValueKind::Real).is_ok());
        assert_eq!(
            WireValue::new(1i32, ValueKind::Real),
            Err(ValueError::Cast {
                from: "i32".into(),
                to: "Real".into()
            })
        );
        assert!(WireValue::new(WireData::Null, ValueKind::Text).is_ok());
    }

    #[test]
    fn test_integer_coercions_are_range_checked() {
        let v = WireValue::new(300i32, ValueKind::Integer).unwrap();
        assert_eq!(v.to_i16().unwrap(), 300);
        assert!(v.to_u8().is_err());
        assert_eq!(v.to_f64().unwrap(), 300.0);
        let r = WireValue::new(2.5f64, ValueKind::Real).unwrap();
        assert_eq!(r.to_i32().unwrap(), 2);
    }

    #[test]
    fn test_bool_never_coerces_to_number() {
        let v = WireValue::new(true, ValueKind::Logical).unwrap();
        assert!(matches!(v.to_i32(), Err(ValueError::Cast { .. })));
        assert!(v.to_bool().unwrap());
    }

    #[test]
    fn test_non_scalar_json_fails_cast() {
        let v = WireValue::json(JsonVariant::from_text("[1,2]").unwrap());
        assert_eq!(
            v.to_f64(),
            Err(ValueError::Cast {
                from: "JsonData".into(),
                to: "f64".into()
            })
        );
        let s = WireValue::json(JsonVariant::from_text("7").unwrap());
        assert_eq!(s.to_u32().unwrap(), 7);
    }

    #[test]
    fn test_parse_and_text_roundtrip() {
        let cases = [
            (ValueKind::Logical, "true"),
            (ValueKind::Integer, "-42"),
            (ValueKind::Integer, "18446744073709551615"),
            (ValueKind::Real, "0.1"),
            (ValueKind::DateTime, "2024-01-02T03:04:05.500Z"),
            (ValueKind::TimeSpan, "90"),
            (ValueKind::Text, "hello"),
            (ValueKind::JsonData, r#"{"a":1}"#),
        ];
        for (kind, text) in cases {
            let v = WireValue::parse(kind, text).unwrap();
            assert_eq!(v.kind(), kind);
            assert_eq!(v.as_text(), text);
        }
        assert!(WireValue::parse(ValueKind::Integer, "1.5").is_err());
    }

    #[test]
    fn test_wire_json_representation() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let v = WireValue::new(21.5f64, ValueKind::Real)
            .unwrap()
            .with_timestamp(Some(ts));
        assert_eq!(
            v.to_json(),
            json!({"Value": 21.5, "Type": "Real", "TimeStamp": "2024-01-01T00:00:00Z"})
        );
        let nan = WireValue::new(f64::NAN, ValueKind::Real).unwrap();
        assert_eq!(nan.to_json()["Value"], json!("NaN"));
        assert_eq!(WireValue::null().to_json(), json!({"Value": null, "Type": "Null"}));
    }

    #[test]
    fn test_time_span_from_numbers() {
        let v = WireValue::new(2.5f64, ValueKind::Real).unwrap();
        assert_eq!(v.to_time_span().unwrap(), TimeDelta::milliseconds(2500));
        let t = WireValue::text("0.5");
        assert_eq!(t.to_time_span().unwrap(), TimeDelta::milliseconds(500));
    }
}
