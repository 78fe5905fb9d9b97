//! Conversion between host-native values and wire values.
//!
//! A [`ConverterRegistry`] resolves one [`ValueConverter`] per
//! `(NativeType, ValueKind)` pair. Custom converters registered by the caller
//! take precedence over the [`BuiltinConverter`], which handles every
//! non-custom native type.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use woopsa_value::{ValueKind, WireData, WireValue};

use crate::error::AdapterError;
use crate::native::{NativeType, NativeValue};

pub trait ValueConverter: Send + Sync {
    fn to_wire(
        &self,
        value: NativeValue,
        kind: ValueKind,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<WireValue, AdapterError>;

    fn from_wire(&self, value: &WireValue, native: NativeType) -> Result<NativeValue, AdapterError>;
}

/// Numeric, text, date and JSON conversions for the built-in native types.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConverter;

impl BuiltinConverter {
    /// The kind a native type is published as when nothing overrides it.
    pub fn default_kind(native: NativeType) -> Option<ValueKind> {
        Some(match native {
            NativeType::Void => ValueKind::Null,
            NativeType::Bool => ValueKind::Logical,
            NativeType::I8
            | NativeType::I16
            | NativeType::I32
            | NativeType::I64
            | NativeType::U8
            | NativeType::U16
            | NativeType::U32
            | NativeType::U64 => ValueKind::Integer,
            NativeType::F32 | NativeType::F64 => ValueKind::Real,
            NativeType::String => ValueKind::Text,
            NativeType::DateTime => ValueKind::DateTime,
            NativeType::TimeSpan => ValueKind::TimeSpan,
            NativeType::Json => ValueKind::JsonData,
            NativeType::Custom(_) => return None,
        })
    }
}

fn natural_data(value: NativeValue) -> Result<WireData, AdapterError> {
    Ok(match value {
        NativeValue::Void => WireData::Null,
        NativeValue::Bool(v) => v.into(),
        NativeValue::I8(v) => v.into(),
        NativeValue::I16(v) => v.into(),
        NativeValue::I32(v) => v.into(),
        NativeValue::I64(v) => v.into(),
        NativeValue::U8(v) => v.into(),
        NativeValue::U16(v) => v.into(),
        NativeValue::U32(v) => v.into(),
        NativeValue::U64(v) => v.into(),
        NativeValue::F32(v) => v.into(),
        NativeValue::F64(v) => v.into(),
        NativeValue::String(v) => v.into(),
        NativeValue::DateTime(v) => v.into(),
        NativeValue::TimeSpan(v) => v.into(),
        NativeValue::Json(v) => WireData::Json(v.into()),
        NativeValue::Custom(_) => return Err(AdapterError::cast("custom", "wire value")),
    })
}

impl ValueConverter for BuiltinConverter {
    fn to_wire(
        &self,
        value: NativeValue,
        kind: ValueKind,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<WireValue, AdapterError> {
        let data = natural_data(value)?;
        if data == WireData::Null || data.natural_kind() == kind {
            return Ok(WireValue::new(data, kind)?.with_timestamp(timestamp));
        }
        let natural_kind = data.natural_kind();
        let natural = WireValue::new(data, natural_kind)?;
        let coerced: WireData = match kind {
            ValueKind::Null => WireData::Null,
            ValueKind::Logical => natural.to_bool()?.into(),
            ValueKind::Integer => natural.to_i64()?.into(),
            ValueKind::Real => natural.to_f64()?.into(),
            ValueKind::DateTime => natural.to_date_time()?.into(),
            ValueKind::TimeSpan => natural.to_time_span()?.into(),
            ValueKind::Text => natural.as_text().into(),
            ValueKind::JsonData => natural.to_json_data()?.into(),
        };
        Ok(WireValue::new(coerced, kind)?.with_timestamp(timestamp))
    }

    fn from_wire(&self, value: &WireValue, native: NativeType) -> Result<NativeValue, AdapterError> {
        Ok(match native {
            NativeType::Void => NativeValue::Void,
            NativeType::Bool => NativeValue::Bool(value.to_bool()?),
            NativeType::I8 => NativeValue::I8(value.to_i8()?),
            NativeType::I16 => NativeValue::I16(value.to_i16()?),
            NativeType::I32 => NativeValue::I32(value.to_i32()?),
            NativeType::I64 => NativeValue::I64(value.to_i64()?),
            NativeType::U8 => NativeValue::U8(value.to_u8()?),
            NativeType::U16 => NativeValue::U16(value.to_u16()?),
            NativeType::U32 => NativeValue::U32(value.to_u32()?),
            NativeType::U64 => NativeValue::U64(value.to_u64()?),
            NativeType::F32 => NativeValue::F32(value.to_f32()?),
            NativeType::F64 => NativeValue::F64(value.to_f64()?),
            NativeType::String => NativeValue::String(value.as_text()),
            NativeType::DateTime => NativeValue::DateTime(value.to_date_time()?),
            NativeType::TimeSpan => NativeValue::TimeSpan(value.to_time_span()?),
            NativeType::Json => NativeValue::Json(value.to_json_data()?.into_value()),
            NativeType::Custom(_) => {
                return Err(AdapterError::NoConverter {
                    native: native.name(),
                    kind: value.kind(),
                })
            }
        })
    }
}

/// Resolves converters per `(NativeType, ValueKind)`.
pub struct ConverterRegistry {
    custom: HashMap<(NativeType, ValueKind), Arc<dyn ValueConverter>>,
    default_kinds: HashMap<NativeType, ValueKind>,
    builtin: Arc<dyn ValueConverter>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("default_kinds", &self.default_kinds)
            .finish()
    }
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self {
            custom: HashMap::new(),
            default_kinds: HashMap::new(),
            builtin: Arc::new(BuiltinConverter),
        }
    }

    /// Registers a converter for `native` published as `kind`. The first
    /// registration for a native type also makes `kind` its default kind.
    pub fn register(
        &mut self,
        native: NativeType,
        kind: ValueKind,
        converter: impl ValueConverter + 'static,
    ) -> &mut Self {
        self.default_kinds.entry(native).or_insert(kind);
        self.custom.insert((native, kind), Arc::new(converter));
        self
    }

    pub fn with(
        mut self,
        native: NativeType,
        kind: ValueKind,
        converter: impl ValueConverter + 'static,
    ) -> Self {
        self.register(native, kind, converter);
        self
    }

    pub fn default_kind(&self, native: NativeType) -> Option<ValueKind> {
        self.default_kinds
            .get(&native)
            .copied()
            .or_else(|| BuiltinConverter::default_kind(native))
    }

    pub fn resolve(&self, native: NativeType, kind: ValueKind) -> Option<Arc<dyn ValueConverter>> {
        if let Some(converter) = self.custom.get(&(native, kind)) {
            return Some(Arc::clone(converter));
        }
        match native {
            NativeType::Custom(_) => None,
            _ => Some(Arc::clone(&self.builtin)),
        }
    }

    pub fn to_wire(
        &self,
        native: NativeType,
        value: NativeValue,
        kind: ValueKind,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<WireValue, AdapterError> {
        self.resolve(native, kind)
            .ok_or(AdapterError::NoConverter {
                native: native.name(),
                kind,
            })?
            .to_wire(value, kind, timestamp)
    }

    pub fn from_wire(
        &self,
        value: &WireValue,
        native: NativeType,
        kind: ValueKind,
    ) -> Result<NativeValue, AdapterError> {
        self.resolve(native, kind)
            .ok_or(AdapterError::NoConverter {
                native: native.name(),
                kind,
            })?
            .from_wire(value, native)
    }
}
