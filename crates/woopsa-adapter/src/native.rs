//! Host-native values as seen by the conversion layer.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use woopsa_value::ValueKind;

use crate::error::AdapterError;

/// A user-defined native type, identified by its `TypeId`.
#[derive(Debug, Clone, Copy)]
pub struct CustomType {
    id: TypeId,
    name: &'static str,
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CustomType {}

impl Hash for CustomType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// The native type of a property, argument or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    DateTime,
    TimeSpan,
    Json,
    Custom(CustomType),
}

impl NativeType {
    pub fn custom<T: 'static>() -> Self {
        NativeType::Custom(CustomType {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::TimeSpan => "TimeSpan",
            Self::Json => "Json",
            Self::Custom(c) => c.name,
        }
    }
}

/// A host value crossing the adapter boundary.
#[derive(Clone)]
pub enum NativeValue {
    Void,
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
    String(String),
    DateTime(DateTime<Utc>),
    TimeSpan(TimeDelta),
    Json(Value),
    Custom(Arc<dyn Any + Send + Sync>),
}

impl NativeValue {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        NativeValue::Custom(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            NativeValue::Custom(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Void => "void",
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
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::TimeSpan(_) => "TimeSpan",
            Self::Json(_) => "Json",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("Void"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::I8(v) => f.debug_tuple("I8").field(v).finish(),
            Self::I16(v) => f.debug_tuple("I16").field(v).finish(),
            Self::I32(v) => f.debug_tuple("I32").field(v).finish(),
            Self::I64(v) => f.debug_tuple("I64").field(v).finish(),
            Self::U8(v) => f.debug_tuple("U8").field(v).finish(),
            Self::U16(v) => f.debug_tuple("U16").field(v).finish(),
            Self::U32(v) => f.debug_tuple("U32").field(v).finish(),
            Self::U64(v) => f.debug_tuple("U64").field(v).finish(),
            Self::F32(v) => f.debug_tuple("F32").field(v).finish(),
            Self::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            Self::TimeSpan(v) => f.debug_tuple("TimeSpan").field(v).finish(),
            Self::Json(v) => f.debug_tuple("Json").field(v).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl PartialEq for NativeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::I8(a), Self::I8(b)) => a == b,
            (Self::I16(a), Self::I16(b)) => a == b,
            (Self::I32(a), Self::I32(b)) => a == b,
            (Self::I64(a), Self::I64(b)) => a == b,
            (Self::U8(a), Self::U8(b)) => a == b,
            (Self::U16(a), Self::U16(b)) => a == b,
            (Self::U32(a), Self::U32(b)) => a == b,
            (Self::U64(a), Self::U64(b)) => a == b,
            (Self::F32(a), Self::F32(b)) => a == b,
            (Self::F64(a), Self::F64(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::TimeSpan(a), Self::TimeSpan(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Rust types that cross the adapter boundary as a [`NativeValue`].
pub trait Native: Sized + Send + Sync + 'static {
    fn native_type() -> NativeType;
    fn into_native(self) -> NativeValue;
    fn from_native(value: NativeValue) -> Result<Self, AdapterError>;
}

macro_rules! native_impls {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl Native for $t {
                fn native_type() -> NativeType {
                    NativeType::$variant
                }
                fn into_native(self) -> NativeValue {
                    NativeValue::$variant(self)
                }
                fn from_native(value: NativeValue) -> Result<Self, AdapterError> {
                    match value {
                        NativeValue::$variant(v) => Ok(v),
                        other => Err(AdapterError::cast(other.label(), NativeType::$variant.name())),
                    }
                }
            }
        )*
    };
}

native_impls!(
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
    String => String,
    DateTime<Utc> => DateTime,
    TimeDelta => TimeSpan,
    Value => Json,
);

impl Native for () {
    fn native_type() -> NativeType {
        NativeType::Void
    }
    fn into_native(self) -> NativeValue {
        NativeValue::Void
    }
    fn from_native(_value: NativeValue) -> Result<Self, AdapterError> {
        Ok(())
    }
}

/// A declared method argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: String,
    pub native: NativeType,
    /// Published kind; resolved from the converter registry when `None`.
    pub kind: Option<ValueKind>,
}

impl Arg {
    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

pub fn arg<V: Native>(name: impl Into<String>) -> Arg {
    Arg {
        name: name.into(),
        native: V::native_type(),
        kind: None,
    }
}

/// Converted arguments handed to a method invoker.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<NativeValue>,
}

impl Args {
    pub fn new(values: Vec<NativeValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get<V: Native>(&self, index: usize) -> Result<V, AdapterError> {
        let value = self
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| AdapterError::host(format!("missing argument {index}")))?;
        V::from_native(value)
    }
}

/// `module::path::Name<Params>` → `Name<Params>`.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base_end = full.find('<').unwrap_or(full.len());
    let start = full[..base_end].rfind("::").map(|i| i + 2).unwrap_or(0);
    &full[start..]
}
