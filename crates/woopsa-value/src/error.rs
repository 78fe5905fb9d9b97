use thiserror::Error;

use crate::kind::ValueKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A value could not be coerced to the requested primitive type.
    #[error("cannot cast {from} to {to}")]
    Cast { from: String, to: String },
    /// An accessor was used on a [`crate::JsonVariant`] of the wrong shape.
    #[error("{0}")]
    InvalidOperation(&'static str),
    #[error("key {0:?} not found")]
    MissingKey(String),
    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid {kind} text: {text:?}")]
    Parse { kind: ValueKind, text: String },
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl ValueError {
    pub(crate) fn cast(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Cast {
            from: from.into(),
            to: to.into(),
        }
    }

    pub(crate) fn parse(kind: ValueKind, text: &str) -> Self {
        Self::Parse {
            kind,
            text: text.to_string(),
        }
    }
}
