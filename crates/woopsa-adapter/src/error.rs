use thiserror::Error;
use woopsa_value::{ValueError, ValueKind};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdapterError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("cannot convert {from} to {to}")]
    Cast { from: String, to: String },
    #[error("no converter for native type {native} as {kind}")]
    NoConverter { native: &'static str, kind: ValueKind },
    #[error("target is not a {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("property {0} is read-only")]
    ReadOnly(String),
    #[error("{0} has no target object")]
    NoTarget(String),
    #[error("method {method} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },
    #[error("method {method} cannot be published: {reason}")]
    Unsupported { method: String, reason: String },
    #[error("adapter node was disposed")]
    Disposed,
    /// Failure reported by a host accessor.
    #[error("{0}")]
    Host(String),
}

impl AdapterError {
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host(message.into())
    }

    pub(crate) fn cast(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::Cast {
            from: from.into(),
            to: to.into(),
        }
    }
}
