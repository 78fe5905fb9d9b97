//! Protocol value kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// The fixed set of value types the protocol can transmit.
///
/// Integer and real widths are carried by [`crate::WireData`]; on the wire
/// all widths share the `Integer` / `Real` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Logical,
    Integer,
    Real,
    DateTime,
    TimeSpan,
    Text,
    JsonData,
}

impl ValueKind {
    pub const ALL: [ValueKind; 8] = [
        ValueKind::Null,
        ValueKind::Logical,
        ValueKind::Integer,
        ValueKind::Real,
        ValueKind::DateTime,
        ValueKind::TimeSpan,
        ValueKind::Text,
        ValueKind::JsonData,
    ];

    /// Protocol name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Logical => "Logical",
            Self::Integer => "Integer",
            Self::Real => "Real",
            Self::DateTime => "DateTime",
            Self::TimeSpan => "TimeSpan",
            Self::Text => "Text",
            Self::JsonData => "JsonData",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValueError::cast(s, "ValueKind"))
    }
}
