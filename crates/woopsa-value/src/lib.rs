//! `woopsa-value` — the value model of the Woopsa protocol tree.
//!
//! Properties and method results travel as [`WireValue`]s: a typed payload
//! ([`WireData`]) published under one of the protocol's [`ValueKind`]s, with an
//! optional capture timestamp. Structured payloads use [`JsonVariant`], a
//! wrapper around a generic JSON value that is classified once (object, array
//! or scalar) and renders its text lazily.
//!
//! # Example
//!
//! ```
//! use woopsa_value::{JsonVariant, ValueKind, WireValue};
//!
//! let value = WireValue::new(21.5f64, ValueKind::Real).unwrap();
//! assert_eq!(value.as_text(), "21.5");
//! assert_eq!(value.to_f32().unwrap(), 21.5);
//!
//! let data = JsonVariant::from_text(r#"{"a": [1, 2, 3]}"#).unwrap();
//! assert!(data.is_dictionary());
//! assert_eq!(data.get("a").unwrap().len().unwrap(), 3);
//! ```

pub mod error;
pub mod format;
pub mod json_data;
pub mod kind;
mod numeric;
pub mod value;

pub use error::ValueError;
pub use json_data::{JsonShape, JsonVariant};
pub use kind::ValueKind;
pub use value::{WireData, WireValue};
