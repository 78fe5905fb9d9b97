use serde::{Deserialize, Serialize};

use crate::visibility::Visibility;

/// Adapter settings a transport can load from its own configuration file.
///
/// ```
/// use woopsa_adapter::{AdapterConfig, Visibility};
///
/// let config: AdapterConfig = serde_json::from_str(
///     r#"{ "default_visibility": "DEFAULT_IS_VISIBLE | OBJECT_COLLECTION" }"#,
/// )
/// .unwrap();
/// assert!(config.default_visibility.contains(Visibility::OBJECT_COLLECTION));
/// assert!(config.include_inherited);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub default_visibility: Visibility,
    /// Describe members declared on ancestor types and base classes.
    pub include_inherited: bool,
    pub send_timestamps: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            default_visibility: Visibility::default(),
            include_inherited: true,
            send_timestamps: false,
        }
    }
}

impl AdapterConfig {
    pub fn options(&self) -> AdapterOptions {
        AdapterOptions {
            send_timestamps: self.send_timestamps,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdapterOptions {
    /// Tag values read from properties and methods with the capture time.
    pub send_timestamps: bool,
}
