//! Configuration options for the serial delegate
//!
//! [`DelegateOptions`] carries the capability gate that turns the serial
//! chooser on. It is off by default: with the gate off, every port request
//! resolves immediately to "no port selected".
//!
//! # Example
//!
//! ```
//! use serial_delegate::options::DelegateOptions;
//!
//! let options = DelegateOptions::builder()
//!     .chooser_enabled(true)
//!     .build();
//! assert!(options.chooser_enabled);
//!
//! // Defaults keep the chooser off
//! assert!(!DelegateOptions::default().chooser_enabled);
//! ```
//!
//! # Loading
//!
//! Hosts can load options from JSON or from a `--enable-features` style list:
//!
//! ```
//! use serial_delegate::options::DelegateOptions;
//!
//! let options = DelegateOptions::from_json(r#"{ "chooser_enabled": true }"#).unwrap();
//! assert!(options.chooser_enabled);
//!
//! let options = DelegateOptions::from_feature_list("NetworkService,SerialChooser");
//! assert!(options.chooser_enabled);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SerialError;

/// Feature name that enables the chooser in a host feature list
pub const SERIAL_CHOOSER_FEATURE: &str = "SerialChooser";

/// Delegate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegateOptions {
    /// Capability gate for the chooser subsystem (default: off)
    pub chooser_enabled: bool,
}

impl DelegateOptions {
    /// Create a new builder
    pub fn builder() -> DelegateOptionsBuilder {
        DelegateOptionsBuilder::default()
    }

    /// Decode options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SerialError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build options from a comma-separated feature list
    ///
    /// The chooser is enabled when the list names [`SERIAL_CHOOSER_FEATURE`].
    /// Entries are trimmed; an optional `<` field trial suffix
    /// (`SerialChooser<Trial`) is ignored.
    pub fn from_feature_list(features: &str) -> Self {
        let chooser_enabled = features
            .split(',')
            .map(|entry| entry.split('<').next().unwrap_or_default().trim())
            .any(|name| name == SERIAL_CHOOSER_FEATURE);
        Self { chooser_enabled }
    }
}

/// Builder for [`DelegateOptions`]
#[derive(Debug, Default)]
pub struct DelegateOptionsBuilder {
    chooser_enabled: Option<bool>,
}

impl DelegateOptionsBuilder {
    /// Turn the chooser capability gate on or off
    pub fn chooser_enabled(mut self, enabled: bool) -> Self {
        self.chooser_enabled = Some(enabled);
        self
    }

    /// Build the options
    pub fn build(self) -> DelegateOptions {
        DelegateOptions {
            chooser_enabled: self.chooser_enabled.unwrap_or(false),
        }
    }
}
