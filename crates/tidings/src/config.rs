//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigResult;

/// Default advisory cap on listeners per event name.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
///
/// Every field has a default, so a partial TOML document is enough:
///
/// ```rust
/// use tidings::DispatcherConfig;
///
/// let config = DispatcherConfig::from_toml_str("max_listeners = 32").unwrap();
/// assert_eq!(config.max_listeners, 32);
/// assert!(config.warn_on_leak);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Advisory cap on listeners per event name. `0` means unlimited.
    pub max_listeners: usize,
    /// Whether exceeding `max_listeners` logs a warning.
    pub warn_on_leak: bool,
    /// Whether each listener invocation is logged at trace level.
    pub trace_dispatch: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            warn_on_leak: true,
            trace_dispatch: false,
        }
    }
}

impl DispatcherConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`](crate::ConfigError::Parse) if the
    /// document is malformed or contains unknown keys.
    pub fn from_toml_str(toml: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Set the advisory listener cap.
    #[must_use]
    pub fn with_max_listeners(mut self, max: usize) -> Self {
        self.max_listeners = max;
        self
    }

    /// Remove the advisory listener cap.
    #[must_use]
    pub fn unlimited(mut self) -> Self {
        self.max_listeners = 0;
        self
    }

    /// Enable or disable the listener leak warning.
    #[must_use]
    pub fn with_warn_on_leak(mut self, warn: bool) -> Self {
        self.warn_on_leak = warn;
        self
    }

    /// Enable or disable per-listener trace logging.
    #[must_use]
    pub fn with_trace_dispatch(mut self, trace: bool) -> Self {
        self.trace_dispatch = trace;
        self
    }
}
