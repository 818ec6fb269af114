//! Dispatcher error types.

use thiserror::Error;

use crate::listener::ListenerError;

/// Errors surfaced by [`Dispatcher::emit`](crate::Dispatcher::emit).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A listener returned an error. Listeners after it in the same
    /// dispatch were not invoked.
    #[error("listener #{position} for event '{event}' failed: {source}")]
    Listener {
        /// Name of the event being dispatched.
        event: &'static str,
        /// Zero-based position of the failing listener in the dispatch snapshot.
        position: usize,
        /// The error returned by the listener.
        #[source]
        source: ListenerError,
    },

    /// A registry entry did not hold a listener of the payload type the
    /// contract declares for the event. Raised before the entry is invoked.
    #[error("registered listener for event '{event}' does not match the contract payload type")]
    ContractMismatch {
        /// Name of the event being dispatched.
        event: &'static str,
    },
}

impl DispatchError {
    /// Name of the event whose dispatch failed.
    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::Listener { event, .. } | Self::ContractMismatch { event } => *event,
        }
    }

    /// Check if this error was raised by a listener.
    #[must_use]
    pub fn is_listener_fault(&self) -> bool {
        matches!(self, Self::Listener { .. })
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that can occur while loading dispatcher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed into a configuration.
    #[error("failed to parse dispatcher config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
