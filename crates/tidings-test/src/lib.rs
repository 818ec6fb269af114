//! Tidings Test - Shared test utilities for the tidings dispatcher.
//!
//! This crate provides a reference contract, a call recorder and tracing
//! helpers that integration tests use as a dependency.
//!
//! # Usage
//!
//! ```rust
//! use tidings::Dispatcher;
//! use tidings_test::{CallLog, Lifecycle, lifecycle};
//!
//! # fn main() -> Result<(), tidings::DispatchError> {
//! let dispatcher = Dispatcher::<Lifecycle>::new();
//! let log = CallLog::new();
//!
//! dispatcher.on(lifecycle::Greeting, log.listener("greet"));
//! dispatcher.emit(lifecycle::Greeting, "hi".to_string())?;
//!
//! assert_eq!(log.entries(), vec!["greet:hi"]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod logging;
pub mod mocks;

pub use fixtures::*;
pub use logging::*;
pub use mocks::*;
