//! Tidings - A statically-checked, synchronous event dispatcher.
//!
//! This crate provides:
//! - Event contracts mapping a closed set of event names to payload types
//! - A `Dispatcher` keyed by event name with ordered listener sequences
//! - `on`/`once`/`prepend` registration, removal by listener identity,
//!   and snapshot-based dispatch that tolerates re-entrant mutation
//!
//! # Architecture
//!
//! A contract is declared once, as an enum deriving [`EventContract`](derive@EventContract):
//! each unit variant is an event without payload and each single-field
//! tuple variant is an event carrying that field's type. The derive
//! generates a name enum (`ChatName`) and a module of zero-sized event
//! markers (`chat::Greeting`, ...). Every dispatcher operation takes a
//! marker, so listeners and payloads are checked against the contract at
//! compile time. Listener closures name their parameter type
//! (`|text: &String| ...`) so the compiler can pick the listener form.
//!
//! Dispatch is synchronous: [`Dispatcher::emit`] runs every listener to
//! completion on the calling thread before returning, and stops at the
//! first listener that fails.
//!
//! # Example
//!
//! ```rust
//! use tidings::{Dispatcher, EventContract};
//!
//! #[derive(EventContract)]
//! enum Chat {
//!     Greeting(String),
//!     Moved((i32, i32)),
//!     Closed,
//! }
//!
//! # fn main() -> Result<(), tidings::DispatchError> {
//! let dispatcher = Dispatcher::<Chat>::new();
//!
//! dispatcher
//!     .on(chat::Greeting, |text: &String| println!("greeting: {text}"))
//!     .on(chat::Moved, |&(x, y): &(i32, i32)| println!("moved to {x},{y}"))
//!     .once(chat::Closed, || println!("closed"));
//!
//! assert!(dispatcher.emit(chat::Greeting, "hi".to_string())?);
//! assert!(dispatcher.emit(chat::Moved, (3, 4))?);
//! assert!(dispatcher.notify(chat::Closed)?);
//!
//! // The once listener is gone.
//! assert!(!dispatcher.notify(chat::Closed)?);
//! assert_eq!(dispatcher.event_names(), vec![ChatName::Greeting, ChatName::Moved]);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Lets the derive's `::tidings::` paths resolve inside this crate's own tests.
extern crate self as tidings;

pub mod prelude;

mod config;
mod contract;
mod dispatcher;
mod error;
mod listener;

pub use config::{DEFAULT_MAX_LISTENERS, DispatcherConfig};
pub use contract::{Event, EventContract, EventName, NoPayload};
pub use dispatcher::Dispatcher;
pub use error::{ConfigError, ConfigResult, DispatchError, DispatchResult};
pub use listener::{IntoListener, Listener, ListenerError, ListenerOutput, RawListener};

/// Derive an event contract from an enum declaring its events.
///
/// See the [crate-level example](crate#example).
pub use tidings_macros::EventContract;
