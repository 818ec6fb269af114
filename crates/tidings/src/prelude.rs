//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tidings::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use tidings::prelude::*;
//!
//! #[derive(EventContract)]
//! enum Build {
//!     Started,
//!     Finished(u64),
//! }
//!
//! # fn main() -> DispatchResult<()> {
//! let dispatcher = Dispatcher::<Build>::new();
//! dispatcher.on(build::Finished, |millis: &u64| println!("took {millis}ms"));
//!
//! assert!(dispatcher.emit(build::Finished, 1200)?);
//! assert!(!dispatcher.notify(build::Started)?);
//! # Ok(())
//! # }
//! ```

// Dispatcher
pub use crate::{DEFAULT_MAX_LISTENERS, Dispatcher, DispatcherConfig};

// Contracts
pub use crate::{Event, EventContract, EventName, NoPayload};

// Listeners
pub use crate::{Listener, ListenerError, RawListener};

// Errors
pub use crate::{DispatchError, DispatchResult};
