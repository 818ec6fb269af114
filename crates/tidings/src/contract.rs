//! Event contracts: the closed mapping from event names to payload types.
//!
//! A contract is declared once, usually with `#[derive(EventContract)]`,
//! and consists of three pieces:
//!
//! - an [`EventContract`] type tying everything together,
//! - an [`EventName`] enum listing every name the contract admits,
//! - one zero-sized [`Event`] marker per name, carrying its payload type.
//!
//! Every [`Dispatcher`](crate::Dispatcher) operation is generic over
//! `E: Event<Contract = C>`, so the compiler rejects names from other
//! contracts, payloads of the wrong type and listeners of the wrong arity.
//!
//! # Manual declaration
//!
//! ```rust
//! use tidings::{Dispatcher, Event, EventContract, EventName, NoPayload};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum DoorName {
//!     Opened,
//!     Closed,
//! }
//!
//! impl EventName for DoorName {
//!     fn as_str(&self) -> &'static str {
//!         match self {
//!             Self::Opened => "opened",
//!             Self::Closed => "closed",
//!         }
//!     }
//! }
//!
//! enum Door {}
//!
//! impl EventContract for Door {
//!     type Name = DoorName;
//!
//!     fn names() -> &'static [DoorName] {
//!         &[DoorName::Opened, DoorName::Closed]
//!     }
//! }
//!
//! #[derive(Debug, Clone, Copy)]
//! struct Opened;
//!
//! impl Event for Opened {
//!     type Contract = Door;
//!     type Payload = u32;
//!     const NAME: DoorName = DoorName::Opened;
//! }
//!
//! #[derive(Debug, Clone, Copy)]
//! struct Closed;
//!
//! impl Event for Closed {
//!     type Contract = Door;
//!     type Payload = NoPayload;
//!     const NAME: DoorName = DoorName::Closed;
//! }
//!
//! # fn main() -> Result<(), tidings::DispatchError> {
//! let door = Dispatcher::<Door>::new();
//! door.on(Opened, |angle: &u32| assert_eq!(*angle, 90));
//! door.on(Closed, || {});
//!
//! assert!(door.emit(Opened, 90)?);
//! assert!(door.notify(Closed)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Static rejection
//!
//! The fixtures below compile as long as each event is used the way its
//! contract declares:
//!
//! ```rust
//! use tidings::{Dispatcher, EventContract};
//!
//! #[derive(EventContract)]
//! enum Chat {
//!     Greeting(String),
//! }
//!
//! #[derive(EventContract)]
//! enum Billing {
//!     Charged(u64),
//! }
//!
//! fn main() {
//!     let chats = Dispatcher::<Chat>::new();
//!     let payments = Dispatcher::<Billing>::new();
//!     chats.on(chat::Greeting, |_: &String| {});
//!     payments.on(billing::Charged, |_: &u64| {});
//!     let _ = chats.emit(chat::Greeting, String::from("hi"));
//! }
//! ```
//!
//! An event from another contract does not compile:
//!
//! ```rust,compile_fail,E0271
//! use tidings::{Dispatcher, EventContract};
//!
//! #[derive(EventContract)]
//! enum Chat {
//!     Greeting(String),
//! }
//!
//! #[derive(EventContract)]
//! enum Billing {
//!     Charged(u64),
//! }
//!
//! fn main() {
//!     let dispatcher = Dispatcher::<Chat>::new();
//!     dispatcher.on(billing::Charged, |_: &u64| {});
//! }
//! ```
//!
//! Nor does a payload of the wrong type:
//!
//! ```rust,compile_fail
//! use tidings::{Dispatcher, EventContract};
//!
//! #[derive(EventContract)]
//! enum Chat {
//!     Greeting(String),
//! }
//!
//! fn main() {
//!     let dispatcher = Dispatcher::<Chat>::new();
//!     let _ = dispatcher.emit(chat::Greeting, 42_u32);
//! }
//! ```
//!
//! Nor a zero-argument listener for an event that carries a payload:
//!
//! ```rust,compile_fail,E0277
//! use tidings::{Dispatcher, EventContract};
//!
//! #[derive(EventContract)]
//! enum Chat {
//!     Greeting(String),
//! }
//!
//! fn main() {
//!     let dispatcher = Dispatcher::<Chat>::new();
//!     dispatcher.on(chat::Greeting, || {});
//! }
//! ```

use std::fmt::Debug;

/// The no-payload sentinel.
///
/// Listeners for an event whose payload is `NoPayload` take zero
/// arguments, and [`Dispatcher::notify`](crate::Dispatcher::notify) emits
/// it without arguments.
pub type NoPayload = ();

/// The closed set of names admitted by one contract.
pub trait EventName: Copy + Eq + Debug + Send + Sync + 'static {
    /// The string form of this name, used in logs and errors.
    fn as_str(&self) -> &'static str;
}

/// A closed, immutable mapping from event names to payload types.
///
/// Contract types carry no runtime state. They are usually uninhabited
/// or never constructed, and exist only to parameterize a
/// [`Dispatcher`](crate::Dispatcher).
pub trait EventContract: 'static {
    /// The name enum of this contract.
    type Name: EventName;

    /// Every name of this contract, in declaration order.
    fn names() -> &'static [Self::Name];
}

/// Marker type standing for a single event name of a contract.
///
/// The marker's [`Payload`](Event::Payload) determines the listener
/// signature and the emit arguments for its name.
pub trait Event: Copy + Send + Sync + 'static {
    /// The contract this event belongs to.
    type Contract: EventContract;

    /// The payload passed to listeners. Use [`NoPayload`] for events
    /// without one. Tuples and arrays are passed as a single value.
    type Payload: Send + Sync + 'static;

    /// The runtime name of this event.
    const NAME: <Self::Contract as EventContract>::Name;

    /// The string form of this event's name.
    #[must_use]
    fn name(self) -> &'static str {
        Self::NAME.as_str()
    }
}
