//! Test fixtures: a reference contract covering every payload shape.

use tidings::EventContract;

/// Reference contract used across the integration tests.
#[derive(Debug, Clone, EventContract)]
pub enum Lifecycle {
    /// Emitted without payload when the system starts.
    #[event(name = "started")]
    Started,
    /// A text greeting.
    #[event(name = "greeting")]
    Greeting(String),
    /// A pointer move, passed as one tuple.
    #[event(name = "moved")]
    Moved((i32, i32)),
    /// A counter tick.
    #[event(name = "tick")]
    Tick(u64),
    /// Emitted without payload when the system stops.
    #[event(name = "stopped")]
    Stopped,
}

/// A greeting payload for tests.
#[must_use]
pub fn test_greeting() -> String {
    "hello".to_string()
}
