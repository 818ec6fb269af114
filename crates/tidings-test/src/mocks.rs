//! Recording and failing listeners for testing.

use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tidings::{Listener, NoPayload};

/// Shared, ordered record of listener invocations.
///
/// Clones share the same record, so a log can be captured by many
/// listeners and inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn record(&self, entry: impl Into<String>) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.push(entry.into());
        }
    }

    /// A listener recording `"{label}:{payload}"` on every call.
    #[must_use]
    pub fn listener<P>(&self, label: &'static str) -> Listener<P>
    where
        P: Display + 'static,
    {
        let log = self.clone();
        Listener::<P>::new(move |payload: &P| log.record(format!("{label}:{payload}")))
    }

    /// A listener recording `label` on every call, for events without payload.
    #[must_use]
    pub fn signal_listener(&self, label: &'static str) -> Listener<NoPayload> {
        let log = self.clone();
        Listener::<NoPayload>::new(move || log.record(label))
    }

    /// A listener recording `label` on every call, ignoring the payload.
    #[must_use]
    pub fn marker<P: 'static>(&self, label: &'static str) -> Listener<P> {
        let log = self.clone();
        Listener::<P>::new(move |_: &P| log.record(label))
    }

    /// Snapshot of the recorded entries, in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|guard| guard.len()).unwrap_or_default()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all recorded entries.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.entries.lock() {
            guard.clear();
        }
    }
}

/// A listener that fails every call and counts how often it ran.
#[derive(Debug, Clone)]
pub struct FailingListener {
    message: &'static str,
    calls: Arc<AtomicUsize>,
}

impl FailingListener {
    /// Create a failing listener returning `message` as its error.
    #[must_use]
    pub fn new(message: &'static str) -> Self {
        Self {
            message,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of times the listener ran.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A listener handle for events carrying payload `P`.
    #[must_use]
    pub fn listener<P: 'static>(&self) -> Listener<P> {
        let message = self.message;
        let calls = Arc::clone(&self.calls);
        Listener::<P>::new(move |_: &P| -> Result<(), &'static str> {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(message)
        })
    }
}
