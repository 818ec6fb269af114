//! Listener handles and the rule deriving listener signatures from payloads.

use std::fmt;
use std::sync::Arc;

use crate::contract::NoPayload;

/// Error returned by a fallible listener.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased listener callable.
type ListenerFn<P> = dyn Fn(&P) -> Result<(), ListenerError> + Send + Sync;

/// A registered callable for events carrying payload `P`.
///
/// Clones share identity: [`Dispatcher::remove_listener`] removes an entry
/// when it was registered from the same handle (or a clone of it).
///
/// [`Dispatcher::remove_listener`]: crate::Dispatcher::remove_listener
pub struct Listener<P> {
    inner: Arc<ListenerFn<P>>,
}

impl<P: 'static> Listener<P> {
    /// Create a listener from any callable matching the payload `P`.
    ///
    /// For [`NoPayload`] this accepts `Fn()`; for every payload it accepts
    /// `Fn(&P)`. The callable may return `()` or `Result<(), E>`.
    ///
    /// ```rust
    /// use tidings::Listener;
    ///
    /// let on_text = Listener::<String>::new(|text: &String| println!("{text}"));
    /// let on_ping = Listener::<()>::new(|| println!("ping"));
    /// # let _ = (on_text, on_ping);
    /// ```
    #[must_use]
    pub fn new<M>(listener: impl IntoListener<P, M>) -> Self {
        listener.into_listener()
    }

    fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&P) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Invoke the listener with a payload.
    ///
    /// # Errors
    ///
    /// Returns the listener's own error if it is fallible and failed.
    pub fn call(&self, payload: &P) -> Result<(), ListenerError> {
        (self.inner)(payload)
    }

    /// Check whether two handles refer to the same listener.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<P> Clone for Listener<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for Listener<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("payload", &std::any::type_name::<P>())
            .field("id", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

/// A listener together with its registration flags, as returned by
/// [`Dispatcher::raw_listeners`](crate::Dispatcher::raw_listeners).
pub struct RawListener<P> {
    /// The registered listener.
    pub listener: Listener<P>,
    /// Whether the entry is removed before its first invocation.
    pub once: bool,
}

impl<P> Clone for RawListener<P> {
    fn clone(&self) -> Self {
        Self {
            listener: self.listener.clone(),
            once: self.once,
        }
    }
}

impl<P> fmt::Debug for RawListener<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawListener")
            .field("listener", &self.listener)
            .field("once", &self.once)
            .finish()
    }
}

/// Values a listener may return.
pub trait ListenerOutput {
    /// Normalize into a dispatch result.
    ///
    /// # Errors
    ///
    /// Returns the listener's error, boxed.
    fn into_result(self) -> Result<(), ListenerError>;
}

impl ListenerOutput for () {
    fn into_result(self) -> Result<(), ListenerError> {
        Ok(())
    }
}

impl<E> ListenerOutput for Result<(), E>
where
    E: Into<ListenerError>,
{
    fn into_result(self) -> Result<(), ListenerError> {
        self.map_err(Into::into)
    }
}

/// Conversion from a callable into a [`Listener`] for payload `P`.
///
/// `M` is an inference marker distinguishing the zero-argument form from
/// the one-argument form; callers never name it.
pub trait IntoListener<P, M> {
    /// Convert into a listener handle.
    fn into_listener(self) -> Listener<P>;
}

impl<F, R> IntoListener<NoPayload, fn() -> R> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: ListenerOutput,
{
    fn into_listener(self) -> Listener<NoPayload> {
        Listener::from_fn(move |&(): &NoPayload| self().into_result())
    }
}

impl<P, F, R> IntoListener<P, fn(&P) -> R> for F
where
    P: 'static,
    F: Fn(&P) -> R + Send + Sync + 'static,
    R: ListenerOutput,
{
    fn into_listener(self) -> Listener<P> {
        Listener::from_fn(move |payload: &P| self(payload).into_result())
    }
}

impl<P> IntoListener<P, Listener<P>> for Listener<P> {
    fn into_listener(self) -> Listener<P> {
        self
    }
}
