//! The listener registry and the synchronous dispatch algorithm.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::config::DispatcherConfig;
use crate::contract::{Event, EventContract, EventName, NoPayload};
use crate::error::{DispatchError, DispatchResult};
use crate::listener::{IntoListener, Listener, RawListener};

/// Identity of one registration. Registering the same listener twice
/// yields two entries with distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// One registration in a name's listener sequence.
///
/// Cloning an entry (to build a dispatch snapshot) shares the `fired`
/// flag with the live entry.
#[derive(Clone)]
struct Entry {
    id: EntryId,
    once: bool,
    fired: Arc<AtomicBool>,
    /// Holds a `Listener<P>` for the payload type of the entry's event.
    listener: Arc<dyn Any + Send + Sync>,
}

impl Entry {
    fn new<P: 'static>(listener: Listener<P>, once: bool) -> Self {
        Self {
            id: EntryId::new(),
            once,
            fired: Arc::new(AtomicBool::new(false)),
            listener: Arc::new(listener),
        }
    }

    fn typed<P: 'static>(&self) -> Option<&Listener<P>> {
        self.listener.downcast_ref::<Listener<P>>()
    }

    fn is<P: 'static>(&self, listener: &Listener<P>) -> bool {
        self.typed::<P>().is_some_and(|l| l.ptr_eq(listener))
    }

    /// Claim a once entry for invocation. Returns `false` if another
    /// dispatch already claimed it.
    fn claim(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }
}

/// The listener sequence for one event name.
struct Slot<N> {
    name: N,
    entries: Vec<Entry>,
    /// Whether the max-listener warning was already issued for this name.
    warned: bool,
}

/// Name-keyed registry. Slots are kept in first-registration order and
/// never hold an empty sequence.
struct Registry<N> {
    slots: Vec<Slot<N>>,
}

impl<N: EventName> Registry<N> {
    fn new() -> Self {
        Self { slots: Vec::new() }
    }

    fn slot(&self, name: N) -> Option<&Slot<N>> {
        self.slots.iter().find(|s| s.name == name)
    }

    fn position(&self, name: N) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    fn entries(&self, name: N) -> &[Entry] {
        self.slot(name)
            .map(|s| s.entries.as_slice())
            .unwrap_or_default()
    }

    fn len(&self, name: N) -> usize {
        self.entries(name).len()
    }

    /// Insert an entry. Returns the new sequence length and whether the
    /// max-listener warning should be issued for this insertion.
    fn insert(&mut self, name: N, entry: Entry, prepend: bool, max: usize) -> (usize, bool) {
        let index = if let Some(index) = self.position(name) {
            index
        } else {
            self.slots.push(Slot {
                name,
                entries: Vec::new(),
                warned: false,
            });
            self.slots.len().saturating_sub(1)
        };

        let slot = &mut self.slots[index];
        if prepend {
            slot.entries.insert(0, entry);
        } else {
            slot.entries.push(entry);
        }

        let count = slot.entries.len();
        let exceeded = max > 0 && count > max && !slot.warned;
        if exceeded {
            slot.warned = true;
        }
        (count, exceeded)
    }

    /// Remove the first entry matching `pred`. Returns `true` if one was removed.
    fn remove_first(&mut self, name: N, pred: impl Fn(&Entry) -> bool) -> bool {
        let Some(index) = self.position(name) else {
            return false;
        };
        let slot = &mut self.slots[index];
        let Some(pos) = slot.entries.iter().position(pred) else {
            return false;
        };
        slot.entries.remove(pos);
        if slot.entries.is_empty() {
            self.slots.remove(index);
        }
        true
    }

    fn clear(&mut self, name: Option<N>) -> usize {
        match name {
            Some(name) => self.position(name).map_or(0, |index| {
                self.slots.remove(index).entries.len()
            }),
            None => self
                .slots
                .drain(..)
                .fold(0usize, |acc, s| acc.saturating_add(s.entries.len())),
        }
    }
}

/// A statically-checked, synchronous event dispatcher bound to contract `C`.
///
/// Every method takes `&self`; listeners may register, remove or emit on
/// the same dispatcher while a dispatch is in progress. The registry lock
/// is never held while a listener runs.
///
/// # Dispatch semantics
///
/// [`emit`](Self::emit) snapshots the listener sequence for the event and
/// invokes the snapshot in order:
///
/// - listeners added during the dispatch run from the next emit on;
/// - listeners removed during the dispatch still run in this one, and not
///   in later ones;
/// - a once listener is removed from the registry before it is invoked,
///   and runs at most once even under re-entrant emits;
/// - the first listener returning an error stops the dispatch: later
///   listeners in the snapshot are skipped and the error is returned.
///   A panicking listener unwinds through `emit` the same way.
///
/// Instances are independent: two dispatchers for the same contract never
/// share listeners. `Dispatcher<C>` is `Send + Sync`; wrap it in an `Arc`
/// to share it, and avoid storing that `Arc` inside one of its own
/// listeners (use a `Weak` instead) or the cycle keeps it alive forever.
pub struct Dispatcher<C: EventContract> {
    registry: Mutex<Registry<C::Name>>,
    max_listeners: AtomicUsize,
    warn_on_leak: bool,
    trace_dispatch: bool,
    _contract: PhantomData<fn() -> C>,
}

impl<C: EventContract> Dispatcher<C> {
    /// Create an empty dispatcher with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    /// Create an empty dispatcher with the given configuration.
    #[must_use]
    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            registry: Mutex::new(Registry::new()),
            max_listeners: AtomicUsize::new(config.max_listeners),
            warn_on_leak: config.warn_on_leak,
            trace_dispatch: config.trace_dispatch,
            _contract: PhantomData,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry<C::Name>> {
        self.registry.lock().unwrap_or_else(|e| {
            warn!("Dispatcher registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn register<E, P>(&self, listener: Listener<P>, once: bool, prepend: bool) -> &Self
    where
        E: Event<Contract = C, Payload = P>,
        P: 'static,
    {
        let max = self.max_listeners.load(Ordering::Relaxed);
        let (count, exceeded) =
            self.registry()
                .insert(E::NAME, Entry::new(listener, once), prepend, max);

        debug!(
            event = E::NAME.as_str(),
            once,
            prepend,
            listener_count = count,
            "Listener registered"
        );

        if exceeded && self.warn_on_leak {
            warn!(
                event = E::NAME.as_str(),
                listener_count = count,
                max_listeners = max,
                "Possible listener leak: listener count exceeds max listeners"
            );
        }

        self
    }

    /// Append a listener for `event`. Alias of [`on`](Self::on).
    pub fn add_listener<E, M>(&self, event: E, listener: impl IntoListener<E::Payload, M>) -> &Self
    where
        E: Event<Contract = C>,
    {
        self.on(event, listener)
    }

    /// Append a listener for `event`.
    ///
    /// Registering the same listener twice creates two entries, and both
    /// are invoked.
    pub fn on<E, M>(&self, _event: E, listener: impl IntoListener<E::Payload, M>) -> &Self
    where
        E: Event<Contract = C>,
    {
        self.register::<E, E::Payload>(listener.into_listener(), false, false)
    }

    /// Append a listener that is removed right before its first invocation.
    pub fn once<E, M>(&self, _event: E, listener: impl IntoListener<E::Payload, M>) -> &Self
    where
        E: Event<Contract = C>,
    {
        self.register::<E, E::Payload>(listener.into_listener(), true, false)
    }

    /// Insert a listener at the front of the sequence for `event`.
    pub fn prepend_listener<E, M>(
        &self,
        _event: E,
        listener: impl IntoListener<E::Payload, M>,
    ) -> &Self
    where
        E: Event<Contract = C>,
    {
        self.register::<E, E::Payload>(listener.into_listener(), false, true)
    }

    /// Insert a once listener at the front of the sequence for `event`.
    pub fn prepend_once_listener<E, M>(
        &self,
        _event: E,
        listener: impl IntoListener<E::Payload, M>,
    ) -> &Self
    where
        E: Event<Contract = C>,
    {
        self.register::<E, E::Payload>(listener.into_listener(), true, true)
    }

    /// Remove the first entry registered from `listener` (or a clone of
    /// it) for `event`. Does nothing if there is none.
    pub fn remove_listener<E>(&self, _event: E, listener: &Listener<E::Payload>) -> &Self
    where
        E: Event<Contract = C>,
    {
        let removed = self
            .registry()
            .remove_first(E::NAME, |entry| entry.is(listener));

        if removed {
            debug!(event = E::NAME.as_str(), "Listener removed");
        } else {
            trace!(event = E::NAME.as_str(), "No matching listener to remove");
        }

        self
    }

    /// Remove a listener. Alias of [`remove_listener`](Self::remove_listener).
    pub fn off<E>(&self, event: E, listener: &Listener<E::Payload>) -> &Self
    where
        E: Event<Contract = C>,
    {
        self.remove_listener(event, listener)
    }

    /// Remove every listener for `name`, or for all names if `None`.
    pub fn remove_all_listeners(&self, name: Option<C::Name>) -> &Self {
        let removed = self.registry().clear(name);
        debug!(
            event = name.map_or("*", |n| n.as_str()),
            removed, "All listeners removed"
        );
        self
    }

    /// Invoke every listener currently registered for `event`, in order,
    /// with a reference to `payload`.
    ///
    /// Returns `Ok(true)` if the event had listeners, `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Listener`] for the first listener that
    /// fails; no later listener of this dispatch runs. Returns
    /// [`DispatchError::ContractMismatch`], without invoking anything, if a
    /// registry entry under the event's name does not hold a listener for
    /// its payload type.
    pub fn emit<E>(&self, _event: E, payload: E::Payload) -> DispatchResult<bool>
    where
        E: Event<Contract = C>,
    {
        let event = E::NAME.as_str();
        let snapshot: Vec<Entry> = self.registry().entries(E::NAME).to_vec();

        trace!(event, listener_count = snapshot.len(), "Emitting event");

        if snapshot.is_empty() {
            return Ok(false);
        }

        let typed = snapshot
            .iter()
            .map(|entry| entry.typed::<E::Payload>().map(|listener| (entry, listener)))
            .collect::<Option<Vec<_>>>()
            .ok_or(DispatchError::ContractMismatch { event })?;

        for (position, (entry, listener)) in typed.into_iter().enumerate() {
            if entry.once {
                if !entry.claim() {
                    continue;
                }
                self.registry()
                    .remove_first(E::NAME, |live| live.id == entry.id);
            }

            if self.trace_dispatch {
                trace!(event, position, once = entry.once, "Invoking listener");
            }

            if let Err(source) = listener.call(&payload) {
                debug!(event, position, error = %source, "Listener failed, aborting dispatch");
                return Err(DispatchError::Listener {
                    event,
                    position,
                    source,
                });
            }
        }

        Ok(true)
    }

    /// Emit an event that carries no payload.
    ///
    /// # Errors
    ///
    /// See [`emit`](Self::emit).
    pub fn notify<E>(&self, event: E) -> DispatchResult<bool>
    where
        E: Event<Contract = C, Payload = NoPayload>,
    {
        self.emit(event, ())
    }

    /// Number of listeners currently registered for `event`.
    ///
    /// Always equal to `self.listeners(event).len()`.
    #[must_use]
    pub fn listener_count<E>(&self, _event: E) -> usize
    where
        E: Event<Contract = C>,
    {
        self.registry()
            .entries(E::NAME)
            .iter()
            .filter(|entry| entry.typed::<E::Payload>().is_some())
            .count()
    }

    /// Number of listeners currently registered for a runtime name,
    /// whatever their payload type.
    #[must_use]
    pub fn listener_count_by_name(&self, name: C::Name) -> usize {
        self.registry().len(name)
    }

    /// Number of listeners registered across all names.
    #[must_use]
    pub fn total_listener_count(&self) -> usize {
        self.registry()
            .slots
            .iter()
            .fold(0usize, |acc, s| acc.saturating_add(s.entries.len()))
    }

    /// Check whether `event` has at least one listener.
    #[must_use]
    pub fn has_listeners<E>(&self, _event: E) -> bool
    where
        E: Event<Contract = C>,
    {
        self.registry()
            .entries(E::NAME)
            .iter()
            .any(|entry| entry.typed::<E::Payload>().is_some())
    }

    /// Snapshot of the listeners registered for `event`, in dispatch order.
    #[must_use]
    pub fn listeners<E>(&self, _event: E) -> Vec<Listener<E::Payload>>
    where
        E: Event<Contract = C>,
    {
        self.registry()
            .entries(E::NAME)
            .iter()
            .filter_map(|entry| entry.typed::<E::Payload>().cloned())
            .collect()
    }

    /// Snapshot of the entries registered for `event`, with their once flags.
    #[must_use]
    pub fn raw_listeners<E>(&self, _event: E) -> Vec<RawListener<E::Payload>>
    where
        E: Event<Contract = C>,
    {
        self.registry()
            .entries(E::NAME)
            .iter()
            .filter_map(|entry| {
                entry.typed::<E::Payload>().map(|listener| RawListener {
                    listener: listener.clone(),
                    once: entry.once,
                })
            })
            .collect()
    }

    /// Names with at least one listener, in first-registration order.
    #[must_use]
    pub fn event_names(&self) -> Vec<C::Name> {
        self.registry().slots.iter().map(|s| s.name).collect()
    }

    /// Set the advisory listener cap per name. `0` means unlimited.
    ///
    /// Exceeding the cap only logs a warning; registration always succeeds.
    pub fn set_max_listeners(&self, max: usize) -> &Self {
        self.max_listeners.store(max, Ordering::Relaxed);
        debug!(max_listeners = max, "Max listeners updated");
        self
    }

    /// The advisory listener cap per name. `0` means unlimited.
    #[must_use]
    pub fn max_listeners(&self) -> usize {
        self.max_listeners.load(Ordering::Relaxed)
    }
}

impl<C: EventContract> Default for Dispatcher<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: EventContract> fmt::Debug for Dispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry();
        let counts: Vec<(&'static str, usize)> = registry
            .slots
            .iter()
            .map(|s| (s.name.as_str(), s.entries.len()))
            .collect();
        f.debug_struct("Dispatcher")
            .field("listeners", &counts)
            .field("max_listeners", &self.max_listeners())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Weak;

    #[derive(crate::EventContract)]
    enum Shop {
        Opened,
        Sale(u32),
        Restock((String, u32)),
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn recorder(log: &Log, label: &'static str) -> Listener<u32> {
        let log = Arc::clone(log);
        Listener::<u32>::new(move |amount: &u32| {
            log.lock().unwrap().push(format!("{label}:{amount}"));
        })
    }

    #[test]
    fn test_new_dispatcher_is_empty() {
        let dispatcher = Dispatcher::<Shop>::new();
        assert!(dispatcher.event_names().is_empty());
        assert_eq!(dispatcher.total_listener_count(), 0);
        assert_eq!(dispatcher.max_listeners(), 10);
        assert!(!dispatcher.has_listeners(shop::Sale));
    }

    #[test]
    fn test_emit_without_listeners_returns_false() {
        let dispatcher = Dispatcher::<Shop>::new();
        assert!(!dispatcher.emit(shop::Sale, 5).unwrap());
        assert!(!dispatcher.notify(shop::Opened).unwrap());
    }

    #[test]
    fn test_emit_passes_payload_in_registration_order() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();

        dispatcher
            .on(shop::Sale, recorder(&log, "a"))
            .on(shop::Sale, recorder(&log, "b"));

        assert!(dispatcher.emit(shop::Sale, 7).unwrap());
        assert_eq!(entries(&log), vec!["a:7", "b:7"]);
    }

    #[test]
    fn test_no_payload_listener_takes_no_arguments() {
        let dispatcher = Dispatcher::<Shop>::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);

        dispatcher.on(shop::Opened, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(dispatcher.notify(shop::Opened).unwrap());
        assert!(dispatcher.emit(shop::Opened, ()).unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_tuple_payload() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();
        let log_clone = Arc::clone(&log);

        dispatcher.on(shop::Restock, move |(item, qty): &(String, u32)| {
            log_clone.lock().unwrap().push(format!("{item}x{qty}"));
        });

        dispatcher
            .emit(shop::Restock, ("apples".to_string(), 12))
            .unwrap();
        assert_eq!(entries(&log), vec!["applesx12"]);
    }

    #[test]
    fn test_prepend_runs_first() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();

        dispatcher
            .on(shop::Sale, recorder(&log, "a"))
            .on(shop::Sale, recorder(&log, "b"))
            .prepend_listener(shop::Sale, recorder(&log, "first"));

        dispatcher.emit(shop::Sale, 1).unwrap();
        assert_eq!(entries(&log), vec!["first:1", "a:1", "b:1"]);
    }

    #[test]
    fn test_once_runs_exactly_once() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();

        dispatcher.once(shop::Sale, recorder(&log, "once"));
        assert_eq!(dispatcher.listener_count(shop::Sale), 1);

        dispatcher.emit(shop::Sale, 1).unwrap();
        dispatcher.emit(shop::Sale, 2).unwrap();

        assert_eq!(entries(&log), vec!["once:1"]);
        assert_eq!(dispatcher.listener_count(shop::Sale), 0);
        assert!(dispatcher.event_names().is_empty());
    }

    #[test]
    fn test_prepend_once_listener() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();

        dispatcher
            .on(shop::Sale, recorder(&log, "a"))
            .prepend_once_listener(shop::Sale, recorder(&log, "pre"));

        dispatcher.emit(shop::Sale, 1).unwrap();
        dispatcher.emit(shop::Sale, 2).unwrap();
        assert_eq!(entries(&log), vec!["pre:1", "a:1", "a:2"]);
    }

    #[test]
    fn test_duplicate_registration_yields_two_entries() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();
        let listener = recorder(&log, "dup");

        dispatcher
            .on(shop::Sale, listener.clone())
            .on(shop::Sale, listener.clone());
        dispatcher.emit(shop::Sale, 3).unwrap();
        assert_eq!(entries(&log), vec!["dup:3", "dup:3"]);

        // Removal matches the first occurrence only.
        dispatcher.remove_listener(shop::Sale, &listener);
        assert_eq!(dispatcher.listener_count(shop::Sale), 1);

        dispatcher.off(shop::Sale, &listener);
        assert_eq!(dispatcher.listener_count(shop::Sale), 0);
    }

    #[test]
    fn test_remove_first_occurrence_keeps_order() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");

        dispatcher
            .on(shop::Sale, a.clone())
            .on(shop::Sale, b.clone())
            .on(shop::Sale, a.clone());

        dispatcher.remove_listener(shop::Sale, &a);
        dispatcher.emit(shop::Sale, 0).unwrap();
        assert_eq!(entries(&log), vec!["b:0", "a:0"]);
    }

    #[test]
    fn test_remove_absent_listener_is_noop() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();
        let registered = recorder(&log, "registered");
        let stranger = recorder(&log, "stranger");

        dispatcher.on(shop::Sale, registered);
        dispatcher.remove_listener(shop::Sale, &stranger);
        assert_eq!(dispatcher.listener_count(shop::Sale), 1);
    }

    #[test]
    fn test_remove_once_listener_by_handle() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();
        let listener = recorder(&log, "once");

        dispatcher.once(shop::Sale, listener.clone());
        dispatcher.remove_listener(shop::Sale, &listener);

        assert!(!dispatcher.emit(shop::Sale, 1).unwrap());
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_remove_all_listeners_for_one_name() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();

        dispatcher
            .on(shop::Sale, recorder(&log, "a"))
            .on(shop::Opened, || {});

        dispatcher.remove_all_listeners(Some(ShopName::Sale));
        assert!(!dispatcher.emit(shop::Sale, 1).unwrap());
        assert_eq!(dispatcher.event_names(), vec![ShopName::Opened]);
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_remove_all_listeners_everywhere() {
        let dispatcher = Dispatcher::<Shop>::new();
        dispatcher
            .on(shop::Sale, |_: &u32| {})
            .on(shop::Opened, || {});

        dispatcher.remove_all_listeners(None);
        assert!(dispatcher.event_names().is_empty());
        assert_eq!(dispatcher.total_listener_count(), 0);
    }

    #[test]
    fn test_event_names_first_registration_order() {
        let dispatcher = Dispatcher::<Shop>::new();
        let sale = Listener::<u32>::new(|_: &u32| {});

        dispatcher
            .on(shop::Sale, sale.clone())
            .on(shop::Opened, || {})
            .on(shop::Sale, |_: &u32| {});
        assert_eq!(
            dispatcher.event_names(),
            vec![ShopName::Sale, ShopName::Opened]
        );

        // Emptying a name drops it; re-registering appends it again.
        dispatcher.remove_all_listeners(Some(ShopName::Sale));
        dispatcher.on(shop::Sale, sale);
        assert_eq!(
            dispatcher.event_names(),
            vec![ShopName::Opened, ShopName::Sale]
        );
    }

    #[test]
    fn test_listeners_snapshot() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");

        dispatcher.on(shop::Sale, a.clone()).once(shop::Sale, b.clone());

        let listeners = dispatcher.listeners(shop::Sale);
        assert_eq!(listeners.len(), 2);
        assert!(listeners[0].ptr_eq(&a));
        assert!(listeners[1].ptr_eq(&b));

        let raw = dispatcher.raw_listeners(shop::Sale);
        assert!(!raw[0].once);
        assert!(raw[1].once);

        // The snapshot is detached from the registry.
        dispatcher.remove_all_listeners(None);
        assert_eq!(listeners.len(), 2);
        assert!(dispatcher.listeners(shop::Sale).is_empty());
    }

    #[test]
    fn test_listener_error_stops_dispatch() {
        let dispatcher = Dispatcher::<Shop>::new();
        let log = new_log();

        dispatcher
            .on(shop::Sale, recorder(&log, "first"))
            .on(shop::Sale, |_: &u32| -> Result<(), String> {
                Err("out of stock".to_string())
            })
            .on(shop::Sale, recorder(&log, "third"));

        let err = dispatcher.emit(shop::Sale, 9).unwrap_err();
        assert!(err.is_listener_fault());
        assert_eq!(err.event(), "Sale");
        match err {
            DispatchError::Listener {
                position, source, ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(source.to_string(), "out of stock");
            },
            DispatchError::ContractMismatch { .. } => panic!("unexpected contract mismatch"),
        }
        assert_eq!(entries(&log), vec!["first:9"]);
    }

    #[test]
    fn test_listener_removed_during_dispatch_still_runs_this_time() {
        let dispatcher = Arc::new(Dispatcher::<Shop>::new());
        let log = new_log();
        let victim = recorder(&log, "victim");

        let weak: Weak<Dispatcher<Shop>> = Arc::downgrade(&dispatcher);
        let victim_clone = victim.clone();
        dispatcher.on(shop::Sale, move |_: &u32| {
            if let Some(d) = weak.upgrade() {
                d.remove_listener(shop::Sale, &victim_clone);
            }
        });
        dispatcher.on(shop::Sale, victim);

        dispatcher.emit(shop::Sale, 1).unwrap();
        assert_eq!(entries(&log), vec!["victim:1"]);

        dispatcher.emit(shop::Sale, 2).unwrap();
        assert_eq!(entries(&log), vec!["victim:1"]);
    }

    #[test]
    fn test_listener_added_during_dispatch_waits_for_next_emit() {
        let dispatcher = Arc::new(Dispatcher::<Shop>::new());
        let log = new_log();

        let weak = Arc::downgrade(&dispatcher);
        let late = recorder(&log, "late");
        dispatcher.once(shop::Sale, move |_: &u32| {
            if let Some(d) = weak.upgrade() {
                d.on(shop::Sale, late.clone());
            }
        });

        dispatcher.emit(shop::Sale, 1).unwrap();
        assert!(entries(&log).is_empty());

        dispatcher.emit(shop::Sale, 2).unwrap();
        assert_eq!(entries(&log), vec!["late:2"]);
    }

    #[test]
    fn test_reentrant_emit_does_not_refire_once_listener() {
        let dispatcher = Arc::new(Dispatcher::<Shop>::new());
        let log = new_log();

        let weak = Arc::downgrade(&dispatcher);
        let log_clone = Arc::clone(&log);
        dispatcher.once(shop::Sale, move |amount: &u32| {
            log_clone.lock().unwrap().push(format!("once:{amount}"));
            if let Some(d) = weak.upgrade() {
                d.emit(shop::Sale, amount.saturating_add(1)).unwrap();
            }
        });

        dispatcher.emit(shop::Sale, 1).unwrap();
        assert_eq!(entries(&log), vec!["once:1"]);
    }

    #[test]
    fn test_once_listener_claimed_by_inner_dispatch_is_skipped_by_outer() {
        let dispatcher = Arc::new(Dispatcher::<Shop>::new());
        let log = new_log();

        // The first listener re-emits once; the inner dispatch fires the
        // once listener, so the outer snapshot must skip it.
        let weak = Arc::downgrade(&dispatcher);
        dispatcher.on(shop::Sale, move |amount: &u32| {
            if let Some(d) = weak.upgrade().filter(|_| *amount == 1) {
                d.emit(shop::Sale, 2).unwrap();
            }
        });
        dispatcher.once(shop::Sale, recorder(&log, "once"));

        dispatcher.emit(shop::Sale, 1).unwrap();
        assert_eq!(entries(&log), vec!["once:2"]);
    }

    #[test]
    fn test_max_listeners_is_advisory() {
        let dispatcher = Dispatcher::<Shop>::new();
        dispatcher.set_max_listeners(2);
        assert_eq!(dispatcher.max_listeners(), 2);

        for _ in 0..5 {
            dispatcher.on(shop::Sale, |_: &u32| {});
        }
        assert_eq!(dispatcher.listener_count(shop::Sale), 5);
        assert_eq!(dispatcher.listener_count_by_name(ShopName::Sale), 5);
    }

    #[test]
    fn test_registry_warns_once_per_name() {
        let mut registry = Registry::<ShopName>::new();
        let entry = || Entry::new(Listener::<u32>::new(|_: &u32| {}), false);

        assert_eq!(registry.insert(ShopName::Sale, entry(), false, 1), (1, false));
        assert_eq!(registry.insert(ShopName::Sale, entry(), false, 1), (2, true));
        assert_eq!(registry.insert(ShopName::Sale, entry(), false, 1), (3, false));

        // Unlimited never warns.
        assert_eq!(registry.insert(ShopName::Opened, entry(), false, 0), (1, false));
        assert_eq!(registry.insert(ShopName::Opened, entry(), false, 0), (2, false));
    }

    #[test]
    fn test_instances_are_independent() {
        let first = Dispatcher::<Shop>::new();
        let second = Dispatcher::<Shop>::new();
        let log = new_log();

        first.on(shop::Sale, recorder(&log, "first"));

        assert!(!second.emit(shop::Sale, 1).unwrap());
        assert!(entries(&log).is_empty());
    }

    #[test]
    fn test_debug_lists_counts() {
        let dispatcher = Dispatcher::<Shop>::new();
        dispatcher.on(shop::Sale, |_: &u32| {});
        let rendered = format!("{dispatcher:?}");
        assert!(rendered.contains("Sale"));
        assert!(rendered.contains("max_listeners"));
    }

    /// Hand-written contract binding two payload types to one name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum SplitName {
        Reading,
    }

    impl EventName for SplitName {
        fn as_str(&self) -> &'static str {
            "reading"
        }
    }

    enum Split {}

    impl EventContract for Split {
        type Name = SplitName;

        fn names() -> &'static [SplitName] {
            &[SplitName::Reading]
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct AsCount;

    impl Event for AsCount {
        type Contract = Split;
        type Payload = u32;
        const NAME: SplitName = SplitName::Reading;
    }

    #[derive(Debug, Clone, Copy)]
    struct AsLabel;

    impl Event for AsLabel {
        type Contract = Split;
        type Payload = String;
        const NAME: SplitName = SplitName::Reading;
    }

    #[test]
    fn test_payload_mismatch_fails_before_any_listener_runs() {
        let dispatcher = Dispatcher::<Split>::new();
        let log = new_log();

        dispatcher
            .prepend_once_listener(AsCount, recorder(&log, "once"))
            .on(AsCount, recorder(&log, "count"))
            .on(AsLabel, |_: &String| {});

        let err = dispatcher.emit(AsCount, 1).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::ContractMismatch { event: "reading" }
        ));
        assert!(entries(&log).is_empty());
        // The once entry was not consumed.
        assert_eq!(dispatcher.listener_count_by_name(SplitName::Reading), 3);
    }

    #[test]
    fn test_payload_mismatch_counts_agree_with_snapshots() {
        let dispatcher = Dispatcher::<Split>::new();

        dispatcher
            .on(AsCount, |_: &u32| {})
            .on(AsCount, |_: &u32| {})
            .on(AsLabel, |_: &String| {});

        assert_eq!(dispatcher.listener_count(AsCount), 2);
        assert_eq!(dispatcher.listeners(AsCount).len(), 2);
        assert_eq!(dispatcher.raw_listeners(AsCount).len(), 2);
        assert_eq!(dispatcher.listener_count(AsLabel), 1);
        assert_eq!(dispatcher.listeners(AsLabel).len(), 1);
        assert!(dispatcher.has_listeners(AsLabel));
        assert_eq!(dispatcher.listener_count_by_name(SplitName::Reading), 3);
        assert_eq!(dispatcher.total_listener_count(), 3);
    }

    #[test]
    fn test_dispatcher_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dispatcher<Shop>>();
    }
}
