use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use serde_json::Value;

/// Callback registered for a provider event. Two listeners are the same
/// listener when they share the `Rc` allocation.
pub type Listener = Rc<dyn Fn(&[Value])>;

/// Wraps a closure into a [`Listener`]. Keep the returned handle around to
/// remove the listener later.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&[Value]) + 'static,
{
    Rc::new(f)
}

#[derive(Clone)]
struct Entry {
    listener: Listener,
    once: bool,
}

/// Listener registry keyed by event name. Clones share the same registry.
#[derive(Clone, Default)]
pub struct EventEmitter {
    registry: Rc<RefCell<HashMap<String, Vec<Entry>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event`. Registering the same listener twice
    /// keeps a single entry; `on` turns an earlier `once` into a persistent
    /// registration, never the other way round.
    pub fn on(&self, event: &str, listener: Listener) -> &Self {
        self.insert(event, listener, false)
    }

    pub fn add_listener(&self, event: &str, listener: Listener) -> &Self {
        self.on(event, listener)
    }

    /// Registers `listener` for a single delivery of `event`.
    pub fn once(&self, event: &str, listener: Listener) -> &Self {
        self.insert(event, listener, true)
    }

    pub fn off(&self, event: &str, listener: &Listener) -> &Self {
        self.take(event, listener);
        self
    }

    pub fn remove_listener(&self, event: &str, listener: &Listener) -> &Self {
        self.off(event, listener)
    }

    /// Synchronously delivers `args` to every listener of `event`, returning
    /// whether there were any.
    ///
    /// Delivery runs over a snapshot taken before the first call, so listeners
    /// added or removed by a listener only take effect on the next emission.
    /// One-shot listeners leave the registry before they run; a reentrant
    /// emission will not reach them a second time.
    pub fn emit(&self, event: &str, args: &[Value]) -> bool {
        let snapshot = match self.registry.borrow().get(event) {
            Some(entries) => entries.clone(),
            None => return false,
        };

        for entry in &snapshot {
            if entry.once && !self.take(event, &entry.listener) {
                continue;
            }
            (entry.listener)(args);
        }

        !snapshot.is_empty()
    }

    /// Clears the listeners of `event`, or the whole registry for `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) -> &Self {
        let mut registry = self.registry.borrow_mut();
        match event {
            Some(event) => {
                registry.remove(event);
            }
            None => registry.clear(),
        }
        self
    }

    /// Listeners of `event`, or of every event for `None`.
    pub fn listener_count(&self, event: Option<&str>) -> usize {
        let registry = self.registry.borrow();
        match event {
            Some(event) => registry.get(event).map_or(0, Vec::len),
            None => registry.values().map(Vec::len).sum(),
        }
    }

    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        self.registry
            .borrow()
            .get(event)
            .map(|entries| entries.iter().map(|entry| entry.listener.clone()).collect())
            .unwrap_or_default()
    }

    fn insert(&self, event: &str, listener: Listener, once: bool) -> &Self {
        let mut registry = self.registry.borrow_mut();
        let entries = registry.entry(event.to_string()).or_default();
        match entries.iter_mut().find(|entry| Rc::ptr_eq(&entry.listener, &listener)) {
            Some(entry) => entry.once &= once,
            None => entries.push(Entry { listener, once }),
        }
        self
    }

    fn take(&self, event: &str, listener: &Listener) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(entries) = registry.get_mut(event) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|entry| !Rc::ptr_eq(&entry.listener, listener));
        let removed = entries.len() != before;
        if entries.is_empty() {
            registry.remove(event);
        }
        removed
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_map().entries(registry.iter().map(|(event, entries)| (event, entries.len()))).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, Listener) {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        (calls, listener(move |_| seen.set(seen.get() + 1)))
    }

    #[test]
    fn same_listener_is_registered_once() {
        let emitter = EventEmitter::new();
        let (calls, l) = counter();
        emitter.on("chainChanged", l.clone()).on("chainChanged", l.clone());
        assert_eq!(emitter.listener_count(Some("chainChanged")), 1);

        assert!(emitter.emit("chainChanged", &[json!("0x1")]));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn distinct_closures_are_distinct_listeners() {
        let emitter = EventEmitter::new();
        let (_, a) = counter();
        let (_, b) = counter();
        emitter.on("connect", a).on("connect", b);
        assert_eq!(emitter.listener_count(Some("connect")), 2);
    }

    #[test]
    fn off_removes_by_identity() {
        let emitter = EventEmitter::new();
        let (calls, l) = counter();
        let (_, other) = counter();
        emitter.on("connect", l.clone());
        emitter.off("connect", &other);
        assert_eq!(emitter.listener_count(Some("connect")), 1);

        emitter.remove_listener("connect", &l);
        assert!(!emitter.emit("connect", &[]));
        assert_eq!(calls.get(), 0);
        assert!(emitter.registry.borrow().is_empty());
    }

    #[test]
    fn args_are_passed_through() {
        let emitter = EventEmitter::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        emitter.on("accountsChanged", listener(move |args| sink.borrow_mut().extend_from_slice(args)));

        emitter.emit("accountsChanged", &[json!(["0xabc"]), json!(2)]);
        assert_eq!(*seen.borrow(), vec![json!(["0xabc"]), json!(2)]);
    }

    #[test]
    fn once_fires_a_single_time() {
        let emitter = EventEmitter::new();
        let (calls, l) = counter();
        emitter.once("connect", l);

        assert!(emitter.emit("connect", &[]));
        assert!(!emitter.emit("connect", &[]));
        assert_eq!(calls.get(), 1);
        assert_eq!(emitter.listener_count(Some("connect")), 0);
    }

    #[test]
    fn on_after_once_makes_the_listener_persistent() {
        let emitter = EventEmitter::new();
        let (calls, l) = counter();
        emitter.once("connect", l.clone()).on("connect", l.clone());
        assert_eq!(emitter.listener_count(Some("connect")), 1);

        emitter.emit("connect", &[]);
        emitter.emit("connect", &[]);
        assert_eq!(calls.get(), 2);
        assert_eq!(emitter.listener_count(Some("connect")), 1);
    }

    #[test]
    fn once_after_on_stays_persistent() {
        let emitter = EventEmitter::new();
        let (calls, l) = counter();
        emitter.on("connect", l.clone()).once("connect", l);

        emitter.emit("connect", &[]);
        emitter.emit("connect", &[]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn once_listener_can_be_removed_before_firing() {
        let emitter = EventEmitter::new();
        let (calls, l) = counter();
        emitter.once("connect", l.clone());
        emitter.off("connect", &l);
        emitter.emit("connect", &[]);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn reentrant_emit_does_not_repeat_once_listener() {
        let emitter = EventEmitter::new();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let inner = emitter.clone();
        emitter.once(
            "chainChanged",
            listener(move |_| {
                seen.set(seen.get() + 1);
                inner.emit("chainChanged", &[]);
            }),
        );

        emitter.emit("chainChanged", &[]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn listeners_added_during_emit_wait_for_next_emit() {
        let emitter = EventEmitter::new();
        let (late_calls, late) = counter();
        let inner = emitter.clone();
        emitter.on(
            "connect",
            listener(move |_| {
                inner.on("connect", late.clone());
            }),
        );

        emitter.emit("connect", &[]);
        assert_eq!(late_calls.get(), 0);
        emitter.emit("connect", &[]);
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn remove_all_listeners() {
        let emitter = EventEmitter::new();
        let (_, a) = counter();
        let (_, b) = counter();
        emitter.on("connect", a.clone()).on("disconnect", b).on("chainChanged", a);

        emitter.remove_all_listeners(Some("connect"));
        assert_eq!(emitter.listener_count(Some("connect")), 0);
        assert_eq!(emitter.listener_count(None), 2);

        emitter.remove_all_listeners(None);
        assert_eq!(emitter.listener_count(None), 0);
    }

    #[test]
    fn listeners_returns_registered_handles() {
        let emitter = EventEmitter::new();
        let (_, l) = counter();
        emitter.on("connect", l.clone());
        let registered = emitter.listeners("connect");
        assert_eq!(registered.len(), 1);
        assert!(Rc::ptr_eq(&registered[0], &l));
        assert!(emitter.listeners("disconnect").is_empty());
    }
}
