//! The listener store.
//!
//! Maps event names to ordered listener lists. The store is shared between an
//! [`Events`](crate::Events) handle, its clones and any `once` wrappers, so it
//! lives behind `Arc<RwLock<..>>`. Locks are only held for the duration of a
//! lookup or mutation, never while a listener runs.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::listener::{Callback, ListenerId, ListenerRecord, Receiver};

/// The reserved event name whose listeners fire for every event.
pub const ALL_EVENTS: &str = "all";

#[derive(Default)]
struct StoreState {
    events: HashMap<String, Vec<ListenerRecord>>,
    next_id: u64,
}

impl StoreState {
    fn allocate_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId::new(self.next_id)
    }
}

/// Shared, ordered mapping from event name to listeners.
#[derive(Clone, Default)]
pub struct ListenerStore {
    state: Arc<RwLock<StoreState>>,
}

/// A non-owning handle to a [`ListenerStore`].
#[derive(Clone, Default)]
pub struct WeakListenerStore {
    state: Weak<RwLock<StoreState>>,
}

impl WeakListenerStore {
    /// Upgrades to a strong handle if the store is still alive.
    pub fn upgrade(&self) -> Option<ListenerStore> {
        self.state.upgrade().map(|state| ListenerStore { state })
    }
}

impl ListenerStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a weak handle to this store.
    pub fn downgrade(&self) -> WeakListenerStore {
        WeakListenerStore {
            state: Arc::downgrade(&self.state),
        }
    }

    /// Returns `true` if no listener is registered under any name.
    pub fn is_empty(&self) -> bool {
        self.state.read().events.is_empty()
    }

    /// Returns `true` if at least one listener is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().events.contains_key(name)
    }

    /// Number of listeners registered under `name`.
    pub fn len(&self, name: &str) -> usize {
        self.state.read().events.get(name).map_or(0, Vec::len)
    }

    /// Total number of listeners across all names.
    pub fn total(&self) -> usize {
        self.state.read().events.values().map(Vec::len).sum()
    }

    /// All names with at least one listener, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.read().events.keys().cloned().collect();
        names.sort();
        names
    }

    /// Appends a listener under `name`.
    pub fn insert(&self, name: &str, callback: Callback, context: Option<Receiver>) -> ListenerId {
        self.insert_with(name, |id| ListenerRecord::new(id, callback, context))
    }

    /// Appends the record built by `make` under `name`.
    ///
    /// `make` receives the id the record must carry and runs under the write
    /// lock; it must not touch the store.
    pub(crate) fn insert_with<F>(&self, name: &str, make: F) -> ListenerId
    where
        F: FnOnce(ListenerId) -> ListenerRecord,
    {
        let mut state = self.state.write();
        let id = state.allocate_id();
        let record = make(id);
        debug_assert_eq!(record.id(), id);
        state
            .events
            .entry(name.to_string())
            .or_default()
            .push(record);
        id
    }

    /// The id of the most recently registered listener under `name`.
    pub fn last_id(&self, name: &str) -> Option<ListenerId> {
        self.state
            .read()
            .events
            .get(name)
            .and_then(|list| list.last())
            .map(ListenerRecord::id)
    }

    /// The first listener under `name` registered after `after`.
    ///
    /// With `after = None` this is the first listener. Reading one record at a
    /// time lets a dispatch pass observe removals made by the listeners it
    /// invokes.
    pub fn next_after(&self, name: &str, after: Option<ListenerId>) -> Option<ListenerRecord> {
        let state = self.state.read();
        let list = state.events.get(name)?;
        let pos = after.map_or(0, |after| list.partition_point(|r| r.id() <= after));
        list.get(pos).cloned()
    }

    /// Like [`next_after`](Self::next_after), ignoring listeners registered
    /// after `until`.
    pub fn next_until(
        &self,
        name: &str,
        after: Option<ListenerId>,
        until: ListenerId,
    ) -> Option<ListenerRecord> {
        self.next_after(name, after).filter(|r| r.id() <= until)
    }

    /// A copy of the listeners under `name`.
    pub fn snapshot(&self, name: &str) -> Option<Vec<ListenerRecord>> {
        self.state.read().events.get(name).cloned()
    }

    /// Removes matching listeners.
    ///
    /// `name = None` searches every name; `callback` and `context` narrow the
    /// match (see [`ListenerRecord::matches`]). Names left without listeners
    /// are dropped. Returns the number of listeners removed.
    pub fn remove(
        &self,
        name: Option<&str>,
        callback: Option<&Callback>,
        context: Option<&Receiver>,
    ) -> usize {
        let mut state = self.state.write();
        let mut removed = 0;
        let mut prune = |list: &mut Vec<ListenerRecord>| {
            let before = list.len();
            list.retain(|r| !r.matches(callback, context));
            removed += before - list.len();
        };

        match name {
            Some(name) => {
                if let Some(list) = state.events.get_mut(name) {
                    prune(list);
                }
            }
            None => state.events.values_mut().for_each(&mut prune),
        }

        state.events.retain(|_, list| !list.is_empty());
        removed
    }

    /// Removes the listener with the given id from `name`.
    pub fn remove_id(&self, name: &str, id: ListenerId) -> bool {
        let mut state = self.state.write();
        let Some(list) = state.events.get_mut(name) else {
            return false;
        };
        let Ok(pos) = list.binary_search_by_key(&id, ListenerRecord::id) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            state.events.remove(name);
        }
        true
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.state.write().events.clear();
    }
}

impl std::fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("ListenerStore")
            .field("names", &state.events.len())
            .field(
                "listeners",
                &state.events.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{callback, no_reply};

    fn noop() -> Callback {
        callback(|_| no_reply())
    }

    #[test]
    fn test_insert_preserves_order() {
        let store = ListenerStore::new();
        let a = store.insert("x", noop(), None);
        let b = store.insert("x", noop(), None);
        let c = store.insert("y", noop(), None);

        assert!(a < b && b < c);
        assert_eq!(store.len("x"), 2);
        assert_eq!(store.total(), 3);
        assert_eq!(store.names(), ["x", "y"]);

        let ids: Vec<_> = store.snapshot("x").unwrap().iter().map(|r| r.id()).collect();
        assert_eq!(ids, [a, b]);
    }

    #[test]
    fn test_next_after_walks_live_list() {
        let store = ListenerStore::new();
        let a = store.insert("x", noop(), None);
        let b = store.insert("x", noop(), None);
        let c = store.insert("x", noop(), None);

        assert_eq!(store.next_after("x", None).map(|r| r.id()), Some(a));
        assert_eq!(store.next_after("x", Some(a)).map(|r| r.id()), Some(b));

        // Removing the current listener does not skip its successor.
        store.remove_id("x", b);
        assert_eq!(store.next_after("x", Some(b)).map(|r| r.id()), Some(c));

        // Removing a later listener skips it.
        store.remove_id("x", c);
        assert!(store.next_after("x", Some(b)).is_none());

        // Appended listeners become visible.
        let d = store.insert("x", noop(), None);
        assert_eq!(store.next_after("x", Some(b)).map(|r| r.id()), Some(d));
        assert!(store.next_after("missing", None).is_none());
    }

    #[test]
    fn test_next_until_ignores_later_appends() {
        let store = ListenerStore::new();
        assert!(store.last_id("x").is_none());

        let a = store.insert("x", noop(), None);
        let b = store.insert("x", noop(), None);
        let last = store.last_id("x").unwrap();
        assert_eq!(last, b);

        store.insert("x", noop(), None);
        assert_eq!(store.next_until("x", Some(a), last).map(|r| r.id()), Some(b));
        assert!(store.next_until("x", Some(b), last).is_none());
    }

    #[test]
    fn test_remove_by_callback_and_context() {
        let store = ListenerStore::new();
        let shared = noop();
        let ctx: Receiver = Arc::new("ctx");

        store.insert("a", Arc::clone(&shared), None);
        store.insert("a", Arc::clone(&shared), Some(Arc::clone(&ctx)));
        store.insert("b", Arc::clone(&shared), Some(Arc::clone(&ctx)));
        store.insert("b", noop(), None);

        assert_eq!(store.remove(None, Some(&shared), Some(&ctx)), 2);
        assert_eq!(store.len("a"), 1);
        assert_eq!(store.len("b"), 1);

        assert_eq!(store.remove(Some("a"), None, None), 1);
        assert!(!store.contains("a"));
        assert_eq!(store.names(), ["b"]);
    }

    #[test]
    fn test_remove_id_and_clear() {
        let store = ListenerStore::new();
        let id = store.insert("a", noop(), None);
        assert!(store.remove_id("a", id));
        assert!(!store.remove_id("a", id));
        assert!(store.is_empty());

        store.insert("a", noop(), None);
        store.insert("b", noop(), None);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_weak_handle() {
        let store = ListenerStore::new();
        let weak = store.downgrade();
        assert!(weak.upgrade().is_some());
        drop(store);
        assert!(weak.upgrade().is_none());
    }
}
