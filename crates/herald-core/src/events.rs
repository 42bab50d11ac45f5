//! The [`Events`] host: listener registration and lookup.
//!
//! `Events` owns a [`ListenerStore`] and exposes the registration side of the
//! API (`on`, `once`, `off`). The trigger strategies live in
//! [`dispatcher`](crate::dispatcher).
//!
//! ```rust,ignore
//! use herald_core::{Events, callback, reply};
//!
//! let events = Events::new();
//! events
//!     .on("change:title change:body", callback(|inv| reply(inv.event())))
//!     .once("destroy", callback(|_| reply(true)));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::trace;

use crate::listener::{self, Callback, ListenerId, ListenerRecord, Receiver};
use crate::names::{EventNames, ResolveOptions, resolve, split_names};
use crate::scheduler::Scheduler;
use crate::store::ListenerStore;

/// Tuning knobs for dispatch.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Log a warning when a single listener runs longer than this.
    pub slow_listener: Option<Duration>,
}

/// An event host: a listener store plus the dispatch settings used to fire it.
///
/// Cloning is cheap and yields a handle to the same store, so listeners can
/// capture a clone to register, unregister or trigger from inside a pass.
#[derive(Clone, Default)]
pub struct Events {
    pub(crate) store: ListenerStore,
    pub(crate) host: Option<Receiver>,
    pub(crate) scheduler: Option<Scheduler>,
    pub(crate) options: DispatchOptions,
}

impl Events {
    /// Creates a host with an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the receiver used for listeners registered without a context.
    pub fn with_host(mut self, host: Receiver) -> Self {
        self.host = Some(host);
        self
    }

    /// Routes `trigger_defer` through the given scheduler.
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Replaces the dispatch options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// The underlying listener store.
    pub fn store(&self) -> &ListenerStore {
        &self.store
    }

    /// The fallback receiver, if any.
    pub fn host(&self) -> Option<&Receiver> {
        self.host.as_ref()
    }

    /// The attached scheduler, if any.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    /// The dispatch options.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers `callback` for each of the whitespace-separated `names`.
    pub fn on(&self, names: &str, callback: Callback) -> &Self {
        self.register(
            EventNames::from(names),
            Some(callback),
            ResolveOptions::default(),
            false,
        )
    }

    /// Registers `callback` bound to `context`.
    pub fn on_with(&self, names: &str, callback: Callback, context: Receiver) -> &Self {
        self.register(
            EventNames::from(names),
            Some(callback),
            ResolveOptions::with_context(Some(context)),
            false,
        )
    }

    /// Registers each `name → callback` entry, all bound to `context`.
    pub fn on_map(&self, map: impl Into<EventNames<Callback>>, context: Option<Receiver>) -> &Self {
        self.register(map.into(), None, ResolveOptions::with_map_context(context), false)
    }

    /// Registers `callback` to run at most once per name.
    pub fn once(&self, names: &str, callback: Callback) -> &Self {
        self.register(
            EventNames::from(names),
            Some(callback),
            ResolveOptions::default(),
            true,
        )
    }

    /// Registers a run-once `callback` bound to `context`.
    pub fn once_with(&self, names: &str, callback: Callback, context: Receiver) -> &Self {
        self.register(
            EventNames::from(names),
            Some(callback),
            ResolveOptions::with_context(Some(context)),
            true,
        )
    }

    /// Registers each `name → callback` entry to run at most once.
    pub fn once_map(
        &self,
        map: impl Into<EventNames<Callback>>,
        context: Option<Receiver>,
    ) -> &Self {
        self.register(map.into(), None, ResolveOptions::with_map_context(context), true)
    }

    /// Removes listeners.
    ///
    /// Each argument narrows the match; `None` matches anything, so
    /// `off(None, None, None)` removes every listener.
    pub fn off(
        &self,
        names: Option<&str>,
        callback: Option<&Callback>,
        context: Option<&Receiver>,
    ) -> &Self {
        let removed = match names {
            None if callback.is_none() && context.is_none() => {
                let total = self.store.total();
                self.store.clear();
                total
            }
            None => self.store.remove(None, callback, context),
            Some(names) => split_names(names)
                .map(|name| self.store.remove(Some(name), callback, context))
                .sum::<usize>(),
        };
        trace!(removed, "Listeners removed");
        self
    }

    /// Removes every listener.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Returns `true` if any listener is registered under `name`.
    pub fn has_listeners(&self, name: &str) -> bool {
        self.store.contains(name)
    }

    /// Number of listeners registered under `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.store.len(name)
    }

    /// Names with at least one listener, sorted.
    pub fn event_names(&self) -> Vec<String> {
        self.store.names()
    }

    /// The listeners registered under `name`, in invocation order.
    pub fn listeners(&self, name: &str) -> Vec<ListenerRecord> {
        self.store.snapshot(name).unwrap_or_default()
    }

    fn register(
        &self,
        names: EventNames<Callback>,
        callback: Option<Callback>,
        options: ResolveOptions<Receiver>,
        once: bool,
    ) -> &Self {
        resolve(names, callback, options, |name, callback, context| {
            let Some(callback) = callback else {
                return;
            };
            let id = if once {
                self.insert_once(name, callback, context)
            } else {
                self.store.insert(name, callback, context)
            };
            trace!(event = name, listener = %id, once, "Listener registered");
        });
        self
    }

    fn insert_once(
        &self,
        name: &str,
        callback: Callback,
        context: Option<Receiver>,
    ) -> ListenerId {
        let store = self.store.downgrade();
        let owned_name = name.to_string();
        let inner = Arc::clone(&callback);

        self.store.insert_with(name, move |id| {
            let fired = AtomicBool::new(false);
            let wrapper = listener::callback(move |inv| {
                if fired.swap(true, Ordering::SeqCst) {
                    return Ok(None);
                }
                if let Some(store) = store.upgrade() {
                    store.remove_id(&owned_name, id);
                }
                inner(inv)
            });
            ListenerRecord::wrapped(id, wrapper, callback, context)
        })
    }
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("store", &self.store)
            .field("has_host", &self.host.is_some())
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish()
    }
}
