//! Trigger strategies.
//!
//! Every strategy resolves its name argument (see [`names`](crate::names)),
//! then runs one pass per resolved name:
//!
//! 1. The listeners registered under the name when the pass starts, iterated
//!    live: a listener removed by an earlier one in the same pass is skipped.
//!    Listeners added during the pass first run on the next trigger.
//! 2. The listeners registered under [`ALL_EVENTS`], iterated over a snapshot
//!    taken before the pass starts, with the event name prepended to the
//!    arguments.
//!
//! | Strategy            | Return values            | Stops early            |
//! |---------------------|--------------------------|------------------------|
//! | `trigger`           | ignored                  | on error               |
//! | `trigger_first`     | first reply              | on first reply / error |
//! | `trigger_results`   | every reply, in order    | on error               |
//! | `trigger_then`      | every reply, awaited     | on error               |
//! | `trigger_defer`     | none (runs later)        | -                      |
//!
//! ```rust,ignore
//! use herald_core::{Events, callback, reply, no_reply};
//! use serde_json::json;
//!
//! let events = Events::new();
//! events
//!     .on("x", callback(|_| reply(1)))
//!     .on("x", callback(|_| no_reply()));
//!
//! assert_eq!(events.trigger_first("x", vec![])?.and_then(|r| r.into_value()), Some(json!(1)));
//! assert_eq!(events.trigger_results("x", vec![])?.len(), 1);
//! ```

use std::borrow::Cow;
use std::ops::ControlFlow;
use std::time::Instant;

use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{Level, debug, error, span, trace, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::events::Events;
use crate::listener::{ListenerId, ListenerRecord, Reply};
use crate::names::{EventNames, ResolveOptions, resolve};
use crate::store::ALL_EVENTS;

/// The future returned by [`Events::trigger_then`].
pub type ThenFuture = BoxFuture<'static, DispatchResult<Vec<Value>>>;

/// A single-name call produced by name resolution.
struct Call {
    name: String,
    /// Value a map-style trigger prepends to the arguments.
    lead: Option<Value>,
}

impl Call {
    fn args<'a>(&self, args: &'a [Value]) -> Cow<'a, [Value]> {
        match &self.lead {
            None => Cow::Borrowed(args),
            Some(lead) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push(lead.clone());
                full.extend_from_slice(args);
                Cow::Owned(full)
            }
        }
    }
}

fn resolve_calls(names: EventNames<Value>) -> Vec<Call> {
    let mut calls = Vec::new();
    resolve(names, None, ResolveOptions::<()>::default(), |name, lead, _| {
        calls.push(Call {
            name: name.to_string(),
            lead,
        });
    });
    calls
}

impl Events {
    /// Fires `names`, invoking every listener and ignoring replies.
    ///
    /// The first listener error aborts the call.
    pub fn trigger(
        &self,
        names: impl Into<EventNames<Value>>,
        args: Vec<Value>,
    ) -> DispatchResult<()> {
        if self.store.is_empty() {
            return Ok(());
        }
        for call in resolve_calls(names.into()) {
            let args = call.args(&args);
            self.pass("trigger", &call.name, &args, |_| ControlFlow::Continue(()))?;
        }
        Ok(())
    }

    /// Fires `names` and returns the first reply.
    ///
    /// Listeners after the first one that replies are not invoked, including
    /// wildcard listeners and listeners of later names. Returns `Ok(None)` if
    /// no listener replied.
    pub fn trigger_first(
        &self,
        names: impl Into<EventNames<Value>>,
        args: Vec<Value>,
    ) -> DispatchResult<Option<Reply>> {
        if self.store.is_empty() {
            return Ok(None);
        }
        for call in resolve_calls(names.into()) {
            let args = call.args(&args);
            let mut first = None;
            self.pass("trigger_first", &call.name, &args, |reply| match reply {
                Some(reply) => {
                    first = Some(reply);
                    ControlFlow::Break(())
                }
                None => ControlFlow::Continue(()),
            })?;
            if first.is_some() {
                return Ok(first);
            }
        }
        Ok(None)
    }

    /// Fires `names`, invoking every listener, and returns all replies in
    /// invocation order.
    ///
    /// Listeners that do not reply contribute nothing. The first listener
    /// error aborts the call and discards the replies collected so far.
    pub fn trigger_results(
        &self,
        names: impl Into<EventNames<Value>>,
        args: Vec<Value>,
    ) -> DispatchResult<Vec<Reply>> {
        Ok(self
            .collect_replies("trigger_results", names.into(), args)?
            .into_iter()
            .map(|(_, reply)| reply)
            .collect())
    }

    /// Fires `names` like [`trigger_results`](Self::trigger_results) and
    /// returns a future over every reply.
    ///
    /// Listeners run before this returns. The future resolves to the replies'
    /// values in invocation order once every deferred reply has completed,
    /// or to the first error: a listener error, or the first deferred reply
    /// to fail.
    pub fn trigger_then(
        &self,
        names: impl Into<EventNames<Value>>,
        args: Vec<Value>,
    ) -> ThenFuture {
        let replies = match self.collect_replies("trigger_then", names.into(), args) {
            Ok(replies) => replies,
            Err(err) => return future::ready(Err(err)).boxed(),
        };

        let pending = replies.into_iter().map(|(event, reply)| {
            reply
                .into_future()
                .map_err(move |source| DispatchError::deferred(event, source))
        });
        future::try_join_all(pending).boxed()
    }

    /// Schedules a [`trigger`](Self::trigger) of `names` on a later turn and
    /// returns immediately.
    ///
    /// With a [`Scheduler`](crate::Scheduler) attached, deferred triggers run
    /// in the order they were scheduled. Otherwise the trigger is spawned on
    /// the current tokio runtime. Errors are logged, never returned.
    pub fn trigger_defer(&self, names: impl Into<EventNames<Value>>, args: Vec<Value>) {
        let names = names.into();
        if names.is_empty() {
            return;
        }

        let events = self.clone();
        let job = move || {
            if let Err(err) = events.trigger(names, args) {
                error!(event = err.event(), error = %err, "Deferred trigger failed");
            }
        };

        if let Some(scheduler) = &self.scheduler {
            if let Err(err) = scheduler.schedule(Box::new(job)) {
                error!(error = %err, "Dropping deferred trigger");
            }
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::task::yield_now().await;
                    job();
                });
            }
            Err(_) => error!("No scheduler or tokio runtime available, dropping deferred trigger"),
        }
    }

    fn collect_replies(
        &self,
        strategy: &'static str,
        names: EventNames<Value>,
        args: Vec<Value>,
    ) -> DispatchResult<Vec<(String, Reply)>> {
        let mut replies = Vec::new();
        if self.store.is_empty() {
            return Ok(replies);
        }
        for call in resolve_calls(names) {
            let args = call.args(&args);
            self.pass(strategy, &call.name, &args, |reply| {
                if let Some(reply) = reply {
                    replies.push((call.name.clone(), reply));
                }
                ControlFlow::Continue(())
            })?;
        }
        Ok(replies)
    }

    /// Runs one pass over the listeners of `event`, then the wildcard
    /// listeners, feeding each reply to `visit` until it breaks.
    fn pass<F>(
        &self,
        strategy: &'static str,
        event: &str,
        args: &[Value],
        mut visit: F,
    ) -> DispatchResult<()>
    where
        F: FnMut(Option<Reply>) -> ControlFlow<()>,
    {
        let span = span!(Level::DEBUG, "trigger", strategy, event);
        let _enter = span.enter();

        // Both bounds are fixed before any listener runs.
        let wildcard = self.store.snapshot(ALL_EVENTS);
        let last = self.store.last_id(event);

        let mut cursor: Option<ListenerId> = None;
        while let Some(record) = last.and_then(|last| self.store.next_until(event, cursor, last)) {
            cursor = Some(record.id());
            let reply = self.invoke(&record, event, args)?;
            if visit(reply).is_break() {
                debug!(listener = %record.id(), "Listener replied, stopping pass");
                return Ok(());
            }
        }

        let Some(wildcard) = wildcard else {
            return Ok(());
        };
        let mut all_args = Vec::with_capacity(args.len() + 1);
        all_args.push(Value::String(event.to_string()));
        all_args.extend_from_slice(args);

        for record in &wildcard {
            let reply = self.invoke(record, event, &all_args)?;
            if visit(reply).is_break() {
                debug!(listener = %record.id(), "Wildcard listener replied, stopping pass");
                return Ok(());
            }
        }
        Ok(())
    }

    fn invoke(
        &self,
        record: &ListenerRecord,
        event: &str,
        args: &[Value],
    ) -> DispatchResult<Option<Reply>> {
        trace!(listener = %record.id(), args = args.len(), "Invoking listener");
        let started = self
            .options
            .slow_listener
            .map(|threshold| (threshold, Instant::now()));

        let result = record.invoke(event, args, self.host.as_ref());

        if let Some((threshold, started)) = started {
            let elapsed = started.elapsed();
            if elapsed > threshold {
                warn!(
                    listener = %record.id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "Slow listener"
                );
            }
        }

        result.map_err(|source| DispatchError::listener(event, source))
    }
}
