//! Listener types.
//!
//! A listener is a type-erased callback plus an optional receiver it is bound
//! to. Callbacks receive an [`Invocation`] describing the fired event and
//! return a [`ListenerResult`]:
//!
//! - `Ok(None)`: no reply (filtered out by `trigger_first`, `trigger_results`
//!   and `trigger_then`)
//! - `Ok(Some(Reply::Value(..)))`: an immediate reply, `null` included
//! - `Ok(Some(Reply::Deferred(..)))`: a reply that completes later
//! - `Err(..)`: the listener failed
//!
//! ```rust,ignore
//! use herald_core::listener::{callback, reply};
//! use serde_json::json;
//!
//! let double = callback(|inv| {
//!     let n = inv.arg(0).and_then(|v| v.as_i64()).unwrap_or(0);
//!     reply(json!(n * 2))
//! });
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

/// A receiver a listener is bound to.
pub type Receiver = Arc<dyn Any + Send + Sync>;

/// What a listener returns.
pub type ListenerResult = anyhow::Result<Option<Reply>>;

/// A type-erased listener callback.
pub type Callback = Arc<dyn Fn(&Invocation<'_>) -> ListenerResult + Send + Sync>;

/// A reply that completes later.
pub type DeferredReply = BoxFuture<'static, anyhow::Result<Value>>;

/// Wraps a closure into a [`Callback`].
///
/// The returned `Arc` is also the listener's identity for `off`.
pub fn callback<F>(f: F) -> Callback
where
    F: Fn(&Invocation<'_>) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Shorthand for an immediate reply.
pub fn reply(value: impl Into<Value>) -> ListenerResult {
    Ok(Some(Reply::Value(value.into())))
}

/// Shorthand for a deferred reply.
pub fn reply_later<F>(future: F) -> ListenerResult
where
    F: Future<Output = anyhow::Result<Value>> + Send + 'static,
{
    Ok(Some(Reply::deferred(future)))
}

/// Shorthand for "no reply".
pub fn no_reply() -> ListenerResult {
    Ok(None)
}

// ============================================================================
// Reply
// ============================================================================

/// A value returned by a listener.
pub enum Reply {
    /// An immediate value.
    Value(Value),
    /// A value that completes later.
    Deferred(DeferredReply),
}

impl Reply {
    /// Creates a deferred reply from any `Send` future.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// Returns the immediate value, if this reply has one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// Consumes the reply, returning the immediate value if there is one.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    /// Returns `true` for deferred replies.
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    /// Converts the reply into a future; immediate values are already complete.
    pub fn into_future(self) -> DeferredReply {
        match self {
            Self::Value(value) => futures::future::ready(Ok(value)).boxed(),
            Self::Deferred(future) => future,
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// The view of a trigger call a listener receives.
#[derive(Clone, Copy)]
pub struct Invocation<'a> {
    event: &'a str,
    args: &'a [Value],
    context: Option<&'a Receiver>,
}

impl<'a> Invocation<'a> {
    /// Creates an invocation.
    pub fn new(event: &'a str, args: &'a [Value], context: Option<&'a Receiver>) -> Self {
        Self {
            event,
            args,
            context,
        }
    }

    /// The fired event name.
    pub fn event(&self) -> &'a str {
        self.event
    }

    /// The positional arguments.
    ///
    /// Wildcard listeners see the fired event name as the first argument.
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// The positional argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    /// The receiver this listener is bound to.
    pub fn context(&self) -> Option<&'a Receiver> {
        self.context
    }

    /// Downcasts the receiver to a concrete type.
    pub fn context_as<T: Any>(&self) -> Option<&'a T> {
        self.context.and_then(|ctx| ctx.downcast_ref::<T>())
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("event", &self.event)
            .field("args", &self.args)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

// ============================================================================
// Listener Record
// ============================================================================

/// Identifier of a registered listener.
///
/// Ids are allocated by the store under its write lock, so within one event's
/// list they increase in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered listener: callback plus optional receiver.
#[derive(Clone)]
pub struct ListenerRecord {
    id: ListenerId,
    callback: Callback,
    /// Identity used by `off`; differs from `callback` for `once` wrappers.
    matcher: Callback,
    context: Option<Receiver>,
}

impl ListenerRecord {
    pub(crate) fn new(id: ListenerId, callback: Callback, context: Option<Receiver>) -> Self {
        Self {
            id,
            matcher: Arc::clone(&callback),
            callback,
            context,
        }
    }

    pub(crate) fn wrapped(
        id: ListenerId,
        callback: Callback,
        matcher: Callback,
        context: Option<Receiver>,
    ) -> Self {
        Self {
            id,
            callback,
            matcher,
            context,
        }
    }

    /// The listener's id.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// The callback as originally registered.
    pub fn callback(&self) -> &Callback {
        &self.matcher
    }

    /// The bound receiver, if any.
    pub fn context(&self) -> Option<&Receiver> {
        self.context.as_ref()
    }

    /// Returns `true` if this record matches the given callback and receiver.
    ///
    /// `None` matches anything. Identity is pointer identity of the `Arc`.
    pub fn matches(&self, callback: Option<&Callback>, context: Option<&Receiver>) -> bool {
        callback.is_none_or(|cb| Arc::ptr_eq(cb, &self.matcher))
            && context.is_none_or(|ctx| {
                self.context
                    .as_ref()
                    .is_some_and(|own| Arc::ptr_eq(ctx, own))
            })
    }

    /// Invokes the listener, binding its receiver or falling back to `host`.
    pub fn invoke(&self, event: &str, args: &[Value], host: Option<&Receiver>) -> ListenerResult {
        let context = self.context.as_ref().or(host);
        (self.callback)(&Invocation::new(event, args, context))
    }
}

impl fmt::Debug for ListenerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRecord")
            .field("id", &self.id)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invoke_binds_own_context_before_host() {
        let own: Receiver = Arc::new("own");
        let host: Receiver = Arc::new("host");
        let cb = callback(|inv| reply(json!(*inv.context_as::<&str>().unwrap_or(&"none"))));

        let bound = ListenerRecord::new(ListenerId::new(1), Arc::clone(&cb), Some(own));
        let unbound = ListenerRecord::new(ListenerId::new(2), cb, None);

        let got = bound.invoke("x", &[], Some(&host)).unwrap().unwrap();
        assert_eq!(got.as_value(), Some(&json!("own")));

        let got = unbound.invoke("x", &[], Some(&host)).unwrap().unwrap();
        assert_eq!(got.as_value(), Some(&json!("host")));

        let got = unbound.invoke("x", &[], None).unwrap().unwrap();
        assert_eq!(got.as_value(), Some(&json!("none")));
    }

    #[test]
    fn test_matches_by_identity() {
        let a = callback(|_| no_reply());
        let b = callback(|_| no_reply());
        let ctx: Receiver = Arc::new(1_u32);
        let record = ListenerRecord::new(ListenerId::new(1), Arc::clone(&a), Some(Arc::clone(&ctx)));

        assert!(record.matches(None, None));
        assert!(record.matches(Some(&a), None));
        assert!(record.matches(Some(&a), Some(&ctx)));
        assert!(!record.matches(Some(&b), None));
        assert!(!record.matches(None, Some(&(Arc::new(1_u32) as Receiver))));

        let unbound = ListenerRecord::new(ListenerId::new(2), a, None);
        assert!(!unbound.matches(None, Some(&ctx)));
    }

    #[test]
    fn test_once_wrapper_keeps_original_identity() {
        let original = callback(|_| reply(1));
        let wrapper = callback(|_| no_reply());
        let record = ListenerRecord::wrapped(
            ListenerId::new(3),
            Arc::clone(&wrapper),
            Arc::clone(&original),
            None,
        );

        assert!(record.matches(Some(&original), None));
        assert!(!record.matches(Some(&wrapper), None));
        assert!(Arc::ptr_eq(record.callback(), &original));
        assert!(record.invoke("x", &[], None).unwrap().is_none());
    }

    #[test]
    fn test_null_reply_is_a_value() {
        let got = reply(Value::Null).unwrap();
        assert!(matches!(got, Some(Reply::Value(Value::Null))));
        assert!(no_reply().unwrap().is_none());
    }

    #[test]
    fn test_reply_into_future() {
        let value = tokio_test::block_on(Reply::Value(json!(3)).into_future()).unwrap();
        assert_eq!(value, json!(3));

        let deferred = Reply::deferred(async { Ok(json!("later")) });
        assert!(deferred.is_deferred());
        assert!(deferred.as_value().is_none());
        let value = tokio_test::block_on(deferred.into_future()).unwrap();
        assert_eq!(value, json!("later"));
    }
}
