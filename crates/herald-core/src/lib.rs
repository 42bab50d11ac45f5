//! # Herald Core
//!
//! The dispatch engine of the Herald event library.
//!
//! Listeners register interest in named events on an [`Events`] host; the
//! host fires them under one of five strategies:
//!
//! - [`Events::trigger`]: invoke everyone, ignore replies
//! - [`Events::trigger_first`]: stop at the first listener that replies
//! - [`Events::trigger_results`]: collect every reply in order
//! - [`Events::trigger_then`]: collect every reply and await them together
//! - [`Events::trigger_defer`]: `trigger` on a later scheduler turn
//!
//! ## Layout
//!
//! - [`names`]: resolves `"a b"` and `name → value` maps into single names
//! - [`listener`]: callbacks, replies and listener records
//! - [`store`]: the ordered, shared listener store
//! - [`events`]: the host and its registration API (`on`, `once`, `off`)
//! - [`dispatcher`]: the trigger strategies
//! - [`scheduler`]: FIFO worker behind `trigger_defer`
//!
//! ## Example
//!
//! ```rust,ignore
//! use herald_core::{Events, callback, reply};
//! use serde_json::json;
//!
//! let events = Events::new();
//! events.on("price", callback(|inv| {
//!     let n = inv.arg(0).and_then(|v| v.as_f64()).unwrap_or(0.0);
//!     reply(json!(n * 1.2))
//! }));
//!
//! let quotes = events.trigger_results("price", vec![json!(10.0)])?;
//! assert_eq!(quotes.len(), 1);
//! ```

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod listener;
pub mod names;
pub mod scheduler;
pub mod store;

pub use dispatcher::ThenFuture;
pub use error::{DispatchError, DispatchResult, ScheduleError, ScheduleResult};
pub use events::{DispatchOptions, Events};
pub use listener::{
    Callback, DeferredReply, Invocation, ListenerId, ListenerRecord, ListenerResult, Receiver,
    Reply, callback, no_reply, reply, reply_later,
};
pub use names::{EventNames, ResolveOptions};
pub use scheduler::{DEFAULT_QUEUE_CAPACITY, Job, Scheduler};
pub use store::{ALL_EVENTS, ListenerStore, WeakListenerStore};

// Payload values are JSON values.
pub use serde_json::{Value, json};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        ALL_EVENTS, Callback, DispatchError, DispatchResult, EventNames, Events, Invocation,
        Receiver, Reply, Scheduler, Value, callback, json, no_reply, reply, reply_later,
    };
}
