//! # Herald
//!
//! In-process publish/subscribe for Rust, in the style of Backbone events.
//!
//! ## Overview
//!
//! Listeners subscribe to named events on an `Events` host. Triggers fan a
//! call out to every listener of each name, then to the `"all"` listeners
//! with the event name prepended:
//!
//! ```text
//! trigger("a b", args) ──▶ listeners["a"] ──▶ listeners["all"] ("a", args...)
//!                     └──▶ listeners["b"] ──▶ listeners["all"] ("b", args...)
//! ```
//!
//! Five strategies decide what happens to listener replies:
//!
//! - `trigger`: replies are ignored
//! - `trigger_first`: the first reply wins and dispatch stops
//! - `trigger_results`: every reply is collected in order
//! - `trigger_then`: every reply is awaited together
//! - `trigger_defer`: `trigger` on a later turn of the scheduler
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use herald::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = HeraldRuntime::new();
//!     let events = runtime.events();
//!
//!     events.on("quote", callback(|inv| reply(json!({ "for": inv.arg(0) }))));
//!     let quote = events.trigger_first("quote", vec![json!("widget")])?;
//!
//!     runtime.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `herald.toml` files (default)
//! - `yaml-config`: read `herald.yaml` files
//! - `json-log`: JSON log output

pub use herald_core as core;
pub use herald_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use herald::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use herald_runtime::{HeraldConfig, HeraldRuntime};

    // Events host and listener building blocks
    pub use herald_core::{
        ALL_EVENTS, Callback, DispatchError, DispatchResult, EventNames, Events, Invocation,
        Receiver, Reply, Value, callback, json, no_reply, reply, reply_later,
    };
}
