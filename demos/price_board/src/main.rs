//! Price Board Example
//!
//! Vendors register quote listeners on a shared `Events` host, and a board
//! asks them for prices using each trigger strategy:
//!
//! ```text
//! "quote"   ──▶ trigger_first    cheapest vendor that answers first
//! "quote"   ──▶ trigger_results  every immediate quote
//! "stock"   ──▶ trigger_then     quotes that need a warehouse lookup
//! "sold"    ──▶ trigger_defer    audit log on a later turn
//! "all"     ──▶ every event, with its name prepended
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package price-board
//! ```

use std::time::Duration;

use anyhow::Result;
use herald::prelude::*;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::info;

fn register_vendors(events: &Events) {
    events.on(
        "quote",
        callback(|inv| {
            let item = inv.arg(0).and_then(Value::as_str).unwrap_or_default();
            if item == "widget" {
                reply(json!({ "vendor": "acme", "price": 9.5 }))
            } else {
                no_reply()
            }
        }),
    );

    events.on(
        "quote",
        callback(|_| reply(json!({ "vendor": "globex", "price": 11.0 }))),
    );

    events.on(
        "stock",
        callback(|inv| {
            let item = inv.arg(0).cloned().unwrap_or(Value::Null);
            reply_later(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!({ "vendor": "acme", "item": item, "in_stock": 42 }))
            })
        }),
    );

    events.on("stock", callback(|_| reply(json!({ "vendor": "globex", "in_stock": 0 }))));
}

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = HeraldRuntime::new();
    let events = runtime.events();

    register_vendors(&events);

    events.on(
        ALL_EVENTS,
        callback(|inv| {
            info!(event = ?inv.arg(0), "Board activity");
            no_reply()
        }),
    );

    let first = events.trigger_first("quote", vec![json!("widget")])?;
    info!(quote = ?first.and_then(Reply::into_value), "First quote");

    let quotes: Vec<Value> = events
        .trigger_results("quote", vec![json!("gadget")])?
        .into_iter()
        .filter_map(Reply::into_value)
        .collect();
    info!(?quotes, "All quotes");

    let stock = events.trigger_then("stock", vec![json!("widget")]).await?;
    info!(?stock, "Stock levels");

    let (done_tx, done_rx) = oneshot::channel();
    {
        let done_tx = Mutex::new(Some(done_tx));
        events.once(
            "sold",
            callback(move |inv| {
                info!(args = ?inv.args(), "Audit: sale recorded");
                if let Some(tx) = done_tx.lock().take() {
                    let _ = tx.send(());
                }
                no_reply()
            }),
        );
    }
    events.trigger_defer("sold", vec![json!("widget"), json!(9.5)]);
    info!("Sale queued");
    done_rx.await?;

    runtime.shutdown();
    Ok(())
}
