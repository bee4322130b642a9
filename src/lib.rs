//! # topicbus
//!
//! **topicbus** is an in-process, topic-addressed publish/subscribe dispatcher.
//!
//! Callers register handlers against string topics; later dispatches push typed
//! payloads to every handler on that topic. Handlers can be persistent or fire once,
//! and a reserved wildcard topic can receive (or be excluded from) every dispatch.
//! The crate is built for many threads subscribing, unsubscribing and dispatching at
//! the same time without races, double fires or lost updates.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     caller A           caller B           caller C
//!   subscribe()        dispatch()        unsubscribe()
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Bus<T>                                                           │
//! │  - TopicMap (sharded: topic → copy-on-write TopicBucket)          │
//! │  - wildcard toggle                                                │
//! │  - StopNotifier (background on_stop delivery)                     │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   TopicBucket "a"    TopicBucket "b"    TopicBucket "*"
//!   [reg, reg, ...]    [reg, ...]         [reg, ...]
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//!   handler.dispatch(topic, payloads)   (on the dispatching caller's thread)
//!
//!   removed registrations ──► StopNotifier ──► handler.on_stop(topic)
//! ```
//!
//! ### Registration lifecycle
//! ```text
//! subscribe / subscribe_once ──► Registration { NotFired }
//!
//! dispatch:
//!   ├─ persistent ─► handler.dispatch() every time
//!   └─ once ───────► CAS NotFired → Fired ── winner ─► handler.dispatch()
//!                                                   └► pruned from bucket
//!
//! removal (unsubscribe / once pruned / clear / last Bus dropped):
//!   └─► Removed ─► exactly one on_stop(topic), off the caller's path,
//!                  after any dispatch still running into it has returned
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                 |
//! |-------------------|--------------------------------------------------------------|------------------------------------|
//! | **Dispatch**      | Subscribe, dispatch, broadcast, once-handlers, wildcard.     | [`Bus`], [`WILDCARD`]              |
//! | **Handlers**      | Implement a trait or wrap a closure; identity by reference.  | [`Handler`], [`HandlerFn`], [`HandlerId`] |
//! | **Configuration** | Initial wildcard toggle, notifier placement.                 | [`BusConfig`], [`BusBuilder`]      |
//! | **Errors**        | Construction failures only; bus operations never fail.      | [`BusError`]                       |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in `LogHandler` _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use topicbus::{Bus, BusConfig, Handler, HandlerRef};
//!
//! struct Counter(AtomicUsize);
//!
//! impl Handler<String> for Counter {
//!     fn dispatch(&self, _topic: &str, payloads: &[String]) {
//!         self.0.fetch_add(payloads.len(), Ordering::SeqCst);
//!     }
//! }
//!
//! let bus: Bus<String> = Bus::new(BusConfig::default()).unwrap();
//! let counter = Arc::new(Counter(AtomicUsize::new(0)));
//! let handler: HandlerRef<String> = counter.clone();
//!
//! bus.subscribe("orders", handler.clone())
//!     .subscribe_once("init", handler)
//!     .dispatch("orders", &["created".into(), "paid".into()])
//!     .dispatch("init", &["boot".into()])
//!     .dispatch("init", &["again".into()]);
//!
//! assert_eq!(counter.0.load(Ordering::SeqCst), 3);
//! assert_eq!(bus.count("init"), 0);
//! assert_eq!(bus.total(), 1);
//! ```
mod core;
mod error;
mod handlers;
mod topics;

// ---- Public re-exports ----

pub use self::core::{Bus, BusBuilder, BusConfig, DEFAULT_NOTIFIER_THREAD, WILDCARD};
pub use error::BusError;
pub use handlers::{Handler, HandlerFn, HandlerId, HandlerRef};

// Optional: expose a simple built-in tracing handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogHandler;
