//! # Handlers receiving dispatched payloads.
//!
//! This module provides the [`Handler`] trait and helpers:
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler<T>>`);
//! - [`HandlerId`] - reference-identity token used by `unsubscribe`;
//! - [`HandlerFn`] - closure-backed handler;
//! - `LogHandler` - tracing-backed handler (feature `logging`).

mod handler;
mod handler_fn;
#[cfg(feature = "logging")]
mod log;

pub use handler::{Handler, HandlerId, HandlerRef};
pub use handler_fn::HandlerFn;
#[cfg(feature = "logging")]
pub use log::LogHandler;
