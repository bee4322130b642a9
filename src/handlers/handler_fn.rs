//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&str, &[T])` so simple handlers do not need a
//! dedicated type. An optional stop closure is attached with [`HandlerFn::on_stop`].
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use topicbus::{Handler, HandlerFn, HandlerRef};
//!
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//!
//! let h: HandlerRef<u8> = HandlerFn::arc("counter", move |_topic: &str, _payloads: &[u8]| {
//!     counter.fetch_add(1, Ordering::Relaxed);
//! });
//!
//! h.dispatch("tick", &[]);
//! assert_eq!(hits.load(Ordering::Relaxed), 1);
//! assert_eq!(h.name(), "counter");
//! ```

use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::handlers::handler::{Handler, HandlerRef};

type StopFn = Box<dyn Fn(&str) + Send + Sync + 'static>;

/// Closure-backed handler implementation.
pub struct HandlerFn<T, F> {
    name: Cow<'static, str>,
    f: F,
    stop: Option<StopFn>,
    _payload: PhantomData<fn(&[T])>,
}

impl<T, F> HandlerFn<T, F>
where
    T: 'static,
    F: Fn(&str, &[T]) + Send + Sync + 'static,
{
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            stop: None,
            _payload: PhantomData,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> HandlerRef<T> {
        Arc::new(Self::new(name, f))
    }

    /// Attaches a closure run on stop notification.
    #[must_use]
    pub fn on_stop(mut self, stop: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.stop = Some(Box::new(stop));
        self
    }

    /// Converts into a shared handle.
    pub fn into_ref(self) -> HandlerRef<T> {
        Arc::new(self)
    }
}

impl<T, F> Handler<T> for HandlerFn<T, F>
where
    T: 'static,
    F: Fn(&str, &[T]) + Send + Sync + 'static,
{
    fn dispatch(&self, topic: &str, payloads: &[T]) {
        (self.f)(topic, payloads)
    }

    fn on_stop(&self, topic: &str) {
        if let Some(stop) = &self.stop {
            stop(topic);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<T, F> std::fmt::Debug for HandlerFn<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerFn")
            .field("name", &self.name)
            .field("has_stop", &self.stop.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_dispatch_forwards_topic_and_payloads() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let h = HandlerFn::new("sink", move |topic: &str, payloads: &[i32]| {
            sink.lock().unwrap().push((topic.to_string(), payloads.to_vec()));
        });

        h.dispatch("foo", &[1, 2]);
        h.dispatch("bar", &[]);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("foo".to_string(), vec![1, 2]), ("bar".to_string(), vec![])]
        );
    }

    #[test]
    fn test_stop_closure_is_optional() {
        let plain = HandlerFn::new("plain", |_: &str, _: &[i32]| {});
        assert!(plain.stop.is_none());
        Handler::on_stop(&plain, "ignored");

        let stopped = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&stopped);
        let h = HandlerFn::new("with-stop", |_: &str, _: &[i32]| {}).on_stop(move |topic| {
            *slot.lock().unwrap() = Some(topic.to_string());
        });
        Handler::on_stop(&h, "init");

        assert_eq!(stopped.lock().unwrap().as_deref(), Some("init"));
        assert_eq!(Handler::name(&h), "with-stop");
    }
}
