//! # Handler trait and identity tokens.
//!
//! [`Handler`] is the extension point callers implement to receive dispatched payloads.
//! Handlers are registered as [`HandlerRef`] (`Arc<dyn Handler<T>>`); the bus keeps a
//! clone of the `Arc` for as long as the registration lives.
//!
//! ## Identity
//! Handlers are not compared by value. Each registration carries a [`HandlerId`] derived
//! from the address of the `Arc` allocation, so `unsubscribe` only matches clones of the
//! exact reference passed to `subscribe`.
//!
//! ```rust
//! use std::sync::Arc;
//! use topicbus::{Handler, HandlerId, HandlerRef};
//!
//! struct Printer;
//!
//! impl Handler<String> for Printer {
//!     fn dispatch(&self, topic: &str, payloads: &[String]) {
//!         println!("{topic}: {payloads:?}");
//!     }
//! }
//!
//! let a: HandlerRef<String> = Arc::new(Printer);
//! let b: HandlerRef<String> = Arc::new(Printer);
//!
//! assert_eq!(HandlerId::of(&a), HandlerId::of(&a.clone()));
//! assert_ne!(HandlerId::of(&a), HandlerId::of(&b));
//! ```

use std::sync::Arc;

/// Shared handle to a handler (`Arc<dyn Handler<T>>`).
pub type HandlerRef<T> = Arc<dyn Handler<T>>;

/// Receiver of dispatched payloads.
///
/// ### Implementation requirements
/// - `dispatch` runs synchronously on the dispatching caller's thread. Slow work delays
///   only callers dispatching to the same topic.
/// - Panics in `dispatch` are **not** caught: they abort the rest of that fan-out and
///   propagate to the caller.
/// - `on_stop` runs on the bus's background notifier, never on the dispatching caller's
///   path. It may call back into the bus.
pub trait Handler<T>: Send + Sync + 'static {
    /// Handles one dispatch on `topic`.
    ///
    /// `payloads` may be empty (a bare trigger).
    fn dispatch(&self, topic: &str, payloads: &[T]);

    /// Called exactly once when the registration is removed from `topic`
    /// (unsubscribe, once-handler fired, or bus cleared).
    ///
    /// It is the last call the registration receives: dispatches still running into it
    /// have returned, and later dispatches skip it.
    ///
    /// Panics are caught and logged by the notifier.
    fn on_stop(&self, topic: &str) {
        let _ = topic;
    }

    /// Human-readable name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Reference-identity token for a registered handler.
///
/// Two ids are equal only when computed from clones of the same `Arc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

impl HandlerId {
    /// Computes the identity of `handler` from its allocation address.
    #[inline]
    pub fn of<T>(handler: &HandlerRef<T>) -> Self {
        Self(Arc::as_ptr(handler) as *const () as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Handler<u32> for Nop {
        fn dispatch(&self, _topic: &str, _payloads: &[u32]) {}
    }

    #[test]
    fn test_identity_follows_the_allocation() {
        let a: HandlerRef<u32> = Arc::new(Nop);
        let a2 = Arc::clone(&a);
        let b: HandlerRef<u32> = Arc::new(Nop);

        assert_eq!(HandlerId::of(&a), HandlerId::of(&a2));
        assert_ne!(HandlerId::of(&a), HandlerId::of(&b));
    }

    #[test]
    fn test_identity_survives_unsizing() {
        let concrete = Arc::new(Nop);
        let erased: HandlerRef<u32> = concrete.clone();
        let again: HandlerRef<u32> = concrete;

        assert_eq!(HandlerId::of(&erased), HandlerId::of(&again));
    }

    #[test]
    fn test_default_name_is_type_name() {
        let h = Nop;
        assert!(Handler::<u32>::name(&h).ends_with("Nop"));
    }
}
