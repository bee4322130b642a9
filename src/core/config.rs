//! # Bus configuration.
//!
//! Provides [`BusConfig`] centralized settings for a [`Bus`](crate::Bus).
//!
//! Config is used in two ways:
//! 1. **Bus creation**: `Bus::new(config)` or `Bus::builder(config)`
//! 2. **Runtime toggling**: the wildcard flag is only the *initial* value; it can be
//!    flipped later with `Bus::set_wildcard`.

use std::borrow::Cow;

/// Default name of the dedicated stop-notifier thread.
pub const DEFAULT_NOTIFIER_THREAD: &str = "topicbus-stop";

/// Configuration for a bus instance.
///
/// ## Field semantics
/// - `wildcard`: whether ordinary dispatches also fan out to the `"*"` bucket
/// - `notifier_thread`: thread name used when no Tokio runtime is available and the
///   stop notifier has to run on its own thread
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Initial wildcard delivery toggle.
    ///
    /// - `false`: `dispatch("orders", ..)` reaches only the `"orders"` bucket
    /// - `true`: it also reaches the `"*"` bucket
    ///
    /// Direct `dispatch("*", ..)` and `broadcast(..)` reach the wildcard bucket either way.
    pub wildcard: bool,

    /// Name of the fallback notifier thread.
    pub notifier_thread: Cow<'static, str>,
}

impl BusConfig {
    /// Returns a config with wildcard delivery enabled.
    #[must_use]
    pub fn with_wildcard() -> Self {
        Self {
            wildcard: true,
            ..Self::default()
        }
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `wildcard = false` (opt-in fan-out)
    /// - `notifier_thread = "topicbus-stop"`
    fn default() -> Self {
        Self {
            wildcard: false,
            notifier_thread: Cow::Borrowed(DEFAULT_NOTIFIER_THREAD),
        }
    }
}
