//! # LogHandler — simple dispatch printer
//!
//! A minimal handler that records every dispatch and stop notification through
//! `tracing`. Use it for tests or demos, typically subscribed to the wildcard topic.
//!
//! ## Example output
//! ```text
//! INFO topicbus: [dispatch] handler="LogHandler" topic="orders" payloads=["created"]
//! INFO topicbus: [stopped] handler="LogHandler" topic="orders"
//! ```

use std::fmt::Debug;

use crate::handlers::Handler;

/// Tracing-backed handler.
#[derive(Default, Debug)]
pub struct LogHandler;

impl LogHandler {
    /// Construct a new [`LogHandler`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T: Debug> Handler<T> for LogHandler {
    fn dispatch(&self, topic: &str, payloads: &[T]) {
        tracing::info!(target: "topicbus", handler = "LogHandler", topic, ?payloads, "[dispatch]");
    }

    fn on_stop(&self, topic: &str) {
        tracing::info!(target: "topicbus", handler = "LogHandler", topic, "[stopped]");
    }

    fn name(&self) -> &str {
        "LogHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_handler_accepts_any_debug_payload() {
        let h = LogHandler::new();
        Handler::<&str>::dispatch(&h, "orders", &["created"]);
        Handler::<u64>::dispatch(&h, "ticks", &[]);
        Handler::<u64>::on_stop(&h, "ticks");
        assert_eq!(Handler::<u64>::name(&h), "LogHandler");
    }
}
