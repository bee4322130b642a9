//! Error types used by topicbus.
//!
//! Bus operations themselves never fail: unknown topics and handlers are silent no-ops.
//! The only fallible step is construction, which may need to start the background
//! stop notifier. [`BusError`] describes those failures and provides helper methods
//! (`as_label`, `as_message`) for logging/metrics.

use std::io;

use thiserror::Error;

/// # Errors produced while building a bus.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum BusError {
    /// No Tokio runtime was available and a dedicated notifier runtime could not be built.
    #[error("failed to build stop-notifier runtime: {0}")]
    NotifierRuntime(#[source] io::Error),

    /// The dedicated notifier thread could not be spawned.
    #[error("failed to spawn stop-notifier thread '{name}': {source}")]
    NotifierThread {
        /// Requested thread name.
        name: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use topicbus::BusError;
    ///
    /// let err = BusError::NotifierRuntime(std::io::Error::other("no fds"));
    /// assert_eq!(err.as_label(), "bus_notifier_runtime");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::NotifierRuntime(_) => "bus_notifier_runtime",
            BusError::NotifierThread { .. } => "bus_notifier_thread",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::NotifierRuntime(e) => format!("notifier runtime: {e}"),
            BusError::NotifierThread { name, source } => {
                format!("notifier thread {name:?}: {source}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let rt = BusError::NotifierRuntime(io::Error::other("boom"));
        let th = BusError::NotifierThread {
            name: "topicbus-stop".into(),
            source: io::Error::other("boom"),
        };
        assert_eq!(rt.as_label(), "bus_notifier_runtime");
        assert_eq!(th.as_label(), "bus_notifier_thread");
        assert_eq!(th.as_message(), "notifier thread \"topicbus-stop\": boom");
        assert!(rt.to_string().contains("boom"));
    }
}
