use std::marker::PhantomData;

use tokio::runtime::Handle;

use super::{bus::Bus, config::BusConfig, notifier::StopNotifier};
use crate::error::BusError;

/// Builder for constructing a [`Bus`] with optional runtime placement.
pub struct BusBuilder<T> {
    cfg: BusConfig,
    runtime: Option<Handle>,
    _payload: PhantomData<fn(&[T])>,
}

impl<T: 'static> BusBuilder<T> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: BusConfig) -> Self {
        Self {
            cfg,
            runtime: None,
            _payload: PhantomData,
        }
    }

    /// Runs the stop notifier on the given Tokio runtime.
    ///
    /// Without it the ambient runtime is used, or a dedicated thread when there is none.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Sets the initial wildcard delivery toggle.
    pub fn with_wildcard(mut self, enabled: bool) -> Self {
        self.cfg.wildcard = enabled;
        self
    }

    /// Builds the bus and starts its stop notifier.
    pub fn build(self) -> Result<Bus<T>, BusError> {
        let notifier = StopNotifier::start(self.runtime, &self.cfg.notifier_thread)?;
        Ok(Bus::from_parts(&self.cfg, notifier))
    }
}

impl<T> std::fmt::Debug for BusBuilder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusBuilder")
            .field("cfg", &self.cfg)
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
