//! Bus core: orchestration over the topic map.
//!
//! The only public API from this module is [`Bus`] with its [`BusBuilder`] and
//! [`BusConfig`].
//!
//! Internal modules:
//! - [`bus`]: public surface, wildcard fan-out, pruning of fired once-registrations;
//! - [`map`]: sharded topic map adapter (`dashmap`);
//! - [`notifier`]: background delivery of `on_stop`;
//! - [`builder`], [`config`]: construction and settings.

mod builder;
mod bus;
mod config;
mod map;
mod notifier;

pub use builder::BusBuilder;
pub use bus::{Bus, WILDCARD};
pub use config::{BusConfig, DEFAULT_NOTIFIER_THREAD};
