//! # TopicBucket: the registrations of one topic.
//!
//! A bucket is an immutable, insertion-ordered snapshot. Structural changes (append,
//! remove, prune) build a **new** bucket that the topic map swaps in atomically, so:
//! - a bucket is never observed half-updated;
//! - dispatch iterates a snapshot without holding any map lock while handlers run;
//! - fired once-registrations are removed in a follow-up step, batched per dispatch.
//!
//! ```text
//! dispatch(payloads)
//!   ├─ retired ─────────────────────► skipped
//!   ├─ persistent ──────────────────► handler.dispatch(topic, payloads)
//!   └─ once ── try_fire() ── won ───► recorded as fired ─► handler.dispatch(topic, payloads)
//!                         └─ lost ──► skipped
//! ```

use std::sync::Arc;

use crate::handlers::HandlerId;
use crate::topics::registration::Registration;

/// Ordered registrations of a single topic.
pub(crate) struct TopicBucket<T> {
    topic: Arc<str>,
    registrations: Vec<Arc<Registration<T>>>,
}

impl<T: 'static> TopicBucket<T> {
    pub(crate) fn new(topic: Arc<str>) -> Self {
        Self {
            topic,
            registrations: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn topic(&self) -> &Arc<str> {
        &self.topic
    }

    /// Momentary registration count.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub(crate) fn registrations(&self) -> &[Arc<Registration<T>>] {
        &self.registrations
    }

    /// Returns a copy with `registration` appended.
    pub(crate) fn with(&self, registration: Arc<Registration<T>>) -> Self {
        let mut registrations = Vec::with_capacity(self.registrations.len() + 1);
        registrations.extend(self.registrations.iter().cloned());
        registrations.push(registration);
        Self {
            topic: Arc::clone(&self.topic),
            registrations,
        }
    }

    /// Invokes every live registration with `(topic, payloads)` in insertion order.
    ///
    /// Once-registrations won by this call are pushed to `fired` before their handler
    /// runs, so they are recorded even when a later handler panics. Handler panics
    /// propagate and abort the rest of the fan-out.
    pub(crate) fn dispatch(&self, payloads: &[T], fired: &mut Vec<Arc<Registration<T>>>) {
        for reg in &self.registrations {
            let Some(_call) = reg.enter() else {
                continue;
            };
            if reg.is_once() {
                if !reg.try_fire() {
                    continue;
                }
                fired.push(Arc::clone(reg));
            }
            reg.handler().dispatch(&self.topic, payloads);
        }
    }

    /// Splits off registrations whose handler identity is in `ids`.
    ///
    /// An empty `ids` removes everything. Returns `(remaining, removed)`.
    pub(crate) fn remove(&self, ids: &[HandlerId]) -> (Self, Vec<Arc<Registration<T>>>) {
        if ids.is_empty() {
            return (
                Self::new(Arc::clone(&self.topic)),
                self.registrations.clone(),
            );
        }
        self.split(|reg| ids.contains(&reg.id()))
    }

    /// Splits off exactly the given registrations (registration identity, not handler
    /// identity). Returns `(remaining, removed)`.
    pub(crate) fn prune(
        &self,
        fired: &[Arc<Registration<T>>],
    ) -> (Self, Vec<Arc<Registration<T>>>) {
        self.split(|reg| fired.iter().any(|f| Arc::ptr_eq(f, reg)))
    }

    fn split(
        &self,
        matches: impl Fn(&Arc<Registration<T>>) -> bool,
    ) -> (Self, Vec<Arc<Registration<T>>>) {
        let mut kept = Vec::with_capacity(self.registrations.len());
        let mut removed = Vec::new();
        for reg in &self.registrations {
            if matches(reg) {
                removed.push(Arc::clone(reg));
            } else {
                kept.push(Arc::clone(reg));
            }
        }
        (
            Self {
                topic: Arc::clone(&self.topic),
                registrations: kept,
            },
            removed,
        )
    }
}
