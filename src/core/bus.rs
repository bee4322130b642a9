//! # Bus: topic-addressed publish/subscribe dispatcher.
//!
//! [`Bus`] owns the topic map (topic name → copy-on-write [`TopicBucket`]) and the stop
//! notifier. Every operation is safe under arbitrary concurrent callers and only
//! contends on the shard holding the topic it touches.
//!
//! ## Architecture
//! ```text
//! subscribe ──► TopicMap.upsert(topic, bucket + registration)
//!
//! dispatch(topic, payloads)
//!   ├─► TopicMap.get(topic)  ──► bucket snapshot ──► handlers (caller's thread)
//!   ├─► TopicMap.get("*")    ──► (only if wildcard delivery is enabled)
//!   └─► prune fired once-registrations ──► TopicMap.update / remove_if(empty)
//!                                       └─► StopNotifier (background on_stop)
//!
//! unsubscribe / clear ──► TopicMap.update / remove_if / drain ──► StopNotifier
//! ```
//!
//! ## Rules
//! - No map lock is held while handlers, callbacks or `on_stop` run.
//! - A once-registration fires at most once, decided by a single CAS.
//! - Every removed registration gets exactly one `on_stop`, off the caller's path.
//! - Unknown topics and handlers are silent no-ops.
//! - Handler panics in `dispatch` are not caught; the bus stays usable afterwards and
//!   once-registrations fired before the panic are still pruned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace};

use super::builder::BusBuilder;
use super::config::BusConfig;
use super::map::TopicMap;
use super::notifier::StopNotifier;
use crate::error::BusError;
use crate::handlers::{HandlerId, HandlerRef};
use crate::topics::{Registration, TopicBucket};

/// Reserved topic name of the wildcard bucket.
pub const WILDCARD: &str = "*";

type Fired<T> = Vec<Arc<Registration<T>>>;

/// Result of detaching registrations from one topic.
struct Detached<T> {
    count: usize,
    existed: bool,
    removed: Vec<Arc<Registration<T>>>,
}

struct Inner<T: 'static> {
    topics: TopicMap<Arc<TopicBucket<T>>>,
    wildcard: AtomicBool,
    notifier: StopNotifier<T>,
}

impl<T: 'static> Inner<T> {
    fn add(&self, topic: &str, handler: HandlerRef<T>, once: bool) {
        debug!(topic, handler = handler.name(), once, "subscribe");
        let reg = Arc::new(Registration::new(handler, Arc::from(topic), once));
        self.topics.upsert(topic, |current| {
            let bucket = match current {
                Some(bucket) => bucket.with(reg),
                None => TopicBucket::new(Arc::from(topic)).with(reg),
            };
            Arc::new(bucket)
        });
    }

    fn detach(&self, topic: &str, handlers: &[HandlerRef<T>]) -> Detached<T> {
        if handlers.is_empty() {
            return match self.topics.remove_if(topic, |_| true) {
                Some(bucket) => Detached {
                    count: bucket.len(),
                    existed: true,
                    removed: bucket.registrations().to_vec(),
                },
                None => Detached {
                    count: 0,
                    existed: false,
                    removed: Vec::new(),
                },
            };
        }

        let ids: Vec<HandlerId> = handlers.iter().map(HandlerId::of).collect();
        let mut count = 0;
        let mut removed = Vec::new();
        let existed = self.topics.update(topic, |bucket| {
            count = bucket.len();
            let (kept, gone) = bucket.remove(&ids);
            if gone.is_empty() {
                return Arc::clone(bucket);
            }
            removed = gone;
            Arc::new(kept)
        });
        if !removed.is_empty() {
            self.topics.remove_if(topic, |bucket| bucket.is_empty());
        }
        Detached {
            count,
            existed,
            removed,
        }
    }

    fn deliver(&self, topic: &str, payloads: &[T], fired: &mut Fired<T>) {
        if let Some(bucket) = self.topics.get(topic) {
            Self::deliver_to(&bucket, payloads, fired);
        }
    }

    fn deliver_to(bucket: &TopicBucket<T>, payloads: &[T], fired: &mut Fired<T>) {
        trace!(
            topic = &**bucket.topic(),
            handlers = bucket.len(),
            payloads = payloads.len(),
            "dispatch"
        );
        bucket.dispatch(payloads, fired);
    }

    fn prune(&self, mut fired: Fired<T>) {
        while let Some(first) = fired.first() {
            let topic = first.topic().to_owned();
            let (regs, rest): (Fired<T>, Fired<T>) =
                fired.into_iter().partition(|reg| reg.topic() == topic);
            fired = rest;

            let mut removed = Vec::new();
            self.topics.update(&topic, |bucket| {
                let (kept, gone) = bucket.prune(&regs);
                if gone.is_empty() {
                    return Arc::clone(bucket);
                }
                removed = gone;
                Arc::new(kept)
            });
            if !removed.is_empty() {
                self.topics.remove_if(&topic, |bucket| bucket.is_empty());
            }
            self.retire(removed);
        }
    }

    fn clear(&self) {
        let buckets = self.topics.drain();
        let removed: Vec<_> = buckets
            .iter()
            .flat_map(|bucket| bucket.registrations().iter().cloned())
            .collect();
        if !buckets.is_empty() {
            debug!(topics = buckets.len(), registrations = removed.len(), "clear");
        }
        self.retire(removed);
    }

    /// Hands registrations that this caller retired first to the notifier.
    fn retire(&self, removed: Vec<Arc<Registration<T>>>) {
        let batch: Vec<_> = removed.into_iter().filter(|reg| reg.retire()).collect();
        self.notifier.schedule(batch);
    }
}

impl<T: 'static> Drop for Inner<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Once-registrations fired by one dispatch; pruned on drop, unwinding included.
struct Pending<'a, T: 'static> {
    inner: &'a Inner<T>,
    fired: Fired<T>,
}

impl<'a, T: 'static> Pending<'a, T> {
    fn new(inner: &'a Inner<T>) -> Self {
        Self {
            inner,
            fired: Vec::new(),
        }
    }
}

impl<T: 'static> Drop for Pending<'_, T> {
    fn drop(&mut self) {
        self.inner.prune(std::mem::take(&mut self.fired));
    }
}

/// Concurrent topic publish/subscribe dispatcher, one payload type per instance.
///
/// Cheap to clone: clones share the same topics and notifier. Dropping the last clone
/// stops every remaining registration (each handler gets its `on_stop`).
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use topicbus::{Bus, BusConfig, HandlerFn};
///
/// let bus: Bus<String> = Bus::new(BusConfig::default()).unwrap();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
/// let handler = HandlerFn::arc("counter", move |_topic: &str, _payloads: &[String]| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.subscribe("foo", Arc::clone(&handler))
///     .dispatch("foo", &["x".to_string()])
///     .dispatch("foo", &[]);
/// assert_eq!(hits.load(Ordering::SeqCst), 2);
///
/// bus.unsubscribe("foo", &[handler]);
/// assert_eq!(bus.count("foo"), 0);
/// ```
pub struct Bus<T: 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: 'static> Bus<T> {
    /// Creates a bus and starts its stop notifier.
    ///
    /// The notifier runs on the ambient Tokio runtime when called inside a multi-thread
    /// one, or on a dedicated thread otherwise. Use [`Bus::builder`] to pick a runtime explicitly.
    pub fn new(cfg: BusConfig) -> Result<Self, BusError> {
        BusBuilder::new(cfg).build()
    }

    /// Returns a builder for a bus with the given configuration.
    pub fn builder(cfg: BusConfig) -> BusBuilder<T> {
        BusBuilder::new(cfg)
    }

    pub(crate) fn from_parts(cfg: &BusConfig, notifier: StopNotifier<T>) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: TopicMap::new(),
                wildcard: AtomicBool::new(cfg.wildcard),
                notifier,
            }),
        }
    }

    /// Registers `handler` on `topic`; it receives every subsequent dispatch.
    ///
    /// Registering the same handler twice yields two independent registrations.
    pub fn subscribe(&self, topic: &str, handler: HandlerRef<T>) -> &Self {
        self.inner.add(topic, handler, false);
        self
    }

    /// Registers `handler` on `topic` for a single dispatch.
    ///
    /// Among any number of concurrent dispatches exactly one invokes it; the
    /// registration is then removed and `on_stop` is scheduled.
    pub fn subscribe_once(&self, topic: &str, handler: HandlerRef<T>) -> &Self {
        self.inner.add(topic, handler, true);
        self
    }

    /// Removes registrations from `topic`.
    ///
    /// - empty `handlers`: removes the whole topic;
    /// - otherwise removes every registration of the given handlers (by reference
    ///   identity) and drops the topic if it becomes empty.
    ///
    /// Each removed registration gets one `on_stop`.
    pub fn unsubscribe(&self, topic: &str, handlers: &[HandlerRef<T>]) -> &Self {
        let detached = self.inner.detach(topic, handlers);
        if detached.existed {
            debug!(topic, removed = detached.removed.len(), "unsubscribe");
        }
        self.inner.retire(detached.removed);
        self
    }

    /// Same as [`Bus::unsubscribe`], and reports `(count, existed)`.
    ///
    /// `count` is the number of registrations `topic` held at the moment of removal and
    /// `existed` whether the topic was present. Both are captured atomically with the
    /// removal; `callback` runs synchronously before any `on_stop` is scheduled and
    /// without holding any bus lock.
    pub fn unsubscribe_with_callback(
        &self,
        topic: &str,
        callback: impl FnOnce(usize, bool),
        handlers: &[HandlerRef<T>],
    ) -> &Self {
        let detached = self.inner.detach(topic, handlers);
        callback(detached.count, detached.existed);
        self.inner.retire(detached.removed);
        self
    }

    /// Delivers `payloads` to every handler on `topic`.
    ///
    /// With wildcard delivery enabled the wildcard bucket receives it too (unless
    /// `topic` is the wildcard itself). Fired once-registrations are pruned afterwards.
    /// Unknown topics are a no-op.
    pub fn dispatch(&self, topic: &str, payloads: &[T]) -> &Self {
        let mut pending = Pending::new(&self.inner);
        self.inner.deliver(topic, payloads, &mut pending.fired);
        if topic != WILDCARD && self.wildcard_enabled() {
            self.inner.deliver(WILDCARD, payloads, &mut pending.fired);
        }
        drop(pending);
        self
    }

    /// Delivers `payloads` to every existing topic, wildcard included regardless of
    /// the wildcard toggle.
    pub fn broadcast(&self, payloads: &[T]) -> &Self {
        let mut pending = Pending::new(&self.inner);
        for (_, bucket) in self.inner.topics.snapshot() {
            Inner::deliver_to(&bucket, payloads, &mut pending.fired);
        }
        drop(pending);
        self
    }

    /// Removes every topic and schedules `on_stop` for every registration.
    ///
    /// Concurrent subscribes are not blocked beyond a shard critical section; they
    /// either land before the clear (and are stopped) or after it (and survive).
    pub fn clear(&self) -> &Self {
        self.inner.clear();
        self
    }

    /// Alias of [`Bus::clear`].
    pub fn clean(&self) -> &Self {
        self.clear()
    }

    /// Number of registrations on `topic` (0 if unknown).
    pub fn count(&self, topic: &str) -> usize {
        self.inner.topics.get(topic).map_or(0, |bucket| bucket.len())
    }

    /// Number of registrations across all topics.
    pub fn total(&self) -> usize {
        self.inner
            .topics
            .snapshot()
            .iter()
            .map(|(_, bucket)| bucket.len())
            .sum()
    }

    /// Returns sorted list of topics with at least one registration.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .topics
            .snapshot()
            .into_iter()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(name, _)| name)
            .collect();
        names.sort_unstable();
        names
    }

    /// True if no topic has registrations.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Enables or disables wildcard fan-out for ordinary dispatches.
    pub fn set_wildcard(&self, enabled: bool) -> &Self {
        self.inner.wildcard.store(enabled, Ordering::Release);
        self
    }

    /// Current wildcard fan-out toggle.
    pub fn wildcard_enabled(&self) -> bool {
        self.inner.wildcard.load(Ordering::Acquire)
    }
}

impl<T: 'static> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: 'static> std::fmt::Debug for Bus<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("topics", &self.inner.topics.len())
            .field("wildcard", &self.wildcard_enabled())
            .finish()
    }
}
