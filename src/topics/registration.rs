//! # Registration: one handler bound to one topic.
//!
//! A [`Registration`] wraps the handler, its owning topic, the `once` flag and a
//! tri-state lifecycle indicator:
//!
//! ```text
//!   NotFired ──try_fire()──► Fired
//!      │                       │
//!      └──────retire()─────────┴──► Removed
//! ```
//!
//! ## Rules
//! - `try_fire` is a single compare-and-swap; among any number of concurrent callers
//!   exactly one wins, and it never succeeds after `retire`.
//! - `retire` reports `true` to the first caller only; that caller owns the stop
//!   notification.
//! - Invoking the handler is the caller's job, not the registration's. Callers do it
//!   through [`Registration::enter`], which refuses retired registrations and counts
//!   the call as in flight.
//! - The stop notification waits for [`Registration::settled`], so `on_stop` never
//!   overlaps or precedes a dispatch of the same registration.
//!
//! `enter` bumps the in-flight counter before reading the state, and `retire` swaps the
//! state before the notifier reads the counter. With sequentially consistent ordering on
//! both, either the dispatcher sees `Removed` or the notifier sees the call in flight.

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::handlers::{HandlerId, HandlerRef};

const NOT_FIRED: u8 = 0;
const FIRED: u8 = 1;
const REMOVED: u8 = 2;

/// Observable lifecycle state of a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegistrationState {
    NotFired,
    Fired,
    Removed,
}

/// Binding of one handler to one topic.
pub(crate) struct Registration<T> {
    handler: HandlerRef<T>,
    id: HandlerId,
    topic: Arc<str>,
    once: bool,
    state: AtomicU8,
    in_flight: AtomicUsize,
    idle: Notify,
}

impl<T: 'static> Registration<T> {
    pub(crate) fn new(handler: HandlerRef<T>, topic: Arc<str>, once: bool) -> Self {
        let id = HandlerId::of(&handler);
        Self {
            handler,
            id,
            topic,
            once,
            state: AtomicU8::new(NOT_FIRED),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        }
    }

    #[inline]
    pub(crate) fn handler(&self) -> &HandlerRef<T> {
        &self.handler
    }

    #[inline]
    pub(crate) fn id(&self) -> HandlerId {
        self.id
    }

    #[inline]
    pub(crate) fn topic(&self) -> &str {
        &self.topic
    }

    #[inline]
    pub(crate) fn is_once(&self) -> bool {
        self.once
    }

    pub(crate) fn state(&self) -> RegistrationState {
        match self.state.load(Ordering::SeqCst) {
            NOT_FIRED => RegistrationState::NotFired,
            FIRED => RegistrationState::Fired,
            _ => RegistrationState::Removed,
        }
    }

    /// Claims the single execution of a once-registration.
    ///
    /// Returns `true` for exactly one caller; `false` once fired or removed.
    #[inline]
    pub(crate) fn try_fire(&self) -> bool {
        self.state
            .compare_exchange(NOT_FIRED, FIRED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Marks the registration removed.
    ///
    /// Returns `true` only for the first caller.
    #[inline]
    pub(crate) fn retire(&self) -> bool {
        self.state.swap(REMOVED, Ordering::SeqCst) != REMOVED
    }

    /// Starts a handler call; `None` once the registration is retired.
    ///
    /// The call counts as in flight until the returned guard drops.
    pub(crate) fn enter(&self) -> Option<InFlight<'_, T>> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight { reg: self };
        if self.state.load(Ordering::SeqCst) == REMOVED {
            return None;
        }
        Some(guard)
    }

    /// True while some caller is inside a handler call of this registration.
    #[inline]
    pub(crate) fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) != 0
    }

    /// Resolves once no handler call of this registration is in flight.
    ///
    /// Called after [`Registration::retire`]; no new call can start from then on.
    pub(crate) async fn settled(&self) {
        loop {
            let mut idle = pin!(self.idle.notified());
            idle.as_mut().enable();
            if !self.is_busy() {
                return;
            }
            idle.await;
        }
    }
}

/// In-flight marker of one handler call, see [`Registration::enter`].
pub(crate) struct InFlight<'a, T: 'static> {
    reg: &'a Registration<T>,
}

impl<T: 'static> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.reg.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.reg.idle.notify_waiters();
        }
    }
}

impl<T: 'static> std::fmt::Debug for Registration<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("handler", &self.handler.name())
            .field("topic", &self.topic)
            .field("once", &self.once)
            .field("state", &self.state())
            .field("in_flight", &self.in_flight.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::HandlerFn;
    use std::sync::Barrier;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn registration(once: bool) -> Registration<()> {
        Registration::new(HandlerFn::arc("nop", |_: &str, _: &[()]| {}), "topic".into(), once)
    }

    #[test]
    fn test_try_fire_succeeds_once() {
        let reg = registration(true);
        assert_eq!(reg.state(), RegistrationState::NotFired);
        assert!(reg.try_fire());
        assert!(!reg.try_fire());
        assert_eq!(reg.state(), RegistrationState::Fired);
    }

    #[test]
    fn test_try_fire_fails_after_retire() {
        let reg = registration(true);
        assert!(reg.retire());
        assert!(!reg.try_fire());
        assert_eq!(reg.state(), RegistrationState::Removed);
    }

    #[test]
    fn test_retire_wins_once() {
        let reg = registration(false);
        assert!(reg.try_fire());
        assert!(reg.retire());
        assert!(!reg.retire());
    }

    #[test]
    fn test_concurrent_try_fire_has_single_winner() {
        const THREADS: usize = 16;

        for _ in 0..50 {
            let reg = Arc::new(registration(true));
            let barrier = Arc::new(Barrier::new(THREADS));
            let wins = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let reg = Arc::clone(&reg);
                    let barrier = Arc::clone(&barrier);
                    let wins = Arc::clone(&wins);
                    thread::spawn(move || {
                        barrier.wait();
                        if reg.try_fire() {
                            wins.fetch_add(1, Ordering::Relaxed);
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(wins.load(Ordering::Relaxed), 1);
        }
    }

    #[test]
    fn test_enter_refused_after_retire() {
        let reg = registration(false);
        {
            let _call = reg.enter().unwrap();
            assert!(reg.is_busy());
        }
        assert!(!reg.is_busy());

        reg.retire();
        assert!(reg.enter().is_none());
        assert!(!reg.is_busy(), "refused calls do not stay in flight");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_settled_waits_for_in_flight_call() {
        let reg = Arc::new(registration(false));
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let caller = {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                let _call = reg.enter().unwrap();
                entered_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        };
        entered_rx.recv().unwrap();
        reg.retire();

        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(100), reg.settled()).await;
        assert!(pending.is_err(), "settled while a call is in flight");

        release_tx.send(()).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), reg.settled())
            .await
            .unwrap();
        caller.join().unwrap();
    }

    #[test]
    fn test_identity_and_topic() {
        let handler = HandlerFn::arc("nop", |_: &str, _: &[()]| {});
        let reg = Registration::new(Arc::clone(&handler), "init".into(), false);

        assert_eq!(reg.id(), HandlerId::of(&handler));
        assert_eq!(reg.topic(), "init");
        assert!(!reg.is_once());
    }
}
