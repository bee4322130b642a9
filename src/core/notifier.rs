//! # StopNotifier: off-path delivery of `on_stop`.
//!
//! Removed registrations are handed to the notifier in batches and their handlers'
//! [`on_stop`](crate::Handler::on_stop) runs on a background worker, never on the
//! caller that removed them. A handler's `on_stop` can therefore call back into the bus
//! without deadlocking against the dispatch that retired it.
//!
//! ## Diagram
//! ```text
//!  dispatch / unsubscribe / clear
//!        │ retired registrations (batch)
//!        ▼
//!  [unbounded queue] ─► worker ─► handler.on_stop(topic)   (panics caught + logged)
//! ```
//!
//! ## Where the worker runs
//! 1) the runtime handle passed to the builder, else
//! 2) the ambient Tokio runtime (`Handle::try_current`) if it is multi-threaded, else
//! 3) a dedicated named thread driving a current-thread runtime.
//!
//! An ambient current-thread runtime only makes progress inside its own `block_on`,
//! so a bus built there and used afterwards would never see its worker polled.
//!
//! Before `on_stop` the worker waits until no dispatch of that registration is still
//! running, so `on_stop` is always the last call a registration receives.
//!
//! If the worker is gone (its runtime shut down), batches are delivered inline with a
//! warning; every retired registration still gets exactly one `on_stop`.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::sync::mpsc;

use crate::error::BusError;
use crate::topics::Registration;

type Batch<T> = Vec<Arc<Registration<T>>>;

/// Background `on_stop` dispatcher.
pub(crate) struct StopNotifier<T> {
    tx: mpsc::UnboundedSender<Batch<T>>,
}

impl<T: 'static> StopNotifier<T> {
    /// Starts the worker.
    pub(crate) fn start(runtime: Option<Handle>, thread_name: &str) -> Result<Self, BusError> {
        let (tx, rx) = mpsc::unbounded_channel::<Batch<T>>();

        let ambient = || {
            Handle::try_current()
                .ok()
                .filter(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
        };

        match runtime.or_else(ambient) {
            Some(handle) => {
                handle.spawn(run(rx));
            }
            None => {
                let rt = Builder::new_current_thread()
                    .build()
                    .map_err(BusError::NotifierRuntime)?;
                thread::Builder::new()
                    .name(thread_name.to_owned())
                    .spawn(move || rt.block_on(run(rx)))
                    .map_err(|source| BusError::NotifierThread {
                        name: thread_name.to_owned(),
                        source,
                    })?;
                tracing::debug!(thread = thread_name, "stop notifier running on dedicated thread");
            }
        }

        Ok(Self { tx })
    }
}

impl<T: 'static> StopNotifier<T> {
    /// Queues `on_stop` for every registration in `batch` (non-blocking).
    pub(crate) fn schedule(&self, batch: Batch<T>) {
        if batch.is_empty() {
            return;
        }
        if let Err(mpsc::error::SendError(batch)) = self.tx.send(batch) {
            tracing::warn!(count = batch.len(), "stop notifier closed; delivering inline");
            deliver(batch);
        }
    }
}

async fn run<T: 'static>(mut rx: mpsc::UnboundedReceiver<Batch<T>>) {
    while let Some(batch) = rx.recv().await {
        for reg in batch {
            reg.settled().await;
            stop(&reg);
        }
    }
}

/// Inline fallback. Does not wait for in-flight dispatches: the caller may be one.
fn deliver<T: 'static>(batch: Batch<T>) {
    for reg in batch {
        stop(&reg);
    }
}

fn stop<T: 'static>(reg: &Registration<T>) {
    let handler = reg.handler();
    let topic = reg.topic();
    match catch_unwind(AssertUnwindSafe(|| handler.on_stop(topic))) {
        Ok(()) => tracing::trace!(handler = handler.name(), topic, "stopped"),
        Err(panic_err) => tracing::warn!(
            handler = handler.name(),
            topic,
            info = %panic_info(panic_err.as_ref()),
            "handler panicked in on_stop"
        ),
    }
}

fn panic_info(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{HandlerFn, HandlerRef};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    fn stopping(name: &'static str, tx: std_mpsc::Sender<String>) -> HandlerRef<()> {
        HandlerFn::new(name, |_: &str, _: &[()]| {})
            .on_stop(move |topic| {
                let _ = tx.send(format!("{name}@{topic}"));
            })
            .into_ref()
    }

    fn batch(handlers: Vec<HandlerRef<()>>, topic: &str) -> Batch<()> {
        handlers
            .into_iter()
            .map(|h| Arc::new(Registration::new(h, topic.into(), false)))
            .collect()
    }

    #[test]
    fn test_dedicated_thread_delivers_without_runtime() {
        let (tx, rx) = std_mpsc::channel();
        let notifier = StopNotifier::start(None, "test-stop").unwrap();

        notifier.schedule(batch(vec![stopping("a", tx.clone()), stopping("b", tx)], "t"));

        let got: Vec<String> = (0..2)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec!["a@t", "b@t"]);
    }

    #[test]
    fn test_panicking_on_stop_does_not_kill_worker() {
        let (tx, rx) = std_mpsc::channel();
        let notifier = StopNotifier::start(None, "test-stop").unwrap();
        let bomb: HandlerRef<()> = HandlerFn::new("bomb", |_: &str, _: &[()]| {})
            .on_stop(|_| panic!("boom"))
            .into_ref();

        notifier.schedule(batch(vec![bomb], "t"));
        notifier.schedule(batch(vec![stopping("after", tx)], "t"));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "after@t");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ambient_runtime_worker() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier = StopNotifier::start(None, "unused").unwrap();
        let h: HandlerRef<()> = HandlerFn::new("h", |_: &str, _: &[()]| {})
            .on_stop(move |topic| {
                let _ = tx.send(topic.to_string());
            })
            .into_ref();

        notifier.schedule(batch(vec![h], "init"));

        let topic = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap();
        assert_eq!(topic.as_deref(), Some("init"));
    }

    #[test]
    fn test_current_thread_ambient_runtime_is_not_reused() {
        let (tx, rx) = std_mpsc::channel();
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        let notifier = rt.block_on(async { StopNotifier::start(None, "test-stop").unwrap() });

        notifier.schedule(batch(vec![stopping("late", tx)], "t"));

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "late@t");
    }

    #[test]
    fn test_on_stop_waits_for_running_dispatch() {
        let (tx, rx) = std_mpsc::channel();
        let notifier = StopNotifier::start(None, "test-stop").unwrap();
        let regs = batch(vec![stopping("busy", tx)], "t");
        let reg = Arc::clone(&regs[0]);

        let call = reg.enter().unwrap();
        reg.retire();
        notifier.schedule(regs);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        drop(call);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "busy@t");
    }

    #[test]
    fn test_panic_info_extracts_messages() {
        assert_eq!(panic_info(&"static"), "static");
        assert_eq!(panic_info(&String::from("owned")), "owned");
        assert_eq!(panic_info(&42u8), "unknown panic");
    }
}
