//! Timer-debounced dispatch queue.
//!
//! Buffers the latest value per subscriber and flushes once the
//! quiescence window has elapsed, guaranteeing at most one delivery
//! per window with the latest value winning.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::trace;

/// Delivery target for one flushed value.
pub type DeliverFn = Arc<dyn Fn(Value) + Send + Sync>;

enum Command {
    Schedule {
        id: u64,
        value: Value,
        deliver: DeliverFn,
    },
    Cancel {
        id: u64,
    },
    Shutdown,
}

/// Debounced dispatch queue backed by a single worker thread.
pub struct Debouncer {
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();
        let worker = thread::spawn(move || {
            let mut pending: BTreeMap<u64, (Instant, Value, DeliverFn)> = BTreeMap::new();
            loop {
                let timeout = pending
                    .values()
                    .map(|(deadline, _, _)| *deadline)
                    .min()
                    .map(|deadline| deadline.saturating_duration_since(Instant::now()));
                let command = match timeout {
                    None => match rx.recv() {
                        Ok(command) => Some(command),
                        Err(_) => break,
                    },
                    Some(wait) => match rx.recv_timeout(wait) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    },
                };
                match command {
                    Some(Command::Schedule { id, value, deliver }) => {
                        // Rescheduling replaces the buffered value and
                        // resets the deadline.
                        trace!(subscriber = id, "debounce schedule");
                        pending.insert(id, (Instant::now() + window, value, deliver));
                    }
                    Some(Command::Cancel { id }) => {
                        pending.remove(&id);
                    }
                    Some(Command::Shutdown) => break,
                    None => {}
                }
                let now = Instant::now();
                let due: Vec<u64> = pending
                    .iter()
                    .filter(|(_, (deadline, _, _))| *deadline <= now)
                    .map(|(id, _)| *id)
                    .collect();
                for id in due {
                    if let Some((_, value, deliver)) = pending.remove(&id) {
                        trace!(subscriber = id, "debounce flush");
                        deliver(value);
                    }
                }
            }
        });
        Self {
            tx,
            worker: Some(worker),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Buffer `value` for `id`, replacing any pending value and
    /// resetting the quiescence deadline.
    pub fn schedule(&self, id: u64, value: Value, deliver: DeliverFn) {
        let _ = self.tx.send(Command::Schedule { id, value, deliver });
    }

    /// Clear the pending flush for `id`, if any.
    pub fn cancel(&self, id: u64) {
        let _ = self.tx.send(Command::Cancel { id });
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::mpsc::channel;

    #[test]
    fn delivers_latest_value_once_per_window() {
        let debouncer = Debouncer::new(Duration::from_millis(20));
        let (tx, rx) = channel();
        let deliver: DeliverFn = Arc::new(move |value| {
            let _ = tx.send(value);
        });

        debouncer.schedule(1, json!(1), Arc::clone(&deliver));
        debouncer.schedule(1, json!(2), Arc::clone(&deliver));
        debouncer.schedule(1, json!(3), deliver);

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), json!(3));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn cancel_clears_pending_flush() {
        let debouncer = Debouncer::new(Duration::from_millis(20));
        let (tx, rx) = channel();
        let deliver: DeliverFn = Arc::new(move |value| {
            let _ = tx.send(value);
        });

        debouncer.schedule(7, json!("pending"), deliver);
        debouncer.cancel(7);

        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    }

    #[test]
    fn independent_ids_flush_independently() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let (tx, rx) = channel();
        let deliver: DeliverFn = Arc::new(move |value| {
            let _ = tx.send(value);
        });

        debouncer.schedule(1, json!("a"), Arc::clone(&deliver));
        debouncer.schedule(2, json!("b"), deliver);

        let mut got = vec![
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            rx.recv_timeout(Duration::from_secs(2)).unwrap(),
        ];
        got.sort_by_key(|v| v.as_str().map(str::to_owned));
        assert_eq!(got, vec![json!("a"), json!("b")]);
    }
}
