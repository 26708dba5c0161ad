use crate::errors::*;
use crate::task::Task;
use crossbeam_channel::{self as channel, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

/// Bounded queue of pending probes with liveness accounting. Every task
/// added increments the outstanding counter, every completion or filter
/// rejection decrements it. When the counter drops back to zero the
/// crawl has converged and the quiescence signal fires.
pub struct WorkQueue {
    outstanding: AtomicI64,
    tx: Mutex<Option<Sender<Task>>>,
    rx: Receiver<Task>,
    quiesced_tx: Sender<()>,
    quiesced_rx: Receiver<()>,
    latched: AtomicBool,
}

impl WorkQueue {
    pub fn new(size: usize) -> WorkQueue {
        let (tx, rx) = channel::bounded(size);
        let (quiesced_tx, quiesced_rx) = channel::bounded(1);
        WorkQueue {
            outstanding: AtomicI64::new(0),
            tx: Mutex::new(Some(tx)),
            rx,
            quiesced_tx,
            quiesced_rx,
            latched: AtomicBool::new(false),
        }
    }

    fn sender(&self) -> Option<Sender<Task>> {
        let guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    /// Enqueue tasks, blocking while the channel is full. The counter is
    /// bumped before the send: a consumer that finishes the new task
    /// immediately must never observe a transient zero.
    pub fn add(&self, tasks: Vec<Task>) {
        if tasks.is_empty() {
            return;
        }
        let tx = match self.sender() {
            Some(tx) => tx,
            None => {
                debug!("queue is closed, dropping {} tasks", tasks.len());
                return;
            }
        };
        self.outstanding
            .fetch_add(tasks.len() as i64, Ordering::SeqCst);
        for task in tasks {
            if tx.send(task).is_err() {
                self.done(1);
            }
        }
    }

    /// Mark n tasks as terminated. Fires the quiescence signal exactly
    /// once when the counter reaches zero.
    pub fn done(&self, n: i64) {
        let prev = self.outstanding.fetch_sub(n, Ordering::SeqCst);
        if prev - n == 0 && !self.latched.swap(true, Ordering::SeqCst) {
            self.quiesced_tx.try_send(()).ok();
        }
    }

    pub fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// The consume side, shared by the filter.
    pub fn receiver(&self) -> Receiver<Task> {
        self.rx.clone()
    }

    /// Block until the crawl has converged.
    pub fn wait(&self) {
        self.quiesced_rx.recv().ok();
    }

    /// Drop the send side so downstream consumers drain and exit. Later
    /// adds are ignored.
    pub fn close(&self) {
        let mut guard = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn task(path: &str) -> Task {
        let url = Url::parse("http://example.com")
            .unwrap()
            .join(path)
            .unwrap();
        Task::new(url)
    }

    #[test]
    fn add_and_done_balance_out() {
        let queue = WorkQueue::new(8);
        queue.add(vec![task("/a"), task("/b")]);
        assert_eq!(queue.outstanding(), 2);

        let rx = queue.receiver();
        assert_eq!(rx.recv().unwrap().url.path(), "/a");
        assert_eq!(rx.recv().unwrap().url.path(), "/b");

        queue.done(1);
        assert_eq!(queue.outstanding(), 1);
        queue.done(1);
        assert_eq!(queue.outstanding(), 0);
        queue.wait();
    }

    #[test]
    fn quiescence_fires_once() {
        let queue = WorkQueue::new(8);
        queue.add(vec![task("/a")]);
        queue.done(1);
        queue.wait();

        // counter going through zero again must not re-arm the signal
        queue.add(vec![task("/b")]);
        queue.done(1);
        assert!(queue.quiesced_rx.try_recv().is_err());
    }

    #[test]
    fn add_after_close_is_dropped() {
        let queue = WorkQueue::new(8);
        queue.close();
        queue.add(vec![task("/a")]);
        assert_eq!(queue.outstanding(), 0);
        assert!(queue.receiver().try_recv().is_err());
    }

    #[test]
    fn close_disconnects_consumers() {
        let queue = WorkQueue::new(8);
        let rx = queue.receiver();
        queue.add(vec![task("/a")]);
        queue.close();
        assert!(rx.recv().is_ok());
        assert!(rx.recv().is_err());
    }
}
