//! Single-threaded UI task queue.
//!
//! Everything a desktop toolkit would run on its event dispatch thread is
//! posted here instead: widget callbacks, ledger renders, undo requests.
//! Tasks run strictly in posting order on one named thread. Thread-affinity
//! checks are queue-identity checks (`is_current`).

use std::cell::Cell;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, error};

type Task = Box<dyn FnOnce() + Send + 'static>;

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // 0 = not a queue thread.
    static CURRENT_QUEUE: Cell<u64> = const { Cell::new(0) };
}

/// A serial executor standing in for the UI event thread.
pub struct UiQueue {
    id: u64,
    name: String,
    sender: Mutex<Option<Sender<Task>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl UiQueue {
    /// Starts the queue thread under the given name.
    pub fn spawn(name: &str) -> io::Result<UiQueue> {
        let id = NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel::<Task>();
        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                CURRENT_QUEUE.with(|c| c.set(id));
                for task in rx {
                    // A failing callback must not take the whole UI down.
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        error!(queue = id, "ui task panicked");
                    }
                }
                debug!(queue = id, "ui queue drained");
            })?;

        debug!(queue = id, name, "ui queue started");
        Ok(UiQueue {
            id,
            name: name.to_string(),
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true when called from this queue's own thread.
    pub fn is_current(&self) -> bool {
        CURRENT_QUEUE.with(|c| c.get()) == self.id
    }

    /// Posts a task to run later on the queue thread.
    ///
    /// Returns false if the queue has been shut down; the task is dropped.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        match self.sender.lock().as_ref() {
            Some(tx) => tx.send(Box::new(task)).is_ok(),
            None => false,
        }
    }

    /// Runs `f` on the queue thread and blocks until it returns.
    ///
    /// Runs inline when already on the queue thread. Returns `None` if the
    /// queue is shut down or `f` panicked.
    pub fn invoke_and_wait<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Some(f());
        }
        let (tx, rx) = mpsc::sync_channel(1);
        let posted = self.post(move || {
            let _ = tx.send(f());
        });
        if !posted {
            return None;
        }
        rx.recv().ok()
    }

    /// Blocks until every task posted before this call has run.
    pub fn flush(&self) -> bool {
        self.invoke_and_wait(|| ()).is_some()
    }

    /// Stops accepting tasks, drains the ones already queued and joins the
    /// thread. Safe to call more than once.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());
        if self.is_current() {
            // Joining ourselves would deadlock; the thread exits once the
            // current task returns and the channel drains.
            return;
        }
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!(queue = self.id, "ui queue thread panicked");
            }
        }
    }
}

impl Drop for UiQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
