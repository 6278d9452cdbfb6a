//! Turn gate: a single-slot rendezvous between a game-logic thread and the UI.
//!
//! The game thread calls [`TurnGate::begin_wait`] and blocks until the UI
//! thread calls [`TurnGate::release`] (the player pressed "Done", picked a
//! move, ...) or until the wait is interrupted. One gate serves exactly one
//! waiter at a time; it is reusable across any number of wait/release
//! cycles.
//!
//! Every state transition happens under the gate's mutex, so anything the
//! releasing thread wrote before `release()` is visible to the waiter after
//! `begin_wait` returns.

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, trace};

/// Programming errors when using a gate. These are never expected at runtime
/// and should be propagated, not handled.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("a wait is already outstanding on this gate")]
    AlreadyWaiting,

    #[error("cannot wait for a decision on the ui thread")]
    WaitOnUiThread,
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// `release()` was called.
    Released,
    /// The wait was interrupted (shutdown, panel cancelled).
    Interrupted,
}

#[derive(Debug, Default)]
struct GateState {
    /// Present while a wait is outstanding. Holds the outcome once signalled,
    /// until the waiter wakes and takes it.
    wait: Option<Option<WaitOutcome>>,
    /// An interrupt that arrived while nobody was waiting.
    interrupt_pending: bool,
}

impl GateState {
    fn is_waiting(&self) -> bool {
        matches!(self.wait, Some(None))
    }
}

/// Single-waiter latch. IDLE -> WAITING on `begin_wait`, back to IDLE on
/// `release` or `interrupt`.
#[derive(Debug, Default)]
pub struct TurnGate {
    state: Mutex<GateState>,
    signal: Condvar,
}

impl TurnGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `release()` or `interrupt()`.
    ///
    /// A pending interrupt is consumed and returns `Interrupted` immediately.
    pub fn begin_wait(&self) -> Result<WaitOutcome, GateError> {
        self.begin_wait_unless(|| false)
    }

    /// Like `begin_wait`, but first evaluates `ready` while holding the gate
    /// lock and returns `Released` without blocking if it reports true.
    ///
    /// Callers that publish a decision before calling `release()` use this to
    /// avoid losing a decision made before the waiter arrived.
    pub fn begin_wait_unless<F>(&self, ready: F) -> Result<WaitOutcome, GateError>
    where
        F: FnOnce() -> bool,
    {
        let mut state = self.state.lock();
        if state.wait.is_some() {
            return Err(GateError::AlreadyWaiting);
        }
        if state.interrupt_pending {
            state.interrupt_pending = false;
            debug!("gate wait interrupted on entry");
            return Ok(WaitOutcome::Interrupted);
        }
        if ready() {
            trace!("gate already satisfied");
            return Ok(WaitOutcome::Released);
        }

        state.wait = Some(None);
        trace!("gate waiting");
        loop {
            if let Some(Some(outcome)) = state.wait {
                state.wait = None;
                trace!(?outcome, "gate wait finished");
                return Ok(outcome);
            }
            self.signal.wait(&mut state);
        }
    }

    /// Wakes the outstanding waiter. No-op when nobody is waiting.
    pub fn release(&self) {
        self.finish(WaitOutcome::Released);
    }

    /// Interrupts the outstanding waiter, or the next one if nobody is
    /// waiting yet.
    ///
    /// A wait that has already been released but whose thread has not woken
    /// yet keeps its `Released` outcome and the interrupt is dropped.
    pub fn interrupt(&self) {
        let mut state = self.state.lock();
        match state.wait {
            Some(None) => {
                state.wait = Some(Some(WaitOutcome::Interrupted));
                self.signal.notify_all();
            }
            Some(Some(outcome)) => {
                debug!(?outcome, "gate already signalled, dropping interrupt");
            }
            None => {
                state.interrupt_pending = true;
                debug!("gate interrupt pending");
            }
        }
    }

    /// Forgets an interrupt that no wait has consumed yet.
    pub fn clear_interrupt(&self) {
        self.state.lock().interrupt_pending = false;
    }

    /// Returns true while a waiter is blocked and not yet signalled.
    pub fn is_waiting(&self) -> bool {
        self.state.lock().is_waiting()
    }

    fn finish(&self, outcome: WaitOutcome) {
        let mut state = self.state.lock();
        if state.is_waiting() {
            state.wait = Some(Some(outcome));
            self.signal.notify_all();
        }
    }
}
