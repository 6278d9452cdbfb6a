//! The undo ledger: the panel-side view of the moves made this turn.
//!
//! The ledger is a read-mostly cache of the delegate's move list. Undoing a
//! move renumbers every move after it, so the ledger never patches its own
//! copy: after every mutating call it re-reads the delegate's list.
//!
//! Batch undos (by unit selection, or everything) run in descending index
//! order. Undoing index `k` only shifts moves above `k`, so each remaining
//! target index is still valid when its turn comes.

pub mod action;

pub use action::{MoveDescription, UndoableAction};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::board::UnitId;
use crate::delegate::MoveDelegate;
use crate::ui::UiQueue;

/// Expected, recoverable undo failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("could not undo move {index}: {reason}")]
    Rejected { index: usize, reason: String },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("no move at index {0}")]
    NoSuchMove(usize),
}

/// A single undo the delegate refused during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoFailure {
    pub index: usize,
    pub reason: String,
}

/// Result of a batch undo. Failures are collected, not raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoReport {
    /// Indices undone, in the order the undos were issued.
    pub undone: Vec<usize>,
    pub failures: Vec<UndoFailure>,
}

impl UndoReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Callback invoked on the UI queue with the moves to display.
pub type RenderListener = Arc<dyn Fn(&[UndoableAction]) + Send + Sync>;

struct LedgerView {
    generation: u64,
    moves: Arc<[UndoableAction]>,
}

struct Shared {
    view: RwLock<LedgerView>,
    listener: Mutex<Option<RenderListener>>,
}

impl Shared {
    fn render(&self, generation: u64) {
        let moves = {
            let view = self.view.read();
            if view.generation != generation {
                debug!(generation, current = view.generation, "skipping stale ledger render");
                return;
            }
            Arc::clone(&view.moves)
        };
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(&moves);
        }
    }
}

/// Ordered view of the undoable moves for the active player's turn.
pub struct UndoLedger {
    delegate: Arc<dyn MoveDelegate>,
    ui: Option<Arc<UiQueue>>,
    shared: Arc<Shared>,
}

impl UndoLedger {
    /// Creates an empty ledger backed by `delegate`. Renders are posted to
    /// `ui` when given, or run inline otherwise.
    pub fn new(delegate: Arc<dyn MoveDelegate>, ui: Option<Arc<UiQueue>>) -> Self {
        UndoLedger {
            delegate,
            ui,
            shared: Arc::new(Shared {
                view: RwLock::new(LedgerView {
                    generation: 0,
                    moves: Arc::from(Vec::new()),
                }),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Registers the callback that displays the move list.
    pub fn on_render<F>(&self, listener: F)
    where
        F: Fn(&[UndoableAction]) + Send + Sync + 'static,
    {
        *self.shared.listener.lock() = Some(Arc::new(listener));
    }

    /// Replaces the view wholesale. Safe from any thread; the last call wins.
    ///
    /// Indices are reassigned from position.
    pub fn set_moves(&self, mut moves: Vec<UndoableAction>) {
        for (position, action) in moves.iter_mut().enumerate() {
            if action.index != position {
                warn!(
                    reported = action.index,
                    position, "delegate index out of step with position, renumbering"
                );
                action.index = position;
            }
        }
        let generation = {
            let mut view = self.shared.view.write();
            view.generation += 1;
            view.moves = Arc::from(moves);
            view.generation
        };
        self.schedule_render(generation);
    }

    /// Re-reads the authoritative list from the delegate.
    pub fn refresh(&self) {
        self.set_moves(self.delegate.moves_made());
    }

    /// Snapshot of the current view.
    pub fn moves(&self) -> Arc<[UndoableAction]> {
        Arc::clone(&self.shared.view.read().moves)
    }

    pub fn len(&self) -> usize {
        self.shared.view.read().moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every `set_moves`.
    pub fn generation(&self) -> u64 {
        self.shared.view.read().generation
    }

    /// Undoes the move currently at `index`.
    ///
    /// On rejection the view is left untouched and the delegate's reason is
    /// returned for the caller to show or suppress.
    pub fn undo_single(&self, index: usize) -> Result<(), LedgerError> {
        if index >= self.len() {
            return Err(LedgerError::NoSuchMove(index));
        }
        if let Err(reason) = self.delegate.undo_move(index) {
            debug!(index, %reason, "undo rejected");
            return Err(LedgerError::Rejected { index, reason });
        }
        info!(index, "undid move");
        self.refresh();
        Ok(())
    }

    /// Undoes every undoable move that involves any of `units`, highest index
    /// first. Individual rejections are collected in the report.
    pub fn undo_for_units(&self, units: &[UnitId]) -> Result<UndoReport, LedgerError> {
        let targets: Vec<usize> = self
            .moves()
            .iter()
            .filter(|m| m.can_undo && m.involves_any(units))
            .map(|m| m.index)
            .collect();
        if targets.is_empty() {
            return Err(LedgerError::NothingToUndo);
        }
        Ok(self.undo_descending(targets))
    }

    /// Undoes every undoable move, best effort, highest index first.
    pub fn undo_all(&self) -> UndoReport {
        let targets: Vec<usize> = self
            .moves()
            .iter()
            .filter(|m| m.can_undo)
            .map(|m| m.index)
            .collect();
        self.undo_descending(targets)
    }

    fn undo_descending(&self, mut indices: Vec<usize>) -> UndoReport {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();

        let mut report = UndoReport::default();
        for index in indices {
            match self.delegate.undo_move(index) {
                Ok(()) => report.undone.push(index),
                Err(reason) => {
                    debug!(index, %reason, "undo rejected during batch");
                    report.failures.push(UndoFailure { index, reason });
                }
            }
        }
        info!(
            undone = report.undone.len(),
            failed = report.failures.len(),
            "batch undo finished"
        );
        self.refresh();
        report
    }

    fn schedule_render(&self, generation: u64) {
        match &self.ui {
            Some(ui) if !ui.is_current() => {
                let shared = Arc::clone(&self.shared);
                if !ui.post(move || shared.render(generation)) {
                    debug!("ui queue closed, dropping ledger render");
                }
            }
            _ => self.shared.render(generation),
        }
    }
}
