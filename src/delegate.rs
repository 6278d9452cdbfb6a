//! The remote delegate: the authoritative owner of the moves made this turn.
//!
//! Panels never mutate moves themselves. They ask the delegate to undo by
//! index and then re-read its list, because every undo renumbers the moves
//! after it.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::board::shares_unit;
use crate::ledger::{MoveDescription, UndoableAction};

/// The interface panels consume from the game-side move delegate.
pub trait MoveDelegate: Send + Sync {
    /// Returns the moves made so far this turn, oldest first.
    fn moves_made(&self) -> Vec<UndoableAction>;

    /// Undoes the move at `index`. `Err` carries a human-readable reason.
    fn undo_move(&self, index: usize) -> Result<(), String>;
}

#[derive(Debug, Clone)]
struct Entry {
    desc: MoveDescription,
    cant_undo: Option<String>,
}

/// In-memory move delegate.
///
/// A move cannot be undone while a later move still uses one of its units,
/// or once it has been marked un-undoable (e.g. after defensive fire).
#[derive(Debug, Default)]
pub struct MoveLog {
    entries: Mutex<Vec<Entry>>,
}

impl MoveLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a move and returns its index.
    pub fn record(&self, desc: MoveDescription) -> usize {
        let mut entries = self.entries.lock();
        let index = entries.len();
        debug!(index, label = %desc.label, "recording move");
        entries.push(Entry {
            desc,
            cant_undo: None,
        });
        index
    }

    /// Marks a move as permanently un-undoable. Returns false if no move
    /// exists at `index`.
    pub fn set_cant_undo(&self, index: usize, reason: impl Into<String>) -> bool {
        match self.entries.lock().get_mut(index) {
            Some(entry) => {
                entry.cant_undo = Some(reason.into());
                true
            }
            None => false,
        }
    }

    /// Forgets all moves, at the end of the turn.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            info!(moves = entries.len(), "clearing move log");
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl MoveDelegate for MoveLog {
    fn moves_made(&self) -> Vec<UndoableAction> {
        self.entries
            .lock()
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut action = UndoableAction::from_description(i, entry.desc.clone());
                action.can_undo = entry.cant_undo.is_none();
                action
            })
            .collect()
    }

    fn undo_move(&self, index: usize) -> Result<(), String> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get(index)
            .ok_or_else(|| format!("no move at index {}", index))?;
        if let Some(reason) = &entry.cant_undo {
            return Err(reason.clone());
        }
        if let Some(later) = entries[index + 1..]
            .iter()
            .position(|e| shares_unit(&e.desc.units, &entry.desc.units))
        {
            return Err(format!("move {} must be undone first", index + 1 + later));
        }
        let removed = entries.remove(index);
        debug!(index, label = %removed.desc.label, "undid move");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::UnitId;

    fn log_with(moves: &[(&str, &[u32])]) -> MoveLog {
        let log = MoveLog::new();
        for (label, units) in moves {
            log.record(MoveDescription::new(
                *label,
                units.iter().copied().map(UnitId).collect(),
            ));
        }
        log
    }

    fn labels(log: &MoveLog) -> Vec<String> {
        log.moves_made().into_iter().map(|m| m.label).collect()
    }

    #[test]
    fn record_assigns_sequential_indices() {
        let log = MoveLog::new();
        assert_eq!(log.record(MoveDescription::new("a", vec![UnitId(1)])), 0);
        assert_eq!(log.record(MoveDescription::new("b", vec![UnitId(2)])), 1);
        let moves = log.moves_made();
        assert_eq!(moves[1].index, 1);
        assert_eq!(moves[1].label, "b");
    }

    #[test]
    fn undo_renumbers_later_moves() {
        let log = log_with(&[("a", &[1]), ("b", &[2]), ("c", &[3])]);
        assert_eq!(log.undo_move(0), Ok(()));
        let moves = log.moves_made();
        assert_eq!(labels(&log), vec!["b", "c"]);
        assert_eq!(moves[0].index, 0);
        assert_eq!(moves[1].index, 1);
    }

    #[test]
    fn later_move_of_same_unit_blocks_undo() {
        let log = log_with(&[("a", &[1]), ("b", &[2]), ("c", &[1, 3])]);
        assert_eq!(
            log.undo_move(0),
            Err("move 2 must be undone first".to_string())
        );
        assert_eq!(log.len(), 3);
        assert_eq!(log.undo_move(2), Ok(()));
        assert_eq!(log.undo_move(0), Ok(()));
        assert_eq!(labels(&log), vec!["b"]);
    }

    #[test]
    fn cant_undo_reason_is_returned() {
        let log = log_with(&[("a", &[1])]);
        assert!(log.set_cant_undo(0, "AA has fired."));
        assert!(!log.set_cant_undo(5, "nope"));
        assert!(!log.moves_made()[0].can_undo);
        assert_eq!(log.undo_move(0), Err("AA has fired.".to_string()));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn out_of_range_undo_is_rejected() {
        let log = log_with(&[("a", &[1])]);
        assert_eq!(log.undo_move(3), Err("no move at index 3".to_string()));
    }

    #[test]
    fn clear_empties_log() {
        let log = log_with(&[("a", &[1]), ("b", &[2])]);
        log.clear();
        assert!(log.is_empty());
        assert!(log.moves_made().is_empty());
    }
}
