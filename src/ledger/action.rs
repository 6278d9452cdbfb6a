//! Undoable actions ("moves") and the descriptions they are recorded from.

use serde::{Deserialize, Serialize};

use crate::board::{shares_unit, UnitId};

/// What the player asked for: the units to move, a label, and where they end
/// up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDescription {
    pub units: Vec<UnitId>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl MoveDescription {
    pub fn new(label: impl Into<String>, units: Vec<UnitId>) -> Self {
        MoveDescription {
            units,
            label: label.into(),
            end: None,
        }
    }

    /// Sets the territory the move ends in.
    pub fn ending_at(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }
}

/// A reversible action in the current turn.
///
/// `index` is the action's position in the ledger and changes whenever an
/// earlier action is undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoableAction {
    pub index: usize,
    pub units: Vec<UnitId>,
    pub label: String,
    /// Endpoint territory, for "jump to" in the move list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    pub can_undo: bool,
}

impl UndoableAction {
    pub fn from_description(index: usize, desc: MoveDescription) -> Self {
        UndoableAction {
            index,
            units: desc.units,
            label: desc.label,
            end: desc.end,
            can_undo: true,
        }
    }

    /// Returns true if the action moves any of `units`.
    pub fn involves_any(&self, units: &[UnitId]) -> bool {
        shares_unit(&self.units, units)
    }
}
