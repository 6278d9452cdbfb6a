//! The movement panel: collects moves for a turn and lets the player undo
//! them.
//!
//! The game thread loops on [`MovePanel::wait_for_move`], performing each
//! confirmed move through the delegate and refreshing the ledger, until the
//! player presses "Done" or the panel is deactivated. Undo requests come from
//! UI callbacks and always cancel the move being assembled first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::board::{PlayerId, UnitId};
use crate::delegate::MoveDelegate;
use crate::gate::GateError;
use crate::ledger::{LedgerError, MoveDescription, UndoLedger, UndoReport};
use crate::panel::{ActionPanel, Decision};
use crate::ui::UiQueue;

/// A decision made on the movement panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveChoice {
    Move(MoveDescription),
    /// The player has finished moving for this turn.
    Done,
}

pub struct MovePanel {
    panel: ActionPanel<MoveChoice>,
    ledger: UndoLedger,
    /// Units picked for the move being assembled.
    selection: Mutex<Vec<UnitId>>,
    confirm_empty_done: AtomicBool,
}

impl MovePanel {
    pub fn new(delegate: Arc<dyn MoveDelegate>, ui: Arc<UiQueue>) -> Self {
        MovePanel {
            ledger: UndoLedger::new(delegate, Some(Arc::clone(&ui))),
            panel: ActionPanel::new("move", ui),
            selection: Mutex::new(Vec::new()),
            confirm_empty_done: AtomicBool::new(true),
        }
    }

    /// Whether ending a turn without moving asks for confirmation.
    pub fn set_confirm_empty_done(&self, confirm: bool) {
        self.confirm_empty_done.store(confirm, Ordering::Relaxed);
    }

    pub fn ledger(&self) -> &UndoLedger {
        &self.ledger
    }

    pub fn display(&self, player: PlayerId) {
        self.cancel_move();
        self.panel.display(player);
        self.ledger.refresh();
    }

    /// Game-thread side: blocks until the player confirms a move, presses
    /// "Done", or the panel is deactivated.
    pub fn wait_for_move(&self) -> Result<Decision<MoveChoice>, GateError> {
        self.panel.wait_for_decision()
    }

    pub fn deactivate(&self) {
        self.cancel_move();
        self.panel.deactivate();
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.panel.current_player()
    }

    pub fn is_active(&self) -> bool {
        self.panel.is_active()
    }

    pub fn is_waiting(&self) -> bool {
        self.panel.is_waiting()
    }

    /// Re-reads the ledger after the delegate performed a move.
    pub fn update_moves(&self) {
        self.ledger.refresh();
    }

    /// Replaces the current unit selection.
    pub fn select_units(&self, units: Vec<UnitId>) {
        *self.selection.lock() = units;
    }

    pub fn selected_units(&self) -> Vec<UnitId> {
        self.selection.lock().clone()
    }

    /// Drops the move being assembled.
    pub fn cancel_move(&self) {
        self.selection.lock().clear();
    }

    /// Confirms a move. Returns false if the panel is not displayed.
    pub fn perform_move(&self, desc: MoveDescription) -> bool {
        self.cancel_move();
        self.panel.confirm(MoveChoice::Move(desc))
    }

    /// Ends the movement phase.
    ///
    /// If no moves were made and confirmation is on, `confirm_no_moves` is
    /// asked whether the player really does not want to move; the turn only
    /// ends if it returns true.
    pub fn done<F>(&self, confirm_no_moves: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        if !self.is_active() {
            return false;
        }
        if self.confirm_empty_done.load(Ordering::Relaxed)
            && self.ledger.is_empty()
            && !confirm_no_moves()
        {
            debug!("end of move phase declined");
            return false;
        }
        self.cancel_move();
        self.panel.confirm(MoveChoice::Done)
    }

    pub fn undo_move(&self, index: usize) -> Result<(), LedgerError> {
        self.cancel_move();
        self.ledger.undo_single(index)
    }

    pub fn undo_for_units(&self, units: &[UnitId]) -> Result<UndoReport, LedgerError> {
        self.cancel_move();
        self.ledger.undo_for_units(units)
    }

    /// Undoes every move involving the selected units.
    pub fn undo_selected(&self) -> Result<UndoReport, LedgerError> {
        let units = self.selected_units();
        if units.is_empty() {
            return Err(LedgerError::NothingToUndo);
        }
        self.undo_for_units(&units)
    }

    pub fn undo_all(&self) -> UndoReport {
        self.cancel_move();
        self.ledger.undo_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::MoveLog;
    use std::thread;

    fn setup() -> (Arc<MoveLog>, Arc<MovePanel>) {
        let ui = Arc::new(UiQueue::spawn("ui-move").unwrap());
        let log = Arc::new(MoveLog::new());
        let panel = Arc::new(MovePanel::new(
            Arc::clone(&log) as Arc<dyn MoveDelegate>,
            ui,
        ));
        (log, panel)
    }

    fn germans() -> PlayerId {
        PlayerId::new("Germans").unwrap()
    }

    fn mv(label: &str, units: &[u32]) -> MoveDescription {
        MoveDescription::new(label, units.iter().copied().map(UnitId).collect())
    }

    /// Runs a game thread that performs confirmed moves until the turn ends,
    /// returning the labels it performed.
    fn spawn_turn(log: &Arc<MoveLog>, panel: &Arc<MovePanel>) -> thread::JoinHandle<Vec<String>> {
        let log = Arc::clone(log);
        let panel = Arc::clone(panel);
        thread::spawn(move || {
            let mut performed = Vec::new();
            while let Ok(Decision::Confirmed(MoveChoice::Move(desc))) = panel.wait_for_move() {
                performed.push(desc.label.clone());
                log.record(desc);
                panel.update_moves();
            }
            performed
        })
    }

    fn wait_for_ledger(panel: &MovePanel, len: usize) {
        while panel.ledger().len() != len {
            thread::yield_now();
        }
    }

    #[test]
    fn moves_flow_through_to_ledger() {
        let (log, panel) = setup();
        panel.display(germans());
        let turn = spawn_turn(&log, &panel);

        assert!(panel.perform_move(mv("infantry to Poland", &[1])));
        wait_for_ledger(&panel, 1);
        assert!(panel.perform_move(mv("tanks to Poland", &[2, 3])));
        wait_for_ledger(&panel, 2);
        assert!(panel.done(|| unreachable!("moves were made")));

        assert_eq!(
            turn.join().unwrap(),
            vec!["infantry to Poland", "tanks to Poland"]
        );
        assert_eq!(panel.ledger().moves()[1].units, vec![UnitId(2), UnitId(3)]);
    }

    #[test]
    fn done_without_moves_needs_confirmation() {
        let (_log, panel) = setup();
        panel.display(germans());
        assert!(!panel.done(|| false));
        assert!(panel.done(|| true));
        assert_eq!(panel.wait_for_move(), Ok(Decision::Confirmed(MoveChoice::Done)));
    }

    #[test]
    fn done_without_confirmation_setting() {
        let (_log, panel) = setup();
        panel.set_confirm_empty_done(false);
        panel.display(germans());
        assert!(panel.done(|| false));
    }

    #[test]
    fn done_on_hidden_panel_is_ignored() {
        let (_log, panel) = setup();
        assert!(!panel.done(|| true));
    }

    #[test]
    fn undo_cancels_selection() {
        let (log, panel) = setup();
        log.record(mv("a", &[1]));
        panel.display(germans());
        panel.select_units(vec![UnitId(4)]);

        assert_eq!(panel.undo_move(0), Ok(()));
        assert!(panel.selected_units().is_empty());
        assert!(panel.ledger().is_empty());
    }

    #[test]
    fn undo_selected_uses_highlighted_units() {
        let (log, panel) = setup();
        log.record(mv("a", &[1]));
        log.record(mv("b", &[2]));
        log.record(mv("c", &[1]));
        panel.display(germans());

        assert_eq!(panel.undo_selected(), Err(LedgerError::NothingToUndo));

        panel.select_units(vec![UnitId(1)]);
        let report = panel.undo_selected().unwrap();
        assert_eq!(report.undone, vec![2, 0]);
        let moves = panel.ledger().moves();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].label, "b");
        assert_eq!(moves[0].index, 0);
    }

    #[test]
    fn deactivate_ends_turn_as_abandoned() {
        let (log, panel) = setup();
        panel.display(germans());
        let turn = spawn_turn(&log, &panel);
        while !panel.is_waiting() {
            thread::yield_now();
        }
        panel.deactivate();
        assert!(turn.join().unwrap().is_empty());
        assert!(!panel.perform_move(mv("late", &[1])));
    }
}
