//! Action panels: the hand-off between game logic and the player.
//!
//! A panel is displayed for a player, then the game thread blocks in
//! [`ActionPanel::wait_for_decision`] while the UI queue runs widget
//! callbacks. A callback publishes the player's choice with
//! [`ActionPanel::confirm`], which releases the waiter. Deactivating the
//! panel (cancel, shutdown) interrupts the wait and yields
//! [`Decision::Abandoned`].

pub mod movement;

pub use movement::{MoveChoice, MovePanel};

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::board::PlayerId;
use crate::gate::{GateError, TurnGate, WaitOutcome};
use crate::ui::UiQueue;

/// What a wait on a panel produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision<T> {
    /// The player made a choice.
    Confirmed(T),
    /// The wait ended without a choice; nothing should be acted on.
    Abandoned,
}

impl<T> Decision<T> {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Decision::Confirmed(_))
    }
}

struct PanelState<T> {
    player: Option<PlayerId>,
    choice: Option<T>,
}

/// A panel that collects one decision of type `T` at a time.
pub struct ActionPanel<T> {
    name: &'static str,
    ui: Arc<UiQueue>,
    gate: TurnGate,
    state: Mutex<PanelState<T>>,
}

impl<T: Send> ActionPanel<T> {
    pub fn new(name: &'static str, ui: Arc<UiQueue>) -> Self {
        ActionPanel {
            name,
            ui,
            gate: TurnGate::new(),
            state: Mutex::new(PanelState {
                player: None,
                choice: None,
            }),
        }
    }

    pub fn ui(&self) -> &Arc<UiQueue> {
        &self.ui
    }

    /// Activates the panel for `player`. Any choice or cancellation left
    /// over from an earlier activation is dropped.
    pub fn display(&self, player: PlayerId) {
        self.gate.clear_interrupt();
        let mut state = self.state.lock();
        info!(panel = self.name, %player, "displaying panel");
        state.player = Some(player);
        state.choice = None;
    }

    /// Blocks the calling (game) thread until the player decides or the
    /// panel is deactivated.
    ///
    /// A choice confirmed before the wait began is returned immediately.
    pub fn wait_for_decision(&self) -> Result<Decision<T>, GateError> {
        if self.ui.is_current() {
            return Err(GateError::WaitOnUiThread);
        }
        let outcome = self
            .gate
            .begin_wait_unless(|| self.state.lock().choice.is_some())?;
        let choice = self.state.lock().choice.take();
        let decision = match (outcome, choice) {
            (WaitOutcome::Released, Some(choice)) => Decision::Confirmed(choice),
            _ => Decision::Abandoned,
        };
        debug!(
            panel = self.name,
            ?outcome,
            confirmed = decision.is_confirmed(),
            "wait finished"
        );
        Ok(decision)
    }

    /// Activates the panel and waits for the decision.
    pub fn display_and_wait(&self, player: PlayerId) -> Result<Decision<T>, GateError> {
        self.display(player);
        self.wait_for_decision()
    }

    /// Publishes the player's choice and wakes the game thread.
    ///
    /// Ignored when the panel is not displayed.
    pub fn confirm(&self, choice: T) -> bool {
        {
            let mut state = self.state.lock();
            if state.player.is_none() {
                debug!(panel = self.name, "ignoring choice on inactive panel");
                return false;
            }
            state.choice = Some(choice);
        }
        self.gate.release();
        true
    }

    /// Hides the panel. An outstanding wait, or the next one, ends as
    /// `Abandoned`.
    pub fn deactivate(&self) {
        {
            let mut state = self.state.lock();
            let Some(player) = state.player.take() else {
                return;
            };
            info!(panel = self.name, %player, "deactivating panel");
            state.choice = None;
        }
        self.gate.interrupt();
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.state.lock().player.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().player.is_some()
    }

    /// Returns true while the game thread is blocked on this panel.
    pub fn is_waiting(&self) -> bool {
        self.gate.is_waiting()
    }
}
