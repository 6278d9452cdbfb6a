//! Session state management.
//!
//! Owns the UI queue, the move delegate, the movement panel and the game
//! thread of the current turn. Console commands are UI events: they run on
//! the UI queue and talk to the game thread only through the panel. The game
//! thread reports each step back over a channel so responses come out in
//! command order.

use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::board::{format_unit_list, PlayerId, UnitId};
use crate::config::SessionConfig;
use crate::delegate::{MoveDelegate, MoveLog};
use crate::gate::GateError;
use crate::ledger::{LedgerError, MoveDescription, UndoReport};
use crate::panel::{Decision, MoveChoice, MovePanel};
use crate::protocol::{format_action, format_report, Command};
use crate::ui::UiQueue;

/// What the game thread reports back after each decision.
#[derive(Debug)]
enum TurnEvent {
    Moved { index: usize, label: String },
    Ended { moves: usize },
    Abandoned,
    Failed(GateError),
}

struct Turn {
    player: PlayerId,
    worker: JoinHandle<()>,
    events: Receiver<TurnEvent>,
}

/// Holds everything between commands.
pub struct Session {
    pub config: SessionConfig,
    ui: Arc<UiQueue>,
    log: Arc<MoveLog>,
    panel: Arc<MovePanel>,
    turn: Option<Turn>,
    /// Player whose abandoned turn left moves in the log.
    abandoned_by: Option<PlayerId>,
}

impl Session {
    pub fn new(config: SessionConfig) -> io::Result<Self> {
        let ui = Arc::new(UiQueue::spawn(&config.ui_thread_name)?);
        let log = Arc::new(MoveLog::new());
        let panel = Arc::new(MovePanel::new(
            Arc::clone(&log) as Arc<dyn MoveDelegate>,
            Arc::clone(&ui),
        ));
        panel.set_confirm_empty_done(config.confirm_empty_done);
        info!(ui = ui.name(), "session ready");
        Ok(Session {
            config,
            ui,
            log,
            panel,
            turn: None,
            abandoned_by: None,
        })
    }

    /// The delegate backing this session.
    pub fn delegate(&self) -> &Arc<MoveLog> {
        &self.log
    }

    pub fn panel(&self) -> &Arc<MovePanel> {
        &self.panel
    }

    /// Returns the player whose turn is in progress.
    pub fn active_player(&self) -> Option<&PlayerId> {
        self.turn.as_ref().map(|t| &t.player)
    }

    /// Runs one command. Returns false when the session should end.
    pub fn dispatch<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<bool> {
        match cmd {
            Command::IsReady => self.handle_isready(out)?,
            Command::SetOption { name, value } => self.set_option(name, value),
            Command::Begin { player } => self.begin(player, out)?,
            Command::Select { units } => self.select(units, out)?,
            Command::Move(desc) => self.handle_move(desc, out)?,
            Command::Undo { index } => self.undo(index, out)?,
            Command::UndoUnits { units } => {
                let panel = Arc::clone(&self.panel);
                let result = self.ui.invoke_and_wait(move || panel.undo_for_units(&units));
                self.write_batch(result, out)?;
            }
            Command::UndoSelected => {
                let panel = Arc::clone(&self.panel);
                let result = self.ui.invoke_and_wait(move || panel.undo_selected());
                self.write_batch(result, out)?;
            }
            Command::UndoAll => {
                let panel = Arc::clone(&self.panel);
                let result = self.ui.invoke_and_wait(move || Ok(panel.undo_all()));
                self.write_batch(result, out)?;
            }
            Command::CantUndo { index, reason } => self.cant_undo(index, reason, out)?,
            Command::Moves => self.handle_moves(out)?,
            Command::Done { force } => self.done(force, out)?,
            Command::Abandon => self.abandon(out)?,
            Command::Quit => {
                self.shutdown();
                return Ok(false);
            }
        }
        out.flush()?;
        Ok(true)
    }

    /// Sets a session option, logging unknown names.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        if !self.config.set_option(&name, value.as_deref()) {
            warn!("unknown option or value: {} {:?}", name, value);
            return;
        }
        self.panel
            .set_confirm_empty_done(self.config.confirm_empty_done);
    }

    /// Handles `isready`: waits for the UI queue to catch up.
    pub fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.ui.flush();
        writeln!(out, "readyok")
    }

    /// Starts the game thread for `player`'s movement phase.
    pub fn begin<W: Write>(&mut self, player: PlayerId, out: &mut W) -> io::Result<()> {
        if let Some(turn) = &self.turn {
            return writeln!(out, "error turn already in progress for {}", turn.player);
        }
        // An abandoned turn can be resumed by the same player only.
        if let Some(previous) = self.abandoned_by.take() {
            if previous != player {
                info!(%previous, moves = self.log.len(), "discarding moves of abandoned turn");
                self.log.clear();
            }
        }

        let panel = Arc::clone(&self.panel);
        let shown = player.clone();
        if self.ui.invoke_and_wait(move || panel.display(shown)).is_none() {
            return writeln!(out, "error ui queue closed");
        }

        let (tx, rx) = mpsc::channel();
        let panel = Arc::clone(&self.panel);
        let log = Arc::clone(&self.log);
        let worker = match thread::Builder::new()
            .name(format!("turn-{}", player))
            .spawn(move || run_turn(panel, log, tx))
        {
            Ok(worker) => worker,
            Err(e) => {
                self.panel.deactivate();
                return writeln!(out, "error failed to start turn: {}", e);
            }
        };

        info!(%player, "turn started");
        writeln!(out, "turn {}", player)?;
        self.turn = Some(Turn {
            player,
            worker,
            events: rx,
        });
        Ok(())
    }

    pub fn select<W: Write>(&mut self, units: Vec<UnitId>, out: &mut W) -> io::Result<()> {
        let count = units.len();
        debug!(units = %format_unit_list(&units), "selecting units");
        let panel = Arc::clone(&self.panel);
        self.ui.invoke_and_wait(move || panel.select_units(units));
        writeln!(out, "selected {}", count)
    }

    /// Confirms a move and waits for the game thread to perform it.
    pub fn handle_move<W: Write>(&mut self, desc: MoveDescription, out: &mut W) -> io::Result<()> {
        if self.turn.is_none() {
            return writeln!(out, "error no active turn");
        }
        let panel = Arc::clone(&self.panel);
        let accepted = self
            .ui
            .invoke_and_wait(move || panel.perform_move(desc))
            .unwrap_or(false);
        if !accepted {
            return writeln!(out, "error move panel is not displayed");
        }
        match self.next_event() {
            Some(TurnEvent::Moved { index, label }) => {
                writeln!(out, "moved {} {}", index, label)?;
                self.echo_ledger(out)
            }
            other => self.finish_turn(other, out),
        }
    }

    pub fn undo<W: Write>(&mut self, index: usize, out: &mut W) -> io::Result<()> {
        let panel = Arc::clone(&self.panel);
        match self.ui.invoke_and_wait(move || panel.undo_move(index)) {
            Some(Ok(())) => {
                writeln!(out, "undone {}", index)?;
                self.echo_ledger(out)
            }
            Some(Err(e)) => writeln!(out, "error {}", e),
            None => writeln!(out, "error ui queue closed"),
        }
    }

    pub fn cant_undo<W: Write>(&mut self, index: usize, reason: String, out: &mut W) -> io::Result<()> {
        if !self.log.set_cant_undo(index, reason) {
            return writeln!(out, "error {}", LedgerError::NoSuchMove(index));
        }
        let panel = Arc::clone(&self.panel);
        self.ui.invoke_and_wait(move || panel.update_moves());
        writeln!(out, "ok")
    }

    /// Lists the moves currently in the ledger.
    pub fn handle_moves<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for action in self.panel.ledger().moves().iter() {
            writeln!(out, "{}", format_action(action)?)?;
        }
        writeln!(out, "movesok")
    }

    /// Ends the movement phase. Without `force`, a phase with no moves is
    /// only ended if confirmation is switched off.
    pub fn done<W: Write>(&mut self, force: bool, out: &mut W) -> io::Result<()> {
        if self.turn.is_none() {
            return writeln!(out, "error no active turn");
        }
        let panel = Arc::clone(&self.panel);
        let ended = self
            .ui
            .invoke_and_wait(move || panel.done(|| force))
            .unwrap_or(false);
        if !ended {
            return writeln!(
                out,
                "error confirm ending the move phase without moving: send 'done force'"
            );
        }
        let event = self.next_event();
        self.finish_turn(event, out)
    }

    /// Cancels the current turn without a decision.
    pub fn abandon<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.turn.is_none() {
            return writeln!(out, "error no active turn");
        }
        let panel = Arc::clone(&self.panel);
        self.ui.invoke_and_wait(move || panel.deactivate());
        let event = self.next_event();
        self.finish_turn(event, out)
    }

    /// Abandons any turn in progress and stops the UI queue.
    pub fn shutdown(&mut self) {
        if let Some(turn) = self.turn.take() {
            self.panel.deactivate();
            join_turn(turn);
        }
        self.ui.shutdown();
    }

    fn next_event(&self) -> Option<TurnEvent> {
        self.turn.as_ref().and_then(|t| t.events.recv().ok())
    }

    /// Reports how the turn ended and joins the game thread.
    fn finish_turn<W: Write>(&mut self, event: Option<TurnEvent>, out: &mut W) -> io::Result<()> {
        let Some(turn) = self.turn.take() else {
            return Ok(());
        };
        let player = turn.player.clone();
        join_turn(turn);
        match event {
            Some(TurnEvent::Ended { moves }) => {
                info!(%player, moves, "turn over");
                self.abandoned_by = None;
                writeln!(out, "turnover {} {}", player, moves)?;
                self.echo_ledger(out)
            }
            Some(TurnEvent::Abandoned) => {
                if !self.log.is_empty() {
                    self.abandoned_by = Some(player.clone());
                }
                writeln!(out, "abandoned {}", player)
            }
            Some(TurnEvent::Failed(e)) => writeln!(out, "error {}", e),
            Some(TurnEvent::Moved { index, .. }) => {
                error!(index, "unexpected move event while ending turn");
                writeln!(out, "error turn ended unexpectedly")
            }
            None => writeln!(out, "error turn ended unexpectedly"),
        }
    }

    fn write_batch<W: Write>(
        &self,
        result: Option<Result<UndoReport, LedgerError>>,
        out: &mut W,
    ) -> io::Result<()> {
        match result {
            Some(Ok(report)) => {
                for line in format_report(&report) {
                    writeln!(out, "{}", line)?;
                }
                if !report.undone.is_empty() {
                    self.echo_ledger(out)?;
                }
                Ok(())
            }
            Some(Err(e)) => writeln!(out, "error {}", e),
            None => writeln!(out, "error ui queue closed"),
        }
    }

    fn echo_ledger<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.config.echo_ledger {
            self.handle_moves(out)?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_turn(turn: Turn) {
    // With the receiver gone the game thread's next send fails and it exits.
    drop(turn.events);
    if turn.worker.join().is_err() {
        error!(player = %turn.player, "turn thread panicked");
    }
}

/// Game-thread loop for one movement phase.
fn run_turn(panel: Arc<MovePanel>, log: Arc<MoveLog>, events: Sender<TurnEvent>) {
    loop {
        let (event, finished) = match panel.wait_for_move() {
            Ok(Decision::Confirmed(MoveChoice::Move(desc))) => {
                let label = desc.label.clone();
                let index = log.record(desc);
                panel.update_moves();
                (TurnEvent::Moved { index, label }, false)
            }
            Ok(Decision::Confirmed(MoveChoice::Done)) => {
                let moves = log.len();
                panel.deactivate();
                log.clear();
                panel.update_moves();
                (TurnEvent::Ended { moves }, true)
            }
            Ok(Decision::Abandoned) => (TurnEvent::Abandoned, true),
            Err(e) => {
                error!("turn aborted: {}", e);
                (TurnEvent::Failed(e), true)
            }
        };
        if events.send(event).is_err() || finished {
            break;
        }
    }
}
