//! Console command parser.
//!
//! Parses incoming command lines into structured `Command` variants that the
//! session loop dispatches on.

use tracing::warn;

use crate::board::{parse_unit_list, PlayerId, UnitId};
use crate::ledger::MoveDescription;

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Synchronization ping; flushes the UI queue and replies `readyok`.
    IsReady,

    /// Set a session option: `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Start a movement turn for a player.
    Begin { player: PlayerId },

    /// Replace the unit selection (the highlighted units).
    Select { units: Vec<UnitId> },

    /// Confirm a move: `move <label> <units> [<end>]`.
    Move(MoveDescription),

    /// Undo the move at an index.
    Undo { index: usize },

    /// Undo every move involving any of the units.
    UndoUnits { units: Vec<UnitId> },

    /// Undo every move involving the selected units.
    UndoSelected,

    /// Undo everything that can be undone.
    UndoAll,

    /// Mark a move as impossible to undo: `cantundo <index> <reason...>`.
    CantUndo { index: usize, reason: String },

    /// List the moves made this turn.
    Moves,

    /// End the movement phase; `force` skips the no-moves confirmation.
    Done { force: bool },

    /// Cancel the turn without a decision.
    Abandon,

    /// Terminate the session.
    Quit,
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None` after logging a warning.
pub fn parse_command(line: &str) -> Option<Command> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    match tokens[0] {
        "isready" => Some(Command::IsReady),
        "quit" => Some(Command::Quit),
        "moves" => Some(Command::Moves),
        "undoall" => Some(Command::UndoAll),
        "undoselected" => Some(Command::UndoSelected),
        "abandon" => Some(Command::Abandon),

        "setoption" => parse_setoption(&tokens),
        "begin" => parse_begin(&tokens),
        "select" => parse_units(&tokens).map(|units| Command::Select { units }),
        "move" => parse_move(&tokens),
        "undo" => parse_index(&tokens).map(|index| Command::Undo { index }),
        "undounits" => parse_units(&tokens).map(|units| Command::UndoUnits { units }),
        "cantundo" => parse_cantundo(&tokens),
        "done" => parse_done(&tokens),

        other => {
            warn!("unknown command: {}", other);
            None
        }
    }
}

/// Parses `setoption name <id> [value <x>]`.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        warn!("malformed setoption: expected 'setoption name <id> [value <x>]'");
        return None;
    }

    let value_idx = tokens.iter().position(|&t| t == "value");

    let (name, value) = match value_idx {
        Some(vi) => {
            let name_parts = &tokens[2..vi];
            let value_parts = &tokens[vi + 1..];
            if name_parts.is_empty() {
                warn!("malformed setoption: empty name");
                return None;
            }
            let value = if value_parts.is_empty() {
                None
            } else {
                Some(value_parts.join(" "))
            };
            (name_parts.join(" "), value)
        }
        None => (tokens[2..].join(" "), None),
    };

    Some(Command::SetOption { name, value })
}

/// Parses `begin <player>`. Player names may contain spaces.
fn parse_begin(tokens: &[&str]) -> Option<Command> {
    match PlayerId::new(&tokens[1..].join(" ")) {
        Some(player) => Some(Command::Begin { player }),
        None => {
            warn!("malformed begin: expected 'begin <player>'");
            None
        }
    }
}

/// Parses the unit list argument of `select` and `undounits`.
fn parse_units(tokens: &[&str]) -> Option<Vec<UnitId>> {
    if tokens.len() != 2 {
        warn!("malformed {}: expected '{} <unit,unit,...>'", tokens[0], tokens[0]);
        return None;
    }
    match parse_unit_list(tokens[1]) {
        Ok(units) => Some(units),
        Err(e) => {
            warn!("malformed {}: {}", tokens[0], e);
            None
        }
    }
}

/// Parses the index argument of `undo`.
fn parse_index(tokens: &[&str]) -> Option<usize> {
    if tokens.len() != 2 {
        warn!("malformed {}: expected '{} <index>'", tokens[0], tokens[0]);
        return None;
    }
    match tokens[1].parse::<usize>() {
        Ok(index) => Some(index),
        Err(_) => {
            warn!("invalid index: '{}'", tokens[1]);
            None
        }
    }
}

/// Parses `move <label> <units> [<end>]`.
fn parse_move(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens.len() > 4 {
        warn!("malformed move: expected 'move <label> <units> [<end>]'");
        return None;
    }
    let units = match parse_unit_list(tokens[2]) {
        Ok(units) => units,
        Err(e) => {
            warn!("malformed move: {}", e);
            return None;
        }
    };
    let mut desc = MoveDescription::new(tokens[1], units);
    if let Some(end) = tokens.get(3) {
        desc = desc.ending_at(*end);
    }
    Some(Command::Move(desc))
}

/// Parses `cantundo <index> <reason...>`.
fn parse_cantundo(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 {
        warn!("malformed cantundo: expected 'cantundo <index> <reason>'");
        return None;
    }
    let index = parse_index(&tokens[..2])?;
    Some(Command::CantUndo {
        index,
        reason: tokens[2..].join(" "),
    })
}

/// Parses `done [force]`.
fn parse_done(tokens: &[&str]) -> Option<Command> {
    match tokens.get(1) {
        None => Some(Command::Done { force: false }),
        Some(&"force") if tokens.len() == 2 => Some(Command::Done { force: true }),
        Some(other) => {
            warn!("unknown done parameter: '{}'", other);
            None
        }
    }
}
