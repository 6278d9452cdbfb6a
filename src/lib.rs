//! Turnkeeper library.
//!
//! The turn-coordination core of a strategy game client: the turn gate that
//! pauses game logic until the player decides, the undo ledger of moves made
//! this turn, and the panels that tie them to a UI queue. Exposed for
//! integration tests and the console binary.

pub mod board;
pub mod config;
pub mod delegate;
pub mod gate;
pub mod ledger;
pub mod panel;
pub mod protocol;
pub mod session;
pub mod ui;
