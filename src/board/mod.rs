//! Game-model identifiers consumed by the presentation core.
//!
//! The board itself lives elsewhere; panels only need to know which player
//! is acting and which units a move touches.

pub mod player;
pub mod unit;

pub use player::PlayerId;
pub use unit::{format_unit_list, parse_unit_list, shares_unit, UnitId, UnitParseError};
