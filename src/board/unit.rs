//! Unit identifiers.
//!
//! The presentation core never inspects units beyond identity: moves carry
//! the set of units they touch, and unit selections are matched against it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing unit identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitParseError {
    #[error("empty unit list")]
    Empty,

    #[error("invalid unit id '{0}'")]
    InvalidId(String),
}

/// Opaque identifier of a unit on the game board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UnitId {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(UnitId)
            .map_err(|_| UnitParseError::InvalidId(s.to_string()))
    }
}

/// Parses a comma-separated unit list such as `3,7,9`.
///
/// Duplicates are kept in input order; callers that need set semantics
/// compare with `contains`.
pub fn parse_unit_list(s: &str) -> Result<Vec<UnitId>, UnitParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UnitParseError::Empty);
    }
    s.split(',').map(str::parse).collect()
}

/// Formats a unit list in the same comma-separated form.
pub fn format_unit_list(units: &[UnitId]) -> String {
    units
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Returns true if any unit appears in both slices.
pub fn shares_unit(a: &[UnitId], b: &[UnitId]) -> bool {
    a.iter().any(|u| b.contains(u))
}
