//! Player identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The player whose turn a panel is currently displaying.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player id, returning `None` for blank names.
    pub fn new(name: &str) -> Option<PlayerId> {
        let name = name.trim();
        if name.is_empty() {
            None
        } else {
            Some(PlayerId(name.to_string()))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
