//! Score pairs, score sides and canonical score keys.

use serde::{Deserialize, Serialize};

/// Which side of a fixture or match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    Team1,
    Team2,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Team1 => Side::Team2,
            Side::Team2 => Side::Team1,
        }
    }
}

/// A score pair. `None` means "not yet entered"; a fixture is complete iff both sides are set.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Score {
    #[serde(default)]
    pub team1: Option<u32>,
    #[serde(default)]
    pub team2: Option<u32>,
}

impl Score {
    pub fn new(team1: u32, team2: u32) -> Self {
        Self {
            team1: Some(team1),
            team2: Some(team2),
        }
    }

    pub fn get(&self, side: Side) -> Option<u32> {
        match side {
            Side::Team1 => self.team1,
            Side::Team2 => self.team2,
        }
    }

    pub fn set(&mut self, side: Side, value: Option<u32>) {
        match side {
            Side::Team1 => self.team1 = value,
            Side::Team2 => self.team2 = value,
        }
    }

    /// Both sides entered: returns `(team1, team2)`.
    pub fn completed(&self) -> Option<(u32, u32)> {
        Some((self.team1?, self.team2?))
    }

    pub fn is_complete(&self) -> bool {
        self.completed().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.team1.is_none() && self.team2.is_none()
    }
}

/// Coerce raw user input into a score value. Anything that is not a non-negative integer
/// is treated as "not entered" rather than rejected.
pub fn parse_score_input(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}

/// Canonical score-map key for a fixture index: `f_{index}`.
pub fn fixture_key(index: usize) -> String {
    format!("f_{index}")
}
