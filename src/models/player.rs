//! Player and Team data structures.

use serde::{Deserialize, Serialize};

/// Ordinal identifier for a player (1..=N, stable for the tournament lifetime).
pub type PlayerId = u32;

/// Ordinal identifier for a fixed team (Mexicano team mode).
pub type TeamId = u32;

/// A player in the tournament.
///
/// `points` and `games_played` are the cumulative Mexicano totals; Americano standings are
/// always folded from the score map and leave these at zero.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub games_played: u32,
}

impl Player {
    /// Create a new player with the given ordinal and name. Totals start at zero.
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            points: 0,
            games_played: 0,
        }
    }

    /// Build the roster `1..=names.len()` from display names. Blank names get a placeholder.
    pub fn roster<I, S>(names: I) -> Vec<Player>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let id = i as PlayerId + 1;
                let name = name.as_ref().trim();
                if name.is_empty() {
                    Player::new(id, format!("Player {id}"))
                } else {
                    Player::new(id, name)
                }
            })
            .collect()
    }
}

/// A fixed pair of players competing as one side (Mexicano team mode).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub players: [String; 2],
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub matches_played: u32,
}

impl Team {
    pub fn new(id: TeamId, first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            id,
            players: [first.into(), second.into()],
            points: 0,
            matches_played: 0,
        }
    }

    /// Display name, e.g. "Ana & Ben".
    pub fn name(&self) -> String {
        format!("{} & {}", self.players[0], self.players[1])
    }
}
