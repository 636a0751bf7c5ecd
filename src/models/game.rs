//! Mexicano match (game) and round.

use crate::models::score::Score;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a Mexicano match. Pairings change every round, so matches get a
/// generated id rather than a fixture index.
pub type MatchId = Uuid;

/// Player id (individual mode) or team id (team mode).
pub type ParticipantId = u32;

/// A single match. Each side holds two player ids in individual mode, one team id in team mode.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMatch {
    pub id: MatchId,
    /// Court number, 1-based.
    pub court: usize,
    pub team_1: Vec<ParticipantId>,
    pub team_2: Vec<ParticipantId>,
    #[serde(default)]
    pub score: Score,
    /// Set once the score has been applied to cumulative totals.
    #[serde(default)]
    pub completed: bool,
}

impl GameMatch {
    pub fn new(court: usize, team_1: Vec<ParticipantId>, team_2: Vec<ParticipantId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            court,
            team_1,
            team_2,
            score: Score::default(),
            completed: false,
        }
    }
}

/// One generated Mexicano round. Its match composition never changes once generated;
/// only the scores do.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_number: u32,
    pub matches: Vec<GameMatch>,
    #[serde(default)]
    pub sitting_out: Vec<ParticipantId>,
    #[serde(default)]
    pub completed: bool,
}

impl Round {
    pub fn all_matches_complete(&self) -> bool {
        self.matches.iter().all(|m| m.completed)
    }

    pub fn get_match(&self, id: MatchId) -> Option<&GameMatch> {
        self.matches.iter().find(|m| m.id == id)
    }
}
