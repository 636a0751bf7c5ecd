//! Tournament document: static meta, live (synced) state, settings, and errors.

use crate::models::game::{MatchId, Round};
use crate::models::player::{Player, PlayerId, Team};
use crate::models::score::Score;
use crate::sync::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during tournament operations.
#[derive(Debug, Error)]
pub enum TournamentError {
    /// No document stored under this id.
    #[error("Tournament not found: {0}")]
    NotFound(TournamentId),
    /// Not every match of the current round has a completed score.
    #[error("Not all matches have a result")]
    IncompleteResults,
    #[error("Need at least {required} players (have {actual})")]
    NotEnoughPlayers { required: usize, actual: usize },
    #[error("Court count {courts} outside {min}..={max}")]
    InvalidCourtCount { courts: u32, min: u32, max: u32 },
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),
    /// Tournament is not in a state that allows this action.
    #[error("Invalid state for this action")]
    InvalidState,
    /// The session was closed; no further operations are accepted.
    #[error("Tournament session closed")]
    SessionClosed,
    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),
    #[error("Malformed tournament document: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Tournament format.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Fixed round-robin fixture list packed into timeslots.
    #[default]
    Americano,
    /// Re-paired every round from the standings.
    Mexicano,
}

/// Mexicano entry mode.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MexicanoMode {
    /// Players rotate partners every round.
    #[default]
    Individual,
    /// Fixed pairs compete as one side.
    Team,
}

pub const DEFAULT_POINTS_TOTAL: u32 = 24;

fn default_points_total() -> u32 {
    DEFAULT_POINTS_TOTAL
}

/// Organiser-editable settings. Synced as part of the live subtree.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub court_count: u32,
    /// Both sides must sum to `points_total`; entering one side derives the other.
    #[serde(default)]
    pub fixed_points: bool,
    #[serde(default = "default_points_total")]
    pub points_total: u32,
    #[serde(default)]
    pub court_names: Vec<String>,
    #[serde(default)]
    pub mexicano_mode: MexicanoMode,
}

impl Settings {
    pub fn new(court_count: u32) -> Self {
        Self {
            court_count,
            fixed_points: false,
            points_total: DEFAULT_POINTS_TOTAL,
            court_names: Vec::new(),
            mexicano_mode: MexicanoMode::Individual,
        }
    }

    /// Upper bound for a single side's score, if the scoring mode has one.
    pub fn score_cap(&self) -> Option<u32> {
        self.fixed_points.then_some(self.points_total)
    }

    /// Display name for 1-based court `n`.
    pub fn court_name(&self, n: usize) -> String {
        self.court_names
            .get(n.wrapping_sub(1))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Court {n}"))
    }
}

/// Partial settings change; `None` fields are left as they are.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub court_count: Option<u32>,
    pub fixed_points: Option<bool>,
    pub points_total: Option<u32>,
    pub court_names: Option<Vec<String>>,
}

/// Static part of the document: written once at creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentMeta {
    pub name: String,
    pub format: Format,
    /// Opaque organiser credential (hashed elsewhere); compared verbatim on unlock.
    pub organiser_credential: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dynamic part of the document: everything that clients subscribe to or poll.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveState {
    pub settings: Settings,
    #[serde(default)]
    pub players: Vec<Player>,
    /// Mexicano team mode only.
    #[serde(default)]
    pub teams: Vec<Team>,
    /// Americano only, keyed by `f_{fixtureIndex}` (or a legacy `{round}_{match}` key before migration).
    #[serde(default)]
    pub scores: BTreeMap<String, Score>,
    /// Mexicano only.
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Mexicano only: 1-based number of the round being played.
    #[serde(default)]
    pub current_round: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(1)
    }
}

impl LiveState {
    pub fn player_count(&self) -> u32 {
        self.players.len() as u32
    }

    pub fn player_name(&self, id: PlayerId) -> Option<&str> {
        self.players
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.as_str())
    }

    pub fn get_player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The round currently being played (Mexicano).
    pub fn current(&self) -> Option<&Round> {
        self.rounds
            .iter()
            .find(|r| r.round_number == self.current_round)
    }
}

/// Full persisted document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TournamentDoc {
    pub meta: TournamentMeta,
    pub live: LiveState,
}

/// Store path of a tournament document.
pub fn document_path(id: TournamentId) -> String {
    format!("tournaments/{id}")
}
