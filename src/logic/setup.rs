//! Setup: build a new tournament document, and organiser edits to settings and names.

use crate::logic::fixtures::{FixtureSource, MIN_PLAYERS};
use crate::logic::mexicano::restart_rounds;
use crate::models::{
    Format, LiveState, MexicanoMode, Player, PlayerId, Settings, SettingsUpdate, Team,
    TournamentDoc, TournamentError, TournamentMeta, DEFAULT_POINTS_TOTAL,
};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;

fn default_points_total() -> u32 {
    DEFAULT_POINTS_TOTAL
}

fn default_court_count() -> u32 {
    1
}

/// Everything needed to create a tournament.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTournament {
    pub name: String,
    #[serde(default)]
    pub format: Format,
    pub organiser_credential: String,
    /// Player names (Americano, Mexicano individual mode).
    #[serde(default)]
    pub players: Vec<String>,
    /// Fixed pairs (Mexicano team mode).
    #[serde(default)]
    pub teams: Vec<[String; 2]>,
    #[serde(default = "default_court_count")]
    pub court_count: u32,
    #[serde(default)]
    pub fixed_points: bool,
    #[serde(default = "default_points_total")]
    pub points_total: u32,
    #[serde(default)]
    pub mexicano_mode: MexicanoMode,
}

/// Build the initial document. Americano court counts are checked against the fixture
/// source; Mexicano draws round 1 by lottery.
pub fn new_document<R: Rng + ?Sized>(
    new: NewTournament,
    source: &dyn FixtureSource,
    rng: &mut R,
) -> Result<TournamentDoc, TournamentError> {
    let mut settings = Settings::new(new.court_count);
    settings.fixed_points = new.fixed_points;
    settings.points_total = new.points_total;
    settings.mexicano_mode = new.mexicano_mode;

    let mut live = LiveState {
        settings,
        ..LiveState::default()
    };

    match (new.format, new.mexicano_mode) {
        (Format::Americano, _) => {
            live.players = Player::roster(&new.players);
            source.check_courts(live.player_count(), new.court_count)?;
        }
        (Format::Mexicano, MexicanoMode::Individual) => {
            live.players = Player::roster(&new.players);
            if live.players.len() < MIN_PLAYERS as usize {
                return Err(TournamentError::NotEnoughPlayers {
                    required: MIN_PLAYERS as usize,
                    actual: live.players.len(),
                });
            }
        }
        (Format::Mexicano, MexicanoMode::Team) => {
            live.teams = new
                .teams
                .iter()
                .enumerate()
                .map(|(i, [a, b])| Team::new(i as u32 + 1, a.trim(), b.trim()))
                .collect();
            if live.teams.len() < 2 {
                return Err(TournamentError::NotEnoughPlayers {
                    required: MIN_PLAYERS as usize,
                    actual: live.teams.len() * 2,
                });
            }
        }
    }

    if new.format == Format::Mexicano {
        restart_rounds(&mut live, rng);
    }

    let now = Utc::now();
    Ok(TournamentDoc {
        meta: TournamentMeta {
            name: new.name.trim().to_string(),
            format: new.format,
            organiser_credential: new.organiser_credential,
            created_at: now,
            updated_at: now,
        },
        live,
    })
}

/// Apply a partial settings change. Returns whether anything changed.
pub fn apply_settings(
    live: &mut LiveState,
    update: SettingsUpdate,
    format: Format,
    source: &dyn FixtureSource,
) -> Result<bool, TournamentError> {
    if let Some(courts) = update.court_count {
        if format == Format::Americano {
            source.check_courts(live.player_count(), courts)?;
        } else if courts == 0 {
            return Err(TournamentError::InvalidCourtCount {
                courts,
                min: 1,
                max: u32::MAX,
            });
        }
    }

    let before = live.settings.clone();
    let s = &mut live.settings;
    if let Some(courts) = update.court_count {
        s.court_count = courts;
    }
    if let Some(fixed) = update.fixed_points {
        s.fixed_points = fixed;
    }
    if let Some(total) = update.points_total {
        s.points_total = total;
    }
    if let Some(names) = update.court_names {
        s.court_names = names;
    }
    Ok(live.settings != before)
}

/// Rename a player; blank names are ignored.
pub fn rename_player(
    live: &mut LiveState,
    id: PlayerId,
    name: &str,
) -> Result<bool, TournamentError> {
    let name = name.trim();
    let player = live
        .get_player_mut(id)
        .ok_or(TournamentError::PlayerNotFound(id))?;
    if name.is_empty() || player.name == name {
        return Ok(false);
    }
    player.name = name.to_string();
    Ok(true)
}
