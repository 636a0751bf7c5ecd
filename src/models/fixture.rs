//! Fixture (one fixed 2v2 pairing) and Timeslot (one round of simultaneous courts).

use crate::models::player::PlayerId;
use crate::models::tournament::Settings;
use serde::{Deserialize, Serialize};

/// One pairing from the full round-robin list. Identity is `index`, which never changes
/// for a given player count, whatever the court count.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub index: usize,
    pub teams: [[PlayerId; 2]; 2],
}

impl Fixture {
    pub fn new(index: usize, team_1: [PlayerId; 2], team_2: [PlayerId; 2]) -> Self {
        Self {
            index,
            teams: [team_1, team_2],
        }
    }

    /// All four players, team 1 first.
    pub fn players(&self) -> [PlayerId; 4] {
        let [[a, b], [c, d]] = self.teams;
        [a, b, c, d]
    }

    pub fn involves(&self, player: PlayerId) -> bool {
        self.players().contains(&player)
    }
}

/// Derived, never persisted: fixtures played at the same time plus who rests.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Timeslot {
    /// 1-based round number (slot index + 1).
    pub round: usize,
    /// Fixtures in court order.
    pub fixtures: Vec<Fixture>,
    /// Players not on court this round, ascending.
    pub resting: Vec<PlayerId>,
}

impl Timeslot {
    /// Players on court this round, in fixture order.
    pub fn playing(&self) -> Vec<PlayerId> {
        self.fixtures.iter().flat_map(|f| f.players()).collect()
    }

    /// Fixtures paired with the display name of the court they are played on.
    pub fn on_courts<'a>(&'a self, settings: &Settings) -> Vec<CourtFixture<'a>> {
        self.fixtures
            .iter()
            .enumerate()
            .map(|(i, fixture)| CourtFixture {
                court: settings.court_name(i + 1),
                fixture,
            })
            .collect()
    }
}

/// A fixture as shown on a court.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CourtFixture<'a> {
    pub court: String,
    pub fixture: &'a Fixture,
}
