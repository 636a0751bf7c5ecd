//! Fixture source: the full, ordered list of Americano fixtures for a player count.
//!
//! Production fixture tables plug in through [`FixtureSource`]; [`RoundRobinFixtures`] is the
//! built-in deterministic table.

use crate::models::{Fixture, PlayerId, TournamentError};
use serde::Serialize;

/// Minimum players for a 2v2 fixture.
pub const MIN_PLAYERS: u32 = 4;

/// Fixture list plus how unevenly games are spread over players.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct TournamentInfo {
    pub fixtures: Vec<Fixture>,
    pub games_per_player_min: usize,
    pub games_per_player_max: usize,
}

/// Deterministic, pure source of fixtures. Fixture indices must be dense, 0-based and must
/// not depend on `court_count`, so that scores keyed by index survive court changes.
pub trait FixtureSource: Send + Sync {
    fn fixtures(&self, player_count: u32, court_count: u32) -> Vec<Fixture>;

    fn min_courts(&self, player_count: u32) -> u32;

    fn max_courts(&self, player_count: u32) -> u32;

    fn tournament_info(&self, player_count: u32, court_count: u32) -> TournamentInfo {
        let fixtures = self.fixtures(player_count, court_count);
        let mut games = vec![0usize; player_count as usize];
        for f in &fixtures {
            for p in f.players() {
                if let Some(g) = (p as usize).checked_sub(1).and_then(|i| games.get_mut(i)) {
                    *g += 1;
                }
            }
        }
        TournamentInfo {
            games_per_player_min: games.iter().copied().min().unwrap_or(0),
            games_per_player_max: games.iter().copied().max().unwrap_or(0),
            fixtures,
        }
    }

    /// Reject court counts outside the source's bounds (and rosters too small to play).
    fn check_courts(&self, player_count: u32, court_count: u32) -> Result<(), TournamentError> {
        if player_count < MIN_PLAYERS {
            return Err(TournamentError::NotEnoughPlayers {
                required: MIN_PLAYERS as usize,
                actual: player_count as usize,
            });
        }
        let (min, max) = (self.min_courts(player_count), self.max_courts(player_count));
        if court_count < min || court_count > max {
            return Err(TournamentError::InvalidCourtCount {
                courts: court_count,
                min,
                max,
            });
        }
        Ok(())
    }
}

/// Partner round-robin by the circle method: seat everyone (plus a bye for an odd roster),
/// rotate all seats but the first, and pair seat `i` with seat `n - 1 - i` each turn. Each
/// turn's partnerships are paired off into fixtures in seat order; partnerships left over
/// from turns with an odd number of pairs are matched afterwards wherever they share no
/// player. Every partnership is used at most once and court count is ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobinFixtures;

impl FixtureSource for RoundRobinFixtures {
    fn fixtures(&self, player_count: u32, _court_count: u32) -> Vec<Fixture> {
        if player_count < MIN_PLAYERS {
            return Vec::new();
        }
        let seats: Vec<Option<PlayerId>> = (1..=player_count)
            .map(Some)
            .chain((player_count % 2 == 1).then_some(None))
            .collect();
        let n = seats.len();

        let mut fixtures = Vec::new();
        let mut leftover: Vec<[PlayerId; 2]> = Vec::new();
        for turn in 0..n - 1 {
            let order: Vec<Option<PlayerId>> = std::iter::once(seats[0])
                .chain((0..n - 1).map(|i| seats[1 + (i + turn) % (n - 1)]))
                .collect();
            let pairs: Vec<[PlayerId; 2]> = (0..n / 2)
                .filter_map(|i| match (order[i], order[n - 1 - i]) {
                    (Some(a), Some(b)) => Some([a.min(b), a.max(b)]),
                    _ => None,
                })
                .collect();
            let mut chunks = pairs.chunks_exact(2);
            for c in &mut chunks {
                fixtures.push(Fixture::new(fixtures.len(), c[0], c[1]));
            }
            leftover.extend_from_slice(chunks.remainder());
        }

        let mut used = vec![false; leftover.len()];
        for i in 0..leftover.len() {
            if used[i] {
                continue;
            }
            let [a, b] = leftover[i];
            let opponent = (i + 1..leftover.len())
                .find(|&j| !used[j] && !leftover[j].contains(&a) && !leftover[j].contains(&b));
            if let Some(j) = opponent {
                used[i] = true;
                used[j] = true;
                fixtures.push(Fixture::new(fixtures.len(), leftover[i], leftover[j]));
            }
        }
        fixtures
    }

    fn min_courts(&self, _player_count: u32) -> u32 {
        1
    }

    fn max_courts(&self, player_count: u32) -> u32 {
        (player_count / 4).max(1)
    }
}
