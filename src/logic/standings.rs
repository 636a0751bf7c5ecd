//! Standings: fold completed scores into a ranked per-player (or per-team) table.

use crate::models::{
    fixture_key, Fixture, Format, LiveState, MexicanoMode, ParticipantId, Player, Score,
};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Range;

/// One row of the standings table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StandingEntry {
    /// Player id, or team id in Mexicano team mode.
    pub id: ParticipantId,
    pub name: String,
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points_for: i64,
    pub points_against: i64,
    pub point_diff: i64,
    pub total_points: i64,
    pub avg_points: f64,
    pub avg_diff: f64,
}

impl StandingEntry {
    fn new(id: ParticipantId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Self::default()
        }
    }

    fn record(&mut self, own: u32, opponent: u32) {
        self.games_played += 1;
        self.points_for += i64::from(own);
        self.points_against += i64::from(opponent);
        match own.cmp(&opponent) {
            Ordering::Greater => self.wins += 1,
            Ordering::Less => self.losses += 1,
            Ordering::Equal => self.draws += 1,
        }
    }

    fn finish(&mut self) {
        self.point_diff = self.points_for - self.points_against;
        if self.games_played > 0 {
            let games = f64::from(self.games_played);
            self.avg_points = self.total_points as f64 / games;
            self.avg_diff = self.point_diff as f64 / games;
        }
    }
}

/// Ranked table plus whether every entry has played the same number of games
/// (when it has, averages add nothing and need not be shown).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Standings {
    pub entries: Vec<StandingEntry>,
    pub uniform_games: bool,
}

impl Standings {
    fn from_entries(mut entries: Vec<StandingEntry>, rank: fn(&mut [StandingEntry])) -> Self {
        entries.iter_mut().for_each(StandingEntry::finish);
        rank(&mut entries);
        let uniform_games = entries
            .windows(2)
            .all(|w| w[0].games_played == w[1].games_played);
        Self {
            entries,
            uniform_games,
        }
    }
}

/// Averages closer than this count as level.
const AVERAGE_TOLERANCE: f64 = 0.01;

/// Runs of neighbouring entries whose `key` lies within [`AVERAGE_TOLERANCE`] of the entry
/// before. `entries` must already be sorted by `key`, descending.
fn level_runs(entries: &[StandingEntry], key: fn(&StandingEntry) -> f64) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=entries.len() {
        if i == entries.len() || key(&entries[i - 1]) - key(&entries[i]) >= AVERAGE_TOLERANCE {
            runs.push(start..i);
            start = i;
        }
    }
    runs
}

/// Rank finished entries in Americano order, descending: average points per game, then
/// average point difference per game (among players level on the first), then total points.
/// Player id ascending keeps the order total.
pub fn rank_americano(entries: &mut [StandingEntry]) {
    entries.sort_by(|a, b| b.avg_points.total_cmp(&a.avg_points));
    for run in level_runs(entries, |e| e.avg_points) {
        let level = &mut entries[run];
        level.sort_by(|a, b| b.avg_diff.total_cmp(&a.avg_diff));
        for run in level_runs(level, |e| e.avg_diff) {
            level[run].sort_by(|a, b| {
                b.total_points
                    .cmp(&a.total_points)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }
}

/// Mexicano order: total points descending, id ascending.
fn rank_mexicano(entries: &mut [StandingEntry]) {
    entries.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Americano standings from the roster, the fixture list and the score map.
pub fn americano_standings(
    players: &[Player],
    fixtures: &[Fixture],
    scores: &BTreeMap<String, Score>,
) -> Standings {
    let mut table: BTreeMap<ParticipantId, StandingEntry> = players
        .iter()
        .map(|p| (p.id, StandingEntry::new(p.id, p.name.clone())))
        .collect();

    for fixture in fixtures {
        let Some((s1, s2)) = scores
            .get(&fixture_key(fixture.index))
            .and_then(Score::completed)
        else {
            continue;
        };
        let [team_1, team_2] = fixture.teams;
        for (team, own, opp) in [(team_1, s1, s2), (team_2, s2, s1)] {
            for pid in team {
                if let Some(entry) = table.get_mut(&pid) {
                    entry.record(own, opp);
                }
            }
        }
    }

    let entries = table
        .into_values()
        .map(|mut e| {
            e.total_points = e.points_for;
            e
        })
        .collect();
    Standings::from_entries(entries, rank_americano)
}

/// Mexicano standings: game stats from completed matches, totals from the cumulative
/// points kept on each player or team.
pub fn mexicano_standings(live: &LiveState) -> Standings {
    let mut table: BTreeMap<ParticipantId, StandingEntry> = match live.settings.mexicano_mode {
        MexicanoMode::Individual => live
            .players
            .iter()
            .map(|p| {
                let mut e = StandingEntry::new(p.id, p.name.clone());
                e.total_points = p.points;
                (p.id, e)
            })
            .collect(),
        MexicanoMode::Team => live
            .teams
            .iter()
            .map(|t| {
                let mut e = StandingEntry::new(t.id, t.name());
                e.total_points = t.points;
                (t.id, e)
            })
            .collect(),
    };

    for m in live.rounds.iter().flat_map(|r| r.matches.iter()) {
        let Some((s1, s2)) = m.score.completed().filter(|_| m.completed) else {
            continue;
        };
        for (side, own, opp) in [(&m.team_1, s1, s2), (&m.team_2, s2, s1)] {
            for pid in side {
                if let Some(entry) = table.get_mut(pid) {
                    entry.record(own, opp);
                }
            }
        }
    }

    Standings::from_entries(table.into_values().collect(), rank_mexicano)
}

/// Standings for whichever format the live state holds.
pub fn compute_standings(live: &LiveState, fixtures: &[Fixture], format: Format) -> Standings {
    match format {
        Format::Americano => americano_standings(&live.players, fixtures, &live.scores),
        Format::Mexicano => mexicano_standings(live),
    }
}
