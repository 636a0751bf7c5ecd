//! Americano score recording and progress counts.

use crate::models::{fixture_key, Fixture, LiveState, Score, Settings, Side, Timeslot};
use serde::Serialize;

/// Write one side of a score. Values above the fixed-points total are coerced to unset;
/// in fixed-points mode the other side is derived as `total - value` (or unset with it).
pub fn apply_side(score: &mut Score, side: Side, value: Option<u32>, settings: &Settings) {
    let value = match (value, settings.score_cap()) {
        (Some(v), Some(cap)) if v > cap => None,
        (v, _) => v,
    };
    score.set(side, value);
    if settings.fixed_points {
        score.set(side.other(), value.map(|v| settings.points_total - v));
    }
}

/// Set one side of fixture `index`. Returns the stored score, or `None` when the edit left
/// both sides unset (the entry is then removed).
pub fn set_fixture_score(
    live: &mut LiveState,
    index: usize,
    side: Side,
    value: Option<u32>,
) -> Option<Score> {
    let key = fixture_key(index);
    let mut score = live.scores.get(&key).copied().unwrap_or_default();
    apply_side(&mut score, side, value, &live.settings);
    if score.is_empty() {
        live.scores.remove(&key);
        None
    } else {
        live.scores.insert(key, score);
        Some(score)
    }
}

/// Reset both sides of fixture `index` to unset. Returns whether anything was stored.
pub fn clear_fixture_score(live: &mut LiveState, index: usize) -> bool {
    live.scores.remove(&fixture_key(index)).is_some()
}

/// Drop every Americano score. Returns the removed keys.
pub fn reset_fixture_scores(live: &mut LiveState) -> Vec<String> {
    std::mem::take(&mut live.scores).into_keys().collect()
}

/// Match and round counts for progress display.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Progress {
    pub total_matches: usize,
    pub completed_matches: usize,
    pub rounds: usize,
}

impl Progress {
    pub fn americano(fixtures: &[Fixture], slots: &[Timeslot], live: &LiveState) -> Self {
        let completed_matches = fixtures
            .iter()
            .filter(|f| {
                live.scores
                    .get(&fixture_key(f.index))
                    .is_some_and(Score::is_complete)
            })
            .count();
        Self {
            total_matches: fixtures.len(),
            completed_matches,
            rounds: slots.len(),
        }
    }

    pub fn mexicano(live: &LiveState) -> Self {
        let matches = live.rounds.iter().flat_map(|r| r.matches.iter());
        let (total_matches, completed_matches) =
            matches.fold((0, 0), |(t, c), m| (t + 1, c + usize::from(m.completed)));
        Self {
            total_matches,
            completed_matches,
            rounds: live.rounds.len(),
        }
    }
}
