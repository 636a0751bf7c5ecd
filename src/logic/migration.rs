//! One-way rewrite of legacy `{round}_{match}` score keys to canonical `f_{fixtureIndex}` keys.
//!
//! Old documents keyed scores by their position in the timeslot grid, which shifts whenever
//! the court count changes. Fixture indices do not.

use crate::models::{fixture_key, Score};
use std::collections::BTreeMap;

/// Canonical key for a legacy `{round}_{match}` key written under `old_court_count` courts.
/// Returns `None` for keys that are already canonical, not recognisable, or whose index
/// would overflow.
pub fn migrate_key(key: &str, old_court_count: u32) -> Option<String> {
    let (round, slot) = key.split_once('_')?;
    let round: usize = round.parse().ok()?;
    let slot: usize = slot.parse().ok()?;
    let index = round
        .checked_mul(usize::try_from(old_court_count).ok()?)?
        .checked_add(slot)?;
    Some(fixture_key(index))
}

/// A legacy key that was moved.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MigratedKey {
    pub legacy: String,
    pub canonical: String,
    /// The score now stored under `canonical`.
    pub score: Score,
}

/// Rewrite every legacy key in `scores`. A score already stored under the canonical key
/// wins over the legacy one. Running it again finds nothing to do.
pub fn migrate_scores(scores: &mut BTreeMap<String, Score>, old_court_count: u32) -> Vec<MigratedKey> {
    let legacy: Vec<(String, String)> = scores
        .keys()
        .filter_map(|k| migrate_key(k, old_court_count).map(|c| (k.clone(), c)))
        .collect();

    let mut moved = Vec::with_capacity(legacy.len());
    for (legacy, canonical) in legacy {
        let Some(score) = scores.remove(&legacy) else {
            continue;
        };
        let score = *scores.entry(canonical.clone()).or_insert(score);
        moved.push(MigratedKey {
            legacy,
            canonical,
            score,
        });
    }
    if !moved.is_empty() {
        log::info!("Migrated {} legacy score key(s)", moved.len());
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_key_maps_through_old_court_count() {
        assert_eq!(migrate_key("1_0", 2).as_deref(), Some("f_2"));
        assert_eq!(migrate_key("3_1", 2).as_deref(), Some("f_7"));
        assert_eq!(migrate_key("0_0", 3).as_deref(), Some("f_0"));
    }

    #[test]
    fn canonical_and_garbage_keys_are_left_alone() {
        assert_eq!(migrate_key("f_2", 2), None);
        assert_eq!(migrate_key("x_y", 2), None);
        assert_eq!(migrate_key("12", 2), None);
    }

    #[test]
    fn overflowing_legacy_key_is_left_alone() {
        assert_eq!(migrate_key("18446744073709551615_0", 2), None);
        assert_eq!(migrate_key("1_18446744073709551615", 2), None);

        let mut scores = BTreeMap::new();
        scores.insert("18446744073709551615_0".to_string(), Score::new(1, 2));
        assert!(migrate_scores(&mut scores, 2).is_empty());
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn migration_is_idempotent_and_canonical_wins() {
        let mut scores = BTreeMap::new();
        scores.insert("1_0".to_string(), Score::new(10, 6));
        scores.insert("0_1".to_string(), Score::new(3, 9));
        scores.insert("f_1".to_string(), Score::new(5, 5));

        let moved = migrate_scores(&mut scores, 2);
        assert_eq!(moved.len(), 2);
        assert_eq!(scores.get("f_2"), Some(&Score::new(10, 6)));
        assert_eq!(scores.get("f_1"), Some(&Score::new(5, 5)));
        assert_eq!(scores.len(), 2);

        assert!(migrate_scores(&mut scores, 1).is_empty());
        assert_eq!(scores.get("f_2"), Some(&Score::new(10, 6)));
    }
}
