//! Americano timeslots: pack the fixed fixture list into rounds of at most `court_count`
//! simultaneous fixtures, no player booked twice in a round.

use crate::logic::fixtures::FixtureSource;
use crate::models::{Fixture, PlayerId, Timeslot};
use std::collections::HashSet;
use std::sync::Arc;

/// Greedy first-fit packing over the original fixture order.
///
/// 1. Open a round with nobody on court.
/// 2. Scan unused fixtures in index order; take each one whose four players are all free,
///    until the round holds `court_count` fixtures.
/// 3. Everyone not on court rests (ascending).
/// 4. Repeat until every fixture is placed.
///
/// With one court the rounds follow the fixture order exactly. The round count is not
/// guaranteed minimal.
pub fn schedule(fixtures: &[Fixture], court_count: u32, player_count: u32) -> Vec<Timeslot> {
    let courts = court_count.max(1) as usize;
    let mut used = vec![false; fixtures.len()];
    let mut remaining = fixtures.len();
    let mut slots = Vec::new();

    while remaining > 0 {
        let mut on_court: HashSet<PlayerId> = HashSet::new();
        let mut slot_fixtures = Vec::with_capacity(courts);

        for (i, fixture) in fixtures.iter().enumerate() {
            if slot_fixtures.len() == courts {
                break;
            }
            if used[i] {
                continue;
            }
            let players = fixture.players();
            if players.iter().any(|p| on_court.contains(p)) {
                continue;
            }
            on_court.extend(players);
            used[i] = true;
            remaining -= 1;
            slot_fixtures.push(fixture.clone());
        }

        let resting = (1..=player_count).filter(|p| !on_court.contains(p)).collect();
        slots.push(Timeslot {
            round: slots.len() + 1,
            fixtures: slot_fixtures,
            resting,
        });
    }

    slots
}

/// Memoized [`schedule`] keyed by `(court_count, player_count)`.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    entry: Option<CacheEntry>,
}

#[derive(Debug)]
struct CacheEntry {
    court_count: u32,
    player_count: u32,
    fixtures: Arc<Vec<Fixture>>,
    slots: Arc<Vec<Timeslot>>,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn refresh(
        &mut self,
        source: &dyn FixtureSource,
        court_count: u32,
        player_count: u32,
    ) -> &CacheEntry {
        let stale = !matches!(
            &self.entry,
            Some(e) if e.court_count == court_count && e.player_count == player_count
        );
        if stale {
            self.entry = None;
        }
        self.entry.get_or_insert_with(|| {
            log::debug!("Scheduling {player_count} players on {court_count} court(s)");
            let fixtures = source.fixtures(player_count, court_count);
            let slots = schedule(&fixtures, court_count, player_count);
            CacheEntry {
                court_count,
                player_count,
                fixtures: Arc::new(fixtures),
                slots: Arc::new(slots),
            }
        })
    }

    /// Timeslots for the given settings, recomputed only when either count changed.
    pub fn timeslots(
        &mut self,
        source: &dyn FixtureSource,
        court_count: u32,
        player_count: u32,
    ) -> Arc<Vec<Timeslot>> {
        Arc::clone(&self.refresh(source, court_count, player_count).slots)
    }

    /// The fixture list backing the cached timeslots.
    pub fn fixtures(
        &mut self,
        source: &dyn FixtureSource,
        court_count: u32,
        player_count: u32,
    ) -> Arc<Vec<Fixture>> {
        Arc::clone(&self.refresh(source, court_count, player_count).fixtures)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
