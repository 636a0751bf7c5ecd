//! Integration tests for Americano: fixtures, timeslot packing, score entry and standings.

use padel_tournament_web::logic::{
    americano_standings, apply_settings, clear_fixture_score, rank_americano, set_fixture_score,
    FixtureSource, NewTournament, Progress, RoundRobinFixtures, ScheduleCache, StandingEntry,
};
use padel_tournament_web::models::{
    fixture_key, parse_score_input, Fixture, Format, LiveState, MexicanoMode, Player, PlayerId,
    Score, Settings, SettingsUpdate, Side, TournamentError,
};
use padel_tournament_web::{new_document, schedule, Role, TournamentSession};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Fixed fixture table, for scenarios that need an exact list.
struct TableFixtures(Vec<Fixture>);

impl FixtureSource for TableFixtures {
    fn fixtures(&self, _player_count: u32, _court_count: u32) -> Vec<Fixture> {
        self.0.clone()
    }

    fn min_courts(&self, _player_count: u32) -> u32 {
        1
    }

    fn max_courts(&self, _player_count: u32) -> u32 {
        3
    }
}

fn americano(players: usize, courts: u32) -> NewTournament {
    NewTournament {
        name: "Friday Americano".to_string(),
        format: Format::Americano,
        organiser_credential: "secret".to_string(),
        players: (1..=players).map(|i| format!("P{i}")).collect(),
        teams: Vec::new(),
        court_count: courts,
        fixed_points: false,
        points_total: 24,
        mexicano_mode: MexicanoMode::Individual,
    }
}

fn session(players: usize, courts: u32, role: Role) -> TournamentSession {
    let doc = new_document(
        americano(players, courts),
        &RoundRobinFixtures,
        &mut StdRng::seed_from_u64(1),
    )
    .unwrap();
    TournamentSession::new(Uuid::new_v4(), doc, role, Arc::new(RoundRobinFixtures))
}

fn live(players: usize, courts: u32) -> LiveState {
    LiveState {
        settings: Settings::new(courts),
        players: Player::roster((1..=players).map(|i| format!("P{i}"))),
        ..LiveState::default()
    }
}

#[test]
fn schedule_places_every_fixture_once_without_double_booking() {
    for players in 4..=12u32 {
        let fixtures = RoundRobinFixtures.fixtures(players, 1);
        for courts in 1..=RoundRobinFixtures.max_courts(players) {
            let slots = schedule(&fixtures, courts, players);

            let mut placed: Vec<usize> = slots
                .iter()
                .flat_map(|s| s.fixtures.iter().map(|f| f.index))
                .collect();
            placed.sort_unstable();
            assert_eq!(placed, (0..fixtures.len()).collect::<Vec<_>>());

            for (i, slot) in slots.iter().enumerate() {
                assert_eq!(slot.round, i + 1);
                assert!(!slot.fixtures.is_empty());
                assert!(slot.fixtures.len() <= courts as usize);

                let playing = slot.playing();
                let on_court: HashSet<PlayerId> = playing.iter().copied().collect();
                assert_eq!(on_court.len(), playing.len(), "player booked twice");
                assert!(slot
                    .resting
                    .iter()
                    .all(|p| slot.fixtures.iter().all(|f| !f.involves(*p))));
                assert!(slot.resting.windows(2).all(|w| w[0] < w[1]));

                let everyone: BTreeSet<PlayerId> =
                    on_court.iter().chain(slot.resting.iter()).copied().collect();
                assert_eq!(everyone, (1..=players).collect::<BTreeSet<_>>());
            }
        }
    }
}

#[test]
fn schedule_is_deterministic() {
    let fixtures = RoundRobinFixtures.fixtures(9, 2);
    assert_eq!(schedule(&fixtures, 2, 9), schedule(&fixtures, 2, 9));
    assert_eq!(RoundRobinFixtures.fixtures(9, 2), RoundRobinFixtures.fixtures(9, 2));
}

#[test]
fn six_players_on_one_court_play_one_fixture_per_round() {
    let table = vec![
        Fixture::new(0, [1, 2], [3, 4]),
        Fixture::new(1, [5, 6], [1, 3]),
        Fixture::new(2, [2, 4], [5, 1]),
        Fixture::new(3, [3, 6], [2, 5]),
        Fixture::new(4, [4, 6], [1, 5]),
    ];
    let source = TableFixtures(table.clone());
    let mut cache = ScheduleCache::new();
    let slots = cache.timeslots(&source, 1, 6);

    assert_eq!(slots.len(), 5);
    for (slot, fixture) in slots.iter().zip(&table) {
        assert_eq!(slot.fixtures, vec![fixture.clone()]);
        assert_eq!(slot.resting.len(), 2);
    }
    assert_eq!(slots[0].resting, vec![5, 6]);
    assert_eq!(slots[1].resting, vec![2, 4]);
}

#[test]
fn greedy_packing_fills_courts_in_fixture_order() {
    let table = vec![
        Fixture::new(0, [1, 2], [3, 4]),
        Fixture::new(1, [1, 5], [2, 6]),
        Fixture::new(2, [5, 6], [7, 8]),
        Fixture::new(3, [3, 7], [4, 8]),
    ];
    let slots = schedule(&table, 2, 8);
    let rounds: Vec<Vec<usize>> = slots
        .iter()
        .map(|s| s.fixtures.iter().map(|f| f.index).collect())
        .collect();
    assert_eq!(rounds, vec![vec![0, 2], vec![1, 3]]);
}

#[test]
fn cache_recomputes_only_when_counts_change() {
    let mut cache = ScheduleCache::new();
    let first = cache.timeslots(&RoundRobinFixtures, 1, 8);
    let again = cache.timeslots(&RoundRobinFixtures, 1, 8);
    assert!(Arc::ptr_eq(&first, &again));

    let two_courts = cache.timeslots(&RoundRobinFixtures, 2, 8);
    assert!(!Arc::ptr_eq(&first, &two_courts));
    assert!(two_courts.len() < first.len());

    cache.invalidate();
    let rebuilt = cache.timeslots(&RoundRobinFixtures, 2, 8);
    assert_eq!(rebuilt, two_courts);
}

#[test]
fn round_robin_uses_each_partnership_at_most_once() {
    for players in 4..=12u32 {
        let fixtures = RoundRobinFixtures.fixtures(players, 1);
        let mut partnerships = HashSet::new();
        for (i, f) in fixtures.iter().enumerate() {
            assert_eq!(f.index, i);
            let distinct: HashSet<PlayerId> = f.players().into_iter().collect();
            assert_eq!(distinct.len(), 4);
            for [a, b] in f.teams {
                assert!(partnerships.insert((a.min(b), a.max(b))), "{a}/{b} partnered twice");
            }
        }
    }
}

#[test]
fn court_change_keeps_scores_attached_to_fixtures() {
    let mut s = session(8, 1, Role::Organiser);
    let before = s.fixtures();
    assert!(s.set_score(3, Side::Team1, Some(15)));
    assert!(s.set_score(3, Side::Team2, Some(9)));
    let standings_before = s.standings();

    let update = SettingsUpdate {
        court_count: Some(2),
        ..SettingsUpdate::default()
    };
    assert!(s.update_settings(update).unwrap());

    assert_eq!(s.fixtures(), before);
    assert_eq!(s.score(3), Some(Score::new(15, 9)));
    assert_eq!(s.standings(), standings_before);
    assert!(s.pending_keys().any(|k| k == "settings/courtCount"));
}

#[test]
fn timeslots_are_labelled_with_court_names() {
    let mut s = session(8, 2, Role::Organiser);
    let update = SettingsUpdate {
        court_names: Some(vec!["Centre".to_string(), "  ".to_string()]),
        ..SettingsUpdate::default()
    };
    assert!(s.update_settings(update).unwrap());

    let slots = s.timeslots();
    let courts: Vec<String> = slots[0]
        .on_courts(&s.live().settings)
        .into_iter()
        .map(|c| c.court)
        .collect();
    assert_eq!(courts, vec!["Centre", "Court 2"]);
    assert_eq!(s.live().settings.court_name(3), "Court 3");
}

#[test]
fn court_count_outside_source_bounds_is_rejected() {
    let mut l = live(5, 1);
    let update = SettingsUpdate {
        court_count: Some(2),
        ..SettingsUpdate::default()
    };
    let err = apply_settings(&mut l, update, Format::Americano, &RoundRobinFixtures).unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidCourtCount { courts: 2, min: 1, max: 1 }
    ));
    assert_eq!(l.settings.court_count, 1);
}

#[test]
fn fixed_points_derives_the_other_side() {
    let mut l = live(4, 1);
    l.settings.fixed_points = true;
    l.settings.points_total = 16;

    assert_eq!(
        set_fixture_score(&mut l, 0, Side::Team1, Some(7)),
        Some(Score::new(7, 9))
    );
    assert_eq!(
        set_fixture_score(&mut l, 0, Side::Team2, Some(10)),
        Some(Score::new(6, 10))
    );

    // Over the total counts as not entered, and takes the derived side with it.
    assert_eq!(set_fixture_score(&mut l, 0, Side::Team1, Some(17)), None);
    assert!(!l.scores.contains_key("f_0"));

    set_fixture_score(&mut l, 0, Side::Team1, Some(8));
    assert!(clear_fixture_score(&mut l, 0));
    assert!(!clear_fixture_score(&mut l, 0));
    assert!(l.scores.is_empty());
}

#[test]
fn free_scoring_allows_partial_scores() {
    let mut l = live(4, 1);
    let partial = set_fixture_score(&mut l, 1, Side::Team2, Some(30)).unwrap();
    assert_eq!(partial.team1, None);
    assert_eq!(partial.team2, Some(30));
    assert!(!partial.is_complete());

    let fixtures = RoundRobinFixtures.fixtures(4, 1);
    let standings = americano_standings(&l.players, &fixtures, &l.scores);
    assert!(standings.entries.iter().all(|e| e.games_played == 0));
}

#[test]
fn malformed_input_is_treated_as_unset() {
    assert_eq!(parse_score_input("abc"), None);
    assert_eq!(parse_score_input("-3"), None);
    assert_eq!(parse_score_input("3.5"), None);
    assert_eq!(parse_score_input(""), None);
    assert_eq!(parse_score_input(" 12 "), Some(12));

    let mut s = session(4, 1, Role::Organiser);
    assert!(s.set_score_input(0, Side::Team1, "11"));
    assert!(s.set_score_input(0, Side::Team2, "eleven"));
    assert_eq!(s.score(0).unwrap().completed(), None);
    assert!(s.set_score_input(0, Side::Team1, "x"));
    assert_eq!(s.score(0), None);
}

#[test]
fn typed_input_above_the_fixed_total_is_unset() {
    let mut s = session(4, 1, Role::Organiser);
    let update = SettingsUpdate {
        fixed_points: Some(true),
        points_total: Some(24),
        ..SettingsUpdate::default()
    };
    assert!(s.update_settings(update).unwrap());

    assert!(s.set_score_input(0, Side::Team1, "24"));
    assert_eq!(s.score(0), Some(Score::new(24, 0)));
    assert!(s.set_score_input(0, Side::Team1, "25"));
    assert_eq!(s.score(0), None);
}

#[test]
fn standings_rank_by_average_then_difference_then_id() {
    let players = Player::roster(["Ana", "Ben", "Cleo", "Dan"]);
    let fixtures = vec![
        Fixture::new(0, [1, 2], [3, 4]),
        Fixture::new(1, [1, 3], [2, 4]),
        Fixture::new(2, [1, 4], [2, 3]),
    ];
    let mut scores = BTreeMap::new();
    scores.insert(fixture_key(0), Score::new(10, 6));
    scores.insert(fixture_key(1), Score::new(8, 8));
    scores.insert(fixture_key(2), Score::new(12, 4));

    let standings = americano_standings(&players, &fixtures, &scores);
    let order: Vec<PlayerId> = standings.entries.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![1, 4, 2, 3]);
    assert!(standings.uniform_games);

    let ana = &standings.entries[0];
    assert_eq!((ana.wins, ana.draws, ana.losses), (2, 1, 0));
    assert_eq!((ana.points_for, ana.points_against), (30, 18));
    assert_eq!(ana.point_diff, 12);
    assert_eq!(ana.total_points, 30);
    assert_eq!(ana.avg_points, 10.0);

    let total_for: i64 = standings.entries.iter().map(|e| e.points_for).sum();
    let total_against: i64 = standings.entries.iter().map(|e| e.points_against).sum();
    assert_eq!(total_for, total_against);
    let wins: u32 = standings.entries.iter().map(|e| e.wins).sum();
    let losses: u32 = standings.entries.iter().map(|e| e.losses).sum();
    assert_eq!(wins, losses);
}

#[test]
fn level_standings_fall_back_to_player_id() {
    let players = Player::roster(["Ana", "Ben", "Cleo", "Dan"]);
    let fixtures = vec![Fixture::new(0, [4, 2], [3, 1])];
    let mut scores = BTreeMap::new();
    scores.insert(fixture_key(0), Score::new(8, 8));

    let standings = americano_standings(&players, &fixtures, &scores);
    let order: Vec<PlayerId> = standings.entries.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![1, 2, 3, 4]);
}

#[test]
fn averages_compare_players_with_different_game_counts() {
    let players = Player::roster(["Ana", "Ben", "Cleo", "Dan", "Eve"]);
    let fixtures = vec![
        Fixture::new(0, [1, 2], [3, 4]),
        Fixture::new(1, [1, 5], [2, 3]),
    ];
    let mut scores = BTreeMap::new();
    scores.insert(fixture_key(0), Score::new(9, 7));
    scores.insert(fixture_key(1), Score::new(6, 10));

    let standings = americano_standings(&players, &fixtures, &scores);
    assert!(!standings.uniform_games);
    // Ben and Cleo: 19 and 17 over two games; Dan 7 over one; Eve 6 over one; Ana 15 over two.
    let order: Vec<PlayerId> = standings.entries.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![2, 3, 1, 4, 5]);
}

fn finished(id: PlayerId, games: u32, total: i64, diff: i64) -> StandingEntry {
    StandingEntry {
        id,
        games_played: games,
        total_points: total,
        point_diff: diff,
        avg_points: total as f64 / f64::from(games),
        avg_diff: diff as f64 / f64::from(games),
        ..StandingEntry::default()
    }
}

#[test]
fn averages_within_tolerance_fall_through_to_difference() {
    // 11.10 against 11.09 points per game: level, so the better difference goes first.
    let mut entries = vec![
        finished(1, 10, 111, -5),
        finished(2, 11, 122, 20),
        finished(3, 10, 120, -40),
        finished(4, 10, 90, 30),
    ];
    rank_americano(&mut entries);
    let order: Vec<PlayerId> = entries.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![3, 2, 1, 4]);
}

#[test]
fn level_averages_and_differences_fall_through_to_total_then_id() {
    let mut entries = vec![
        finished(4, 2, 20, 4),
        finished(3, 4, 40, 8),
        finished(1, 2, 20, 4),
    ];
    rank_americano(&mut entries);
    let order: Vec<PlayerId> = entries.iter().map(|e| e.id).collect();
    assert_eq!(order, vec![3, 1, 4]);
}

#[test]
fn viewer_edits_are_ignored_until_unlocked() {
    let mut s = session(4, 1, Role::Viewer);
    assert!(!s.set_score(0, Side::Team1, Some(5)));
    assert!(!s.clear_score(0));
    assert!(!s.reset_scores());
    assert!(!s.has_pending());
    assert_eq!(s.revision(), 0);

    assert!(!s.unlock("wrong"));
    assert_eq!(s.role(), Role::Viewer);
    assert!(s.unlock("secret"));
    assert_eq!(s.role(), Role::Organiser);

    assert!(s.set_score(0, Side::Team1, Some(5)));
    let keys: Vec<&String> = s.pending_keys().collect();
    assert_eq!(keys, vec!["scores/f_0"]);
}

#[test]
fn unknown_fixture_and_wrong_format_edits_are_ignored() {
    let mut s = session(4, 1, Role::Organiser);
    assert!(!s.set_score(99, Side::Team1, Some(5)));
    assert!(!s.set_match_score(Uuid::new_v4(), Side::Team1, Some(3)).unwrap());
    assert_eq!(s.complete_round().unwrap(), None);
    assert!(!s.has_pending());
}

#[test]
fn pending_edits_become_one_batch_against_the_document_root() {
    let mut s = session(4, 1, Role::Organiser);
    s.set_score(0, Side::Team1, Some(5));
    s.set_score(0, Side::Team2, Some(7));
    s.set_score(2, Side::Team1, Some(1));

    let batch = s.take_pending().unwrap().unwrap();
    assert_eq!(batch.keys, vec!["scores/f_0", "scores/f_2"]);
    assert_eq!(
        batch.patch.get("live/scores/f_0"),
        Some(&serde_json::json!({"team1": 5, "team2": 7}))
    );
    assert!(batch.patch.contains_key("meta/updatedAt"));
    assert!(!s.has_pending());
    assert_eq!(s.take_pending().unwrap(), None);

    s.restore_pending(batch.keys);
    assert!(s.has_pending());
}

#[test]
fn remote_key_with_an_overflowing_round_is_kept_verbatim() {
    let mut s = session(4, 1, Role::Organiser);
    let mut remote = serde_json::to_value(s.live()).unwrap();
    remote["scores"]["18446744073709551615_0"] = serde_json::to_value(Score::new(1, 2)).unwrap();

    assert!(s.apply_remote(remote).unwrap());
    assert!(s.live().scores.contains_key("18446744073709551615_0"));
    assert_eq!(s.take_pending().unwrap(), None);
}

#[test]
fn reset_clears_scores_and_progress() {
    let mut s = session(4, 1, Role::Organiser);
    s.set_score(0, Side::Team1, Some(5));
    s.set_score(0, Side::Team2, Some(7));
    s.set_score(1, Side::Team1, Some(2));

    let progress = s.progress();
    assert_eq!(
        progress,
        Progress {
            total_matches: 3,
            completed_matches: 1,
            rounds: 3,
        }
    );

    s.take_pending().unwrap();
    assert!(s.reset_scores());
    assert!(s.live().scores.is_empty());
    assert_eq!(s.progress().completed_matches, 0);
    let keys: Vec<&String> = s.pending_keys().collect();
    assert_eq!(keys, vec!["scores/f_0", "scores/f_1"]);
}

#[test]
fn rename_player_touches_roster() {
    let mut s = session(4, 1, Role::Organiser);
    assert!(s.rename_player(2, "  Bea ").unwrap());
    assert_eq!(s.live().player_name(2), Some("Bea"));
    assert!(!s.rename_player(2, "   ").unwrap());
    assert!(matches!(
        s.rename_player(9, "Zed"),
        Err(TournamentError::PlayerNotFound(9))
    ));
    assert!(s.pending_keys().any(|k| k == "players"));
}

#[test]
fn new_tournament_needs_four_players() {
    let err = new_document(americano(3, 1), &RoundRobinFixtures, &mut StdRng::seed_from_u64(1))
        .unwrap_err();
    assert!(matches!(
        err,
        TournamentError::NotEnoughPlayers { required: 4, actual: 3 }
    ));

    let s = session(4, 1, Role::Viewer);
    assert_eq!(s.meta().name, "Friday Americano");
    assert_eq!(s.meta().format, Format::Americano);
}
