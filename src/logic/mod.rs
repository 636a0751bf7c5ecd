//! Tournament business logic: fixtures, scheduling, scores, standings, Mexicano rounds.

pub mod fixtures;
pub mod mexicano;
pub mod migration;
pub mod schedule;
pub mod scores;
pub mod setup;
pub mod standings;

pub use fixtures::{FixtureSource, RoundRobinFixtures, TournamentInfo};
pub use mexicano::{
    clear_match_score, complete_round, generate_round, restart_rounds, revert_points,
    seeding_order, set_match_score, update_points,
};
pub use migration::{migrate_key, migrate_scores, MigratedKey};
pub use schedule::{schedule, ScheduleCache};
pub use scores::{clear_fixture_score, reset_fixture_scores, set_fixture_score, Progress};
pub use setup::{apply_settings, new_document, rename_player, NewTournament};
pub use standings::{
    americano_standings, compute_standings, mexicano_standings, rank_americano, StandingEntry,
    Standings,
};
