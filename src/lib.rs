//! Padel tournament organizer: Americano and Mexicano scheduling, standings, and live
//! synchronization of scores between organisers and viewers.

pub mod activity;
pub mod config;
pub mod logic;
pub mod models;
pub mod session;
pub mod sync;

pub use activity::ActivityLog;
pub use config::{ServerConfig, SyncConfig};
pub use logic::{
    compute_standings, generate_round, new_document, schedule, FixtureSource, NewTournament,
    Progress, RoundRobinFixtures, ScheduleCache, StandingEntry, Standings,
};
pub use models::{
    CourtFixture, Fixture, Format, GameMatch, LiveState, MatchId, MexicanoMode, Player, PlayerId,
    Round, Score, Settings, SettingsUpdate, Side, Team, Timeslot, TournamentDoc, TournamentError,
    TournamentId,
};
pub use session::{Role, TournamentSession};
pub use sync::{
    create_tournament, MemoryStore, RemoteStore, SessionHandle, SessionView, StoreError,
    SyncEngine, SyncMode,
};
