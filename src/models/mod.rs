//! Data structures for the padel tournament: players, fixtures, scores, rounds, documents.

mod fixture;
mod game;
mod player;
mod score;
mod tournament;

pub use fixture::{CourtFixture, Fixture, Timeslot};
pub use game::{GameMatch, MatchId, ParticipantId, Round};
pub use player::{Player, PlayerId, Team, TeamId};
pub use score::{fixture_key, parse_score_input, Score, Side};
pub use tournament::{
    document_path, Format, LiveState, MexicanoMode, Settings, SettingsUpdate, TournamentDoc,
    TournamentError, TournamentId, TournamentMeta, DEFAULT_POINTS_TOTAL,
};
