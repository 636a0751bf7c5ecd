//! Mexicano: re-pair every round from the standings, and keep cumulative points in step
//! with completed (and re-edited) match scores.

use crate::logic::scores::apply_side;
use crate::models::{
    GameMatch, LiveState, MatchId, MexicanoMode, ParticipantId, Round, Side, TournamentError,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// Participant ids ranked for seeding: points descending, games played ascending, id ascending.
pub fn seeding_order(live: &LiveState) -> Vec<ParticipantId> {
    let mut rows: Vec<(ParticipantId, i64, u32)> = match live.settings.mexicano_mode {
        MexicanoMode::Individual => live
            .players
            .iter()
            .map(|p| (p.id, p.points, p.games_played))
            .collect(),
        MexicanoMode::Team => live
            .teams
            .iter()
            .map(|t| (t.id, t.points, t.matches_played))
            .collect(),
    };
    rows.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)).then(a.0.cmp(&b.0)));
    rows.into_iter().map(|(id, _, _)| id).collect()
}

/// Generate round `round_number`.
///
/// Round 1 draws the order by lottery; later rounds seed from the standings. Individual mode
/// splits each group of four ranks `[r, r+1, r+2, r+3]` into `{r, r+2}` vs `{r+1, r+3}`;
/// team mode pairs consecutive ranks. Whoever does not fill a group sits out.
pub fn generate_round<R: Rng + ?Sized>(round_number: u32, live: &LiveState, rng: &mut R) -> Round {
    let mut order = seeding_order(live);
    if round_number <= 1 {
        order.shuffle(rng);
    }

    let group = match live.settings.mexicano_mode {
        MexicanoMode::Individual => 4,
        MexicanoMode::Team => 2,
    };
    let chunks = order.chunks_exact(group);
    let sitting_out = chunks.remainder().to_vec();
    let matches = chunks
        .enumerate()
        .map(|(i, g)| match live.settings.mexicano_mode {
            MexicanoMode::Individual => GameMatch::new(i + 1, vec![g[0], g[2]], vec![g[1], g[3]]),
            MexicanoMode::Team => GameMatch::new(i + 1, vec![g[0]], vec![g[1]]),
        })
        .collect();

    Round {
        round_number,
        matches,
        sitting_out,
        completed: false,
    }
}

fn adjust(live: &mut LiveState, ids: &[ParticipantId], points: i64, games: i32) {
    match live.settings.mexicano_mode {
        MexicanoMode::Individual => {
            for p in live.players.iter_mut().filter(|p| ids.contains(&p.id)) {
                p.points += points;
                p.games_played = p.games_played.saturating_add_signed(games);
            }
        }
        MexicanoMode::Team => {
            for t in live.teams.iter_mut().filter(|t| ids.contains(&t.id)) {
                t.points += points;
                t.matches_played = t.matches_played.saturating_add_signed(games);
            }
        }
    }
}

/// Add a completed score into cumulative totals and count the game.
pub fn update_points(
    live: &mut LiveState,
    team_1: &[ParticipantId],
    team_2: &[ParticipantId],
    (s1, s2): (u32, u32),
) {
    adjust(live, team_1, i64::from(s1), 1);
    adjust(live, team_2, i64::from(s2), 1);
}

/// Exact inverse of [`update_points`].
pub fn revert_points(
    live: &mut LiveState,
    team_1: &[ParticipantId],
    team_2: &[ParticipantId],
    (s1, s2): (u32, u32),
) {
    adjust(live, team_1, -i64::from(s1), -1);
    adjust(live, team_2, -i64::from(s2), -1);
}

fn locate(live: &LiveState, match_id: MatchId) -> Result<(usize, usize), TournamentError> {
    live.rounds
        .iter()
        .enumerate()
        .find_map(|(ri, r)| {
            r.matches
                .iter()
                .position(|m| m.id == match_id)
                .map(|mi| (ri, mi))
        })
        .ok_or(TournamentError::MatchNotFound(match_id))
}

/// Replace a match's score and keep totals consistent in one step: a previously completed
/// score is reverted before the new one (if complete) is applied, so nothing is counted twice.
fn rescore(
    live: &mut LiveState,
    match_id: MatchId,
    edit: impl FnOnce(&mut GameMatch),
) -> Result<(), TournamentError> {
    let (ri, mi) = locate(live, match_id)?;
    let m = &mut live.rounds[ri].matches[mi];
    let previous = if m.completed { m.score.completed() } else { None };
    edit(m);
    let next = m.score.completed();
    m.completed = next.is_some();
    let (team_1, team_2) = (m.team_1.clone(), m.team_2.clone());

    if let Some(prev) = previous {
        revert_points(live, &team_1, &team_2, prev);
    }
    if let Some(next) = next {
        update_points(live, &team_1, &team_2, next);
    }
    Ok(())
}

/// Set one side of a match score. The match completes as soon as both sides are entered.
pub fn set_match_score(
    live: &mut LiveState,
    match_id: MatchId,
    side: Side,
    value: Option<u32>,
) -> Result<(), TournamentError> {
    let settings = live.settings.clone();
    rescore(live, match_id, |m| apply_side(&mut m.score, side, value, &settings))
}

/// Clear a match score; a completed match has its points reverted and is reopened.
pub fn clear_match_score(live: &mut LiveState, match_id: MatchId) -> Result<(), TournamentError> {
    rescore(live, match_id, |m| m.score = Default::default())
}

/// Close the current round and generate the next one from the updated standings.
/// Every match of the current round must be complete.
pub fn complete_round<R: Rng + ?Sized>(
    live: &mut LiveState,
    rng: &mut R,
) -> Result<u32, TournamentError> {
    let current = live.current_round;
    let round = live
        .rounds
        .iter_mut()
        .find(|r| r.round_number == current)
        .ok_or(TournamentError::InvalidState)?;
    if !round.all_matches_complete() {
        return Err(TournamentError::IncompleteResults);
    }
    round.completed = true;

    let next = current + 1;
    let generated = generate_round(next, live, rng);
    live.rounds.push(generated);
    live.current_round = next;
    log::info!("Generated Mexicano round {next}");
    Ok(next)
}

/// Zero every total and start over from a freshly drawn round 1.
pub fn restart_rounds<R: Rng + ?Sized>(live: &mut LiveState, rng: &mut R) {
    for p in &mut live.players {
        p.points = 0;
        p.games_played = 0;
    }
    for t in &mut live.teams {
        t.points = 0;
        t.matches_played = 0;
    }
    let first = generate_round(1, live, rng);
    live.rounds = vec![first];
    live.current_round = 1;
}
