//! The owned state of one open tournament view.
//!
//! Every operation takes the session explicitly; nothing is global. Local edits are applied
//! immediately (optimistic) and recorded as dirty keys, relative to the document's `live`
//! subtree, for the sync engine to flush. Keys are as fine as the data allows: one fixture's
//! score, one settings field, or the whole round list for Mexicano.

use crate::logic::{
    self, apply_settings, clear_fixture_score, compute_standings, migrate_scores,
    reset_fixture_scores, restart_rounds, set_fixture_score, FixtureSource, Progress,
    ScheduleCache, Standings,
};
use crate::models::{
    fixture_key, parse_score_input, Fixture, Format, LiveState, MatchId, MexicanoMode, PlayerId,
    Score, SettingsUpdate, Side, Timeslot, TournamentDoc, TournamentError, TournamentId,
    TournamentMeta,
};
use crate::sync::path;
use crate::sync::Leases;
use chrono::Utc;
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Name of the dynamic subtree inside a tournament document.
pub const LIVE: &str = "live";

/// Who is looking at the tournament.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// May edit scores and settings.
    Organiser,
    /// Read-only.
    Viewer,
}

/// Dirty keys taken from the session together with their serialized values, ready to be
/// written as one multi-path update against the document root.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingBatch {
    pub keys: Vec<String>,
    pub patch: Map<String, Value>,
}

pub struct TournamentSession {
    id: TournamentId,
    meta: TournamentMeta,
    live: LiveState,
    role: Role,
    source: Arc<dyn FixtureSource>,
    cache: ScheduleCache,
    pending: BTreeSet<String>,
    leases: Leases,
    revision: u64,
}

impl TournamentSession {
    pub fn new(
        id: TournamentId,
        doc: TournamentDoc,
        role: Role,
        source: Arc<dyn FixtureSource>,
    ) -> Self {
        Self {
            id,
            meta: doc.meta,
            live: doc.live,
            role,
            source,
            cache: ScheduleCache::new(),
            pending: BTreeSet::new(),
            leases: Leases::default(),
            revision: 0,
        }
    }

    /// Build a session from a fetched document. Legacy score keys are migrated; for an
    /// organiser the rewrite is queued so the next flush persists it.
    pub fn hydrate(
        id: TournamentId,
        document: Value,
        role: Role,
        source: Arc<dyn FixtureSource>,
    ) -> Result<Self, TournamentError> {
        let doc: TournamentDoc = serde_json::from_value(document)?;
        let mut session = Self::new(id, doc, role, source);
        let mut live = std::mem::take(&mut session.live);
        session.migrate(&mut live);
        session.live = live;
        Ok(session)
    }

    /// Lease key for an Americano fixture score.
    pub fn score_key(index: usize) -> String {
        format!("scores/{}", fixture_key(index))
    }

    /// Lease key covering every Mexicano match.
    pub fn rounds_key() -> &'static str {
        "rounds"
    }

    pub fn id(&self) -> TournamentId {
        self.id
    }

    pub fn meta(&self) -> &TournamentMeta {
        &self.meta
    }

    pub fn live(&self) -> &LiveState {
        &self.live
    }

    pub fn format(&self) -> Format {
        self.meta.format
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Bumped on every local or remote change; a new value means "re-render".
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = &String> {
        self.pending.iter()
    }

    /// Upgrade a viewer to organiser when the credential matches.
    pub fn unlock(&mut self, credential: &str) -> bool {
        if self.role == Role::Organiser {
            return true;
        }
        if credential != self.meta.organiser_credential {
            return false;
        }
        log::info!("Tournament {}: editing unlocked", self.id);
        self.role = Role::Organiser;
        self.revision += 1;
        true
    }

    fn can_edit(&self, format: Format) -> bool {
        self.role == Role::Organiser && self.meta.format == format
    }

    fn touch(&mut self, key: impl Into<String>) {
        self.pending.insert(key.into());
    }

    fn touch_rounds(&mut self) {
        self.touch(Self::rounds_key());
        self.touch("currentRound");
        match self.live.settings.mexicano_mode {
            MexicanoMode::Individual => self.touch("players"),
            MexicanoMode::Team => self.touch("teams"),
        }
    }

    fn changed(&mut self) -> bool {
        self.revision += 1;
        true
    }

    fn migrate(&mut self, live: &mut LiveState) {
        let moved = migrate_scores(&mut live.scores, live.settings.court_count);
        if self.role != Role::Organiser {
            return;
        }
        for m in moved {
            self.touch(format!("scores/{}", m.legacy));
            self.touch(format!("scores/{}", m.canonical));
        }
    }

    // --- Americano -----------------------------------------------------------------------

    /// Set one side of a fixture score. Ignored (returns `false`) for viewers, for
    /// Mexicano tournaments and for unknown fixtures.
    pub fn set_score(&mut self, index: usize, side: Side, value: Option<u32>) -> bool {
        if !self.can_edit(Format::Americano) || index >= self.fixtures().len() {
            return false;
        }
        set_fixture_score(&mut self.live, index, side, value);
        self.touch(Self::score_key(index));
        self.changed()
    }

    /// [`Self::set_score`] from raw input; anything unparseable counts as "not entered".
    pub fn set_score_input(&mut self, index: usize, side: Side, raw: &str) -> bool {
        self.set_score(index, side, parse_score_input(raw))
    }

    pub fn clear_score(&mut self, index: usize) -> bool {
        if !self.can_edit(Format::Americano) || !clear_fixture_score(&mut self.live, index) {
            return false;
        }
        self.touch(Self::score_key(index));
        self.changed()
    }

    pub fn score(&self, index: usize) -> Option<Score> {
        self.live.scores.get(&fixture_key(index)).copied()
    }

    // --- Mexicano ------------------------------------------------------------------------

    /// Set one side of a match score; completed matches are reverted and re-applied.
    /// `Ok(false)` when not permitted.
    pub fn set_match_score(
        &mut self,
        match_id: MatchId,
        side: Side,
        value: Option<u32>,
    ) -> Result<bool, TournamentError> {
        if !self.can_edit(Format::Mexicano) {
            return Ok(false);
        }
        logic::set_match_score(&mut self.live, match_id, side, value)?;
        self.touch_rounds();
        Ok(self.changed())
    }

    pub fn clear_match_score(&mut self, match_id: MatchId) -> Result<bool, TournamentError> {
        if !self.can_edit(Format::Mexicano) {
            return Ok(false);
        }
        logic::clear_match_score(&mut self.live, match_id)?;
        self.touch_rounds();
        Ok(self.changed())
    }

    /// Complete the current round and generate the next. Returns the new round number,
    /// or `None` when not permitted.
    pub fn complete_round(&mut self) -> Result<Option<u32>, TournamentError> {
        self.complete_round_with(&mut rand::thread_rng())
    }

    pub fn complete_round_with<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Option<u32>, TournamentError> {
        if !self.can_edit(Format::Mexicano) {
            return Ok(None);
        }
        let next = logic::complete_round(&mut self.live, rng)?;
        self.touch_rounds();
        self.changed();
        Ok(Some(next))
    }

    // --- Both formats --------------------------------------------------------------------

    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<bool, TournamentError> {
        if self.role != Role::Organiser {
            return Ok(false);
        }
        let fields = [
            ("courtCount", update.court_count.is_some()),
            ("fixedPoints", update.fixed_points.is_some()),
            ("pointsTotal", update.points_total.is_some()),
            ("courtNames", update.court_names.is_some()),
        ];
        if !apply_settings(&mut self.live, update, self.meta.format, self.source.as_ref())? {
            return Ok(false);
        }
        for (field, _) in fields.iter().filter(|(_, set)| *set) {
            self.touch(format!("settings/{field}"));
        }
        Ok(self.changed())
    }

    pub fn rename_player(&mut self, id: PlayerId, name: &str) -> Result<bool, TournamentError> {
        if self.role != Role::Organiser || !logic::rename_player(&mut self.live, id, name)? {
            return Ok(false);
        }
        self.touch("players");
        Ok(self.changed())
    }

    /// Drop every score. Mexicano also zeroes the totals and redraws round 1.
    pub fn reset_scores(&mut self) -> bool {
        self.reset_scores_with(&mut rand::thread_rng())
    }

    pub fn reset_scores_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.role != Role::Organiser {
            return false;
        }
        match self.meta.format {
            Format::Americano => {
                for key in reset_fixture_scores(&mut self.live) {
                    self.touch(format!("scores/{key}"));
                }
            }
            Format::Mexicano => {
                restart_rounds(&mut self.live, rng);
                self.touch_rounds();
            }
        }
        log::info!("Tournament {}: scores reset", self.id);
        self.changed()
    }

    // --- Derived views -------------------------------------------------------------------

    pub fn fixtures(&mut self) -> Arc<Vec<Fixture>> {
        let (courts, players) = (self.live.settings.court_count, self.live.player_count());
        self.cache.fixtures(self.source.as_ref(), courts, players)
    }

    /// Americano rounds; empty for Mexicano.
    pub fn timeslots(&mut self) -> Arc<Vec<Timeslot>> {
        if self.meta.format != Format::Americano {
            return Arc::new(Vec::new());
        }
        let (courts, players) = (self.live.settings.court_count, self.live.player_count());
        self.cache.timeslots(self.source.as_ref(), courts, players)
    }

    pub fn standings(&mut self) -> Standings {
        let fixtures = match self.meta.format {
            Format::Americano => self.fixtures(),
            Format::Mexicano => Arc::new(Vec::new()),
        };
        compute_standings(&self.live, &fixtures, self.meta.format)
    }

    pub fn progress(&mut self) -> Progress {
        match self.meta.format {
            Format::Americano => {
                let fixtures = self.fixtures();
                let slots = self.timeslots();
                Progress::americano(&fixtures, &slots, &self.live)
            }
            Format::Mexicano => Progress::mexicano(&self.live),
        }
    }

    // --- Sync plumbing -------------------------------------------------------------------

    /// Mark `key` as being edited locally.
    pub fn begin_edit(&mut self, key: &str) {
        self.leases.acquire(key);
    }

    /// Release the lease on `key`. A remote value held back meanwhile is applied now, unless
    /// the key still has an unflushed local edit (which will overwrite it remotely anyway).
    pub fn end_edit(&mut self, key: &str) -> Result<bool, TournamentError> {
        let Some(remote) = self.leases.release(key) else {
            return Ok(false);
        };
        if self.pending.contains(key) {
            return Ok(false);
        }
        let mut local = serde_json::to_value(&self.live)?;
        path::set(&mut local, key, remote);
        self.replace_live(serde_json::from_value(local)?)
    }

    /// Replace local live state with a remote snapshot of the `live` subtree. Keys with
    /// unflushed edits or held leases keep their local value.
    pub fn apply_remote(&mut self, remote: Value) -> Result<bool, TournamentError> {
        if remote.is_null() {
            return Ok(false);
        }
        let local = serde_json::to_value(&self.live)?;
        let protected: BTreeSet<String> = self
            .pending
            .iter()
            .chain(self.leases.keys())
            .cloned()
            .collect();

        let mut merged = remote;
        for key in &protected {
            let remote_value = path::get(&merged, key).cloned().unwrap_or(Value::Null);
            self.leases.queue(key, remote_value);
            let local_value = path::get(&local, key).cloned().unwrap_or(Value::Null);
            path::set(&mut merged, key, local_value);
        }

        let mut next: LiveState = serde_json::from_value(merged)?;
        self.migrate(&mut next);
        self.replace_live(next)
    }

    fn replace_live(&mut self, next: LiveState) -> Result<bool, TournamentError> {
        if next == self.live {
            return Ok(false);
        }
        self.live = next;
        Ok(self.changed())
    }

    /// Take every dirty key as one batch (paths relative to the document root).
    pub fn take_pending(&mut self) -> Result<Option<PendingBatch>, TournamentError> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let live = serde_json::to_value(&self.live)?;
        let now = Utc::now();
        let mut patch = Map::new();
        for key in &self.pending {
            let value = path::get(&live, key).cloned().unwrap_or(Value::Null);
            patch.insert(path::join(LIVE, key), value);
        }
        patch.insert("meta/updatedAt".to_string(), serde_json::to_value(now)?);
        self.meta.updated_at = now;
        let keys = std::mem::take(&mut self.pending).into_iter().collect();
        Ok(Some(PendingBatch { keys, patch }))
    }

    /// Put a failed batch back so the next flush retries it with the latest values.
    pub fn restore_pending(&mut self, keys: Vec<String>) {
        self.pending.extend(keys);
    }
}
