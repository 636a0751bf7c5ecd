//! Sync engine: one actor task per open tournament view.
//!
//! ```text
//! Loading -> Realtime (organiser, push subscription)  -> Idle -> (re-fetch) -> Realtime ...
//!         -> Polling  (viewer, pull every interval)    -> Idle -> (re-fetch) -> Polling ...
//! any state -> Closed
//! ```
//!
//! All state changes happen sequentially inside the actor's `select!` loop: commands from the
//! view, push notifications, poll ticks, the debounce deadline and the idle deadline. Local
//! edits are applied immediately and coalesced into one batched write once the debounce
//! period passes without further edits; idle and close flush at once.

use crate::config::SyncConfig;
use crate::logic::{new_document, FixtureSource, NewTournament, Progress, Standings};
use crate::models::{
    document_path, LiveState, MatchId, PlayerId, SettingsUpdate, Side, Timeslot, TournamentError,
    TournamentId,
};
use crate::session::{Role, TournamentSession, LIVE};
use crate::sync::path;
use crate::sync::store::{RemoteStore, Subscription};
use crate::sync::timer::{Deadline, Ticker};
use serde::Serialize;
use serde_json::Value;
use std::future;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use uuid::Uuid;

/// Where the session is in its lifecycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Loading,
    Realtime,
    Polling,
    Idle,
    Closed,
}

/// What the view renders. Re-published whenever the state, the mode or the role changes.
#[derive(Clone, Debug)]
pub struct SessionView {
    pub mode: SyncMode,
    pub role: Role,
    pub revision: u64,
    pub live: Arc<LiveState>,
}

type Job = Box<dyn FnOnce(&mut TournamentSession) + Send>;

enum Command {
    /// Run against the session; `activity` marks qualifying user input (resets idle).
    Run { job: Job, activity: bool },
    Activity,
    Unlock {
        credential: String,
        reply: oneshot::Sender<bool>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
}

/// Persist a new tournament document and return its id.
pub async fn create_tournament(
    store: &dyn RemoteStore,
    new: NewTournament,
    source: &dyn FixtureSource,
) -> Result<TournamentId, TournamentError> {
    let doc = new_document(new, source, &mut rand::thread_rng())?;
    let id = Uuid::new_v4();
    store
        .set(&document_path(id), serde_json::to_value(&doc)?)
        .await?;
    log::info!("Created {:?} tournament {} '{}'", doc.meta.format, id, doc.meta.name);
    Ok(id)
}

pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    doc_path: String,
    live_path: String,
    session: TournamentSession,
    config: SyncConfig,
    mode: SyncMode,
    inbox: mpsc::Receiver<Command>,
    subscription: Option<Subscription>,
    poll: Ticker,
    debounce: Deadline,
    idle: Deadline,
    view: watch::Sender<SessionView>,
}

impl SyncEngine {
    /// Loading: fetch the document once, migrate legacy score keys (written back at once for
    /// an organiser), then go Active and spawn the actor. An absent document is `NotFound`.
    pub async fn load(
        store: Arc<dyn RemoteStore>,
        id: TournamentId,
        role: Role,
        config: SyncConfig,
        source: Arc<dyn FixtureSource>,
    ) -> Result<SessionHandle, TournamentError> {
        let doc_path = document_path(id);
        let document = store
            .get(&doc_path)
            .await?
            .ok_or(TournamentError::NotFound(id))?;
        let session = TournamentSession::hydrate(id, document, role, source)?;

        let (sender, inbox) = mpsc::channel(64);
        let (view, view_rx) = watch::channel(SessionView {
            mode: SyncMode::Loading,
            role,
            revision: session.revision(),
            live: Arc::new(session.live().clone()),
        });

        let mut engine = SyncEngine {
            store,
            live_path: path::join(&doc_path, LIVE),
            doc_path,
            session,
            config,
            mode: SyncMode::Loading,
            inbox,
            subscription: None,
            poll: Ticker::default(),
            debounce: Deadline::default(),
            idle: Deadline::default(),
            view,
        };
        engine.flush().await;
        engine.activate();
        tokio::spawn(engine.run());

        Ok(SessionHandle {
            id,
            sender,
            view: view_rx,
        })
    }

    async fn run(mut self) {
        log::info!("Session {} started ({:?})", self.session.id(), self.mode);
        loop {
            tokio::select! {
                command = self.inbox.recv() => match command {
                    Some(command) => {
                        if !self.handle(command).await {
                            break;
                        }
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },
                notification = next_notification(&mut self.subscription) => match notification {
                    Some(value) => self.apply_remote(value),
                    None => {
                        if let Some(s) = self.subscription.take() {
                            log::warn!(
                                "Session {}: store dropped subscription on {}",
                                self.session.id(),
                                s.path()
                            );
                        }
                    }
                },
                _ = self.poll.tick() => self.pull().await,
                _ = self.debounce.fired() => self.flush().await,
                _ = self.idle.fired() => self.go_idle().await,
            }
        }
        log::info!("Session {} closed", self.session.id());
    }

    /// Returns `false` once the session is closed.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Run { job, activity } => {
                if activity {
                    self.on_activity().await;
                }
                let before = self.session.revision();
                job(&mut self.session);
                if self.session.revision() != before && self.session.has_pending() {
                    self.debounce.arm(self.config.debounce);
                }
                self.publish();
            }
            Command::Activity => self.on_activity().await,
            Command::Unlock { credential, reply } => {
                let unlocked = self.session.unlock(&credential);
                if unlocked && self.mode == SyncMode::Polling {
                    self.activate();
                }
                self.publish();
                let _ = reply.send(unlocked);
            }
            Command::Close { reply } => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    /// Open the channel that fits the current role: a push subscription for organisers,
    /// a poll timer for viewers.
    fn activate(&mut self) {
        match self.session.role() {
            Role::Organiser => {
                self.poll.stop();
                if self.subscription.is_none() {
                    self.subscription = Some(self.store.subscribe(&self.live_path));
                }
                self.mode = SyncMode::Realtime;
            }
            Role::Viewer => {
                self.subscription = None;
                self.poll.start(self.config.poll_interval);
                self.mode = SyncMode::Polling;
            }
        }
        self.idle.arm(self.config.idle_timeout);
        log::info!("Session {} active ({:?})", self.session.id(), self.mode);
        self.publish();
    }

    async fn on_activity(&mut self) {
        match self.mode {
            SyncMode::Idle => self.wake().await,
            SyncMode::Realtime | SyncMode::Polling => self.idle.arm(self.config.idle_timeout),
            SyncMode::Loading | SyncMode::Closed => {}
        }
    }

    /// Idle -> Active: re-fetch everything, then reopen the channel.
    async fn wake(&mut self) {
        match self.store.get(&self.doc_path).await {
            Ok(Some(document)) => {
                if let Some(live) = document.get(LIVE) {
                    self.apply_remote(live.clone());
                }
            }
            Ok(None) => log::warn!("Session {}: document vanished", self.session.id()),
            Err(e) => log::warn!("Session {}: re-fetch failed: {}", self.session.id(), e),
        }
        self.activate();
    }

    async fn go_idle(&mut self) {
        self.idle.cancel();
        self.flush().await;
        self.release_channels();
        self.mode = SyncMode::Idle;
        log::info!("Session {} idle, live channel released", self.session.id());
        self.publish();
    }

    async fn shutdown(&mut self) {
        if self.mode == SyncMode::Closed {
            return;
        }
        self.flush().await;
        self.release_channels();
        self.idle.cancel();
        self.debounce.cancel();
        self.mode = SyncMode::Closed;
        self.publish();
    }

    fn release_channels(&mut self) {
        self.subscription = None;
        self.poll.stop();
    }

    async fn pull(&mut self) {
        match self.store.get(&self.live_path).await {
            Ok(Some(live)) => self.apply_remote(live),
            Ok(None) => {}
            Err(e) => log::warn!("Session {}: poll failed: {}", self.session.id(), e),
        }
    }

    fn apply_remote(&mut self, live: Value) {
        match self.session.apply_remote(live) {
            Ok(true) => {
                log::debug!("Session {}: applied remote update", self.session.id());
                self.publish();
            }
            Ok(false) => {}
            Err(e) => log::warn!("Session {}: ignoring remote update: {}", self.session.id(), e),
        }
    }

    /// Write every pending key as one batch. On failure the keys go back into the buffer and
    /// the next debounce cycle retries.
    async fn flush(&mut self) {
        self.debounce.cancel();
        let batch = match self.session.take_pending() {
            Ok(Some(batch)) => batch,
            Ok(None) => return,
            Err(e) => {
                log::error!("Session {}: cannot serialize pending writes: {}", self.session.id(), e);
                return;
            }
        };
        let count = batch.keys.len();
        match self.store.update(&self.doc_path, batch.patch).await {
            Ok(()) => log::debug!("Session {}: flushed {} key(s)", self.session.id(), count),
            Err(e) => {
                log::warn!("Session {}: write of {} key(s) failed: {}", self.session.id(), count, e);
                self.session.restore_pending(batch.keys);
                if self.mode != SyncMode::Closed {
                    self.debounce.arm(self.config.debounce);
                }
            }
        }
    }

    fn publish(&self) {
        let (revision, mode, role) = (self.session.revision(), self.mode, self.session.role());
        let current = self.view.borrow();
        let unchanged = current.revision == revision && current.mode == mode && current.role == role;
        drop(current);
        if unchanged {
            return;
        }
        self.view.send_replace(SessionView {
            mode,
            role,
            revision,
            live: Arc::new(self.session.live().clone()),
        });
    }
}

async fn next_notification(subscription: &mut Option<Subscription>) -> Option<Value> {
    match subscription {
        Some(s) => s.recv().await,
        None => future::pending().await,
    }
}

/// Cloneable handle the view uses to talk to its session. The session closes (flushing
/// pending writes) on [`SessionHandle::close`] or when the last handle is dropped.
#[derive(Clone)]
pub struct SessionHandle {
    id: TournamentId,
    sender: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub fn id(&self) -> TournamentId {
        self.id
    }

    /// Watch this to re-render on every change.
    pub fn view(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn mode(&self) -> SyncMode {
        self.view.borrow().mode
    }

    pub fn snapshot(&self) -> Arc<LiveState> {
        Arc::clone(&self.view.borrow().live)
    }

    async fn run<T, F>(&self, activity: bool, f: F) -> Result<T, TournamentError>
    where
        T: Send + 'static,
        F: FnOnce(&mut TournamentSession) -> T + Send + 'static,
    {
        let (reply, response) = oneshot::channel();
        let job: Job = Box::new(move |session: &mut TournamentSession| {
            let _ = reply.send(f(session));
        });
        self.sender
            .send(Command::Run { job, activity })
            .await
            .map_err(|_| TournamentError::SessionClosed)?;
        response.await.map_err(|_| TournamentError::SessionClosed)
    }

    async fn edit<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut TournamentSession) -> bool + Send + 'static,
    {
        self.run(true, f).await.unwrap_or(false)
    }

    async fn try_edit<T, F>(&self, f: F) -> Result<T, TournamentError>
    where
        T: Send + 'static,
        F: FnOnce(&mut TournamentSession) -> Result<T, TournamentError> + Send + 'static,
    {
        self.run(true, f).await?
    }

    pub async fn set_score(&self, index: usize, side: Side, value: Option<u32>) -> bool {
        self.edit(move |s| s.set_score(index, side, value)).await
    }

    pub async fn set_score_input(&self, index: usize, side: Side, raw: impl Into<String>) -> bool {
        let raw = raw.into();
        self.edit(move |s| s.set_score_input(index, side, &raw)).await
    }

    pub async fn clear_score(&self, index: usize) -> bool {
        self.edit(move |s| s.clear_score(index)).await
    }

    pub async fn set_match_score(
        &self,
        match_id: MatchId,
        side: Side,
        value: Option<u32>,
    ) -> Result<bool, TournamentError> {
        self.try_edit(move |s| s.set_match_score(match_id, side, value)).await
    }

    pub async fn clear_match_score(&self, match_id: MatchId) -> Result<bool, TournamentError> {
        self.try_edit(move |s| s.clear_match_score(match_id)).await
    }

    pub async fn complete_round(&self) -> Result<Option<u32>, TournamentError> {
        self.try_edit(|s| s.complete_round()).await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<bool, TournamentError> {
        self.try_edit(move |s| s.update_settings(update)).await
    }

    pub async fn rename_player(
        &self,
        id: PlayerId,
        name: impl Into<String>,
    ) -> Result<bool, TournamentError> {
        let name = name.into();
        self.try_edit(move |s| s.rename_player(id, &name)).await
    }

    pub async fn reset_scores(&self) -> bool {
        self.edit(|s| s.reset_scores()).await
    }

    /// Take an edit lease on `key` (see [`TournamentSession::score_key`]).
    pub async fn begin_edit(&self, key: impl Into<String>) -> bool {
        let key = key.into();
        self.run(true, move |s| s.begin_edit(&key)).await.is_ok()
    }

    pub async fn end_edit(&self, key: impl Into<String>) -> Result<bool, TournamentError> {
        let key = key.into();
        self.try_edit(move |s| {
            let applied = s.end_edit(&key)?;
            if applied {
                log::debug!("Applied held-back remote value for {key}");
            }
            Ok(applied)
        })
        .await
    }

    /// Qualifying user input: keeps the session active, or wakes it from idle.
    pub async fn activity(&self) -> Result<(), TournamentError> {
        self.sender
            .send(Command::Activity)
            .await
            .map_err(|_| TournamentError::SessionClosed)
    }

    /// Check an organiser credential; on success a polling viewer switches to push updates.
    pub async fn unlock(&self, credential: impl Into<String>) -> bool {
        let (reply, response) = oneshot::channel();
        let command = Command::Unlock {
            credential: credential.into(),
            reply,
        };
        if self.sender.send(command).await.is_err() {
            return false;
        }
        response.await.unwrap_or(false)
    }

    pub async fn standings(&self) -> Result<Standings, TournamentError> {
        self.run(false, |s| s.standings()).await
    }

    pub async fn timeslots(&self) -> Result<Arc<Vec<Timeslot>>, TournamentError> {
        self.run(false, |s| s.timeslots()).await
    }

    pub async fn progress(&self) -> Result<Progress, TournamentError> {
        self.run(false, |s| s.progress()).await
    }

    /// Flush pending writes, release every timer and channel, and stop the actor.
    pub async fn close(&self) {
        let (reply, response) = oneshot::channel();
        if self.sender.send(Command::Close { reply }).await.is_ok() {
            let _ = response.await;
        }
    }
}
