//! Single binary web server: static assets from /static, tournaments via REST.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. Override with env: HOST, PORT, and the SYNC_* timings.
//!
//! Each tournament touched by an editing or derived-view request gets one organiser session
//! (a sync engine actor) that applies edits and writes them to the shared store. Every
//! request counts as activity; tournaments untouched for 12h are closed and deleted.

use actix_files::Files;
use actix_web::{
    delete, get, patch, post, put,
    web::{Data, Json, Path},
    App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use padel_tournament_web::{
    create_tournament, models::document_path, ActivityLog, CourtFixture, FixtureSource, MatchId,
    MemoryStore, NewTournament, PlayerId, RemoteStore, Role, RoundRobinFixtures, ServerConfig,
    SessionHandle, SettingsUpdate, Side, Standings, SyncConfig, SyncEngine, TournamentError,
    TournamentId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Header carrying the organiser credential on every editing request.
const CREDENTIAL_HEADER: &str = "x-organiser-credential";

struct AppState {
    store: Arc<dyn RemoteStore>,
    source: Arc<dyn FixtureSource>,
    sync: SyncConfig,
    sessions: RwLock<HashMap<TournamentId, SessionHandle>>,
    /// Last access per tournament (for auto-cleanup), whether or not it has a session.
    activity: RwLock<ActivityLog>,
}

type Shared = Data<AppState>;

impl AppState {
    fn touch(&self, id: TournamentId) {
        self.activity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .touch(id);
    }

    /// Existing session for `id`, or a freshly loaded one.
    async fn session(&self, id: TournamentId) -> Result<SessionHandle, TournamentError> {
        let existing = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned();
        let handle = match existing {
            Some(handle) => handle,
            None => {
                let handle = SyncEngine::load(
                    Arc::clone(&self.store),
                    id,
                    Role::Organiser,
                    self.sync,
                    Arc::clone(&self.source),
                )
                .await?;
                let mut g = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
                g.entry(id).or_insert(handle).clone()
            }
        };
        self.touch(id);
        Ok(handle)
    }

    /// Compare `given` with the organiser credential stored for the tournament.
    async fn check_credential(&self, id: TournamentId, given: &str) -> Result<bool, TournamentError> {
        let stored = self
            .store
            .get(&format!("{}/meta/organiserCredential", document_path(id)))
            .await?
            .ok_or(TournamentError::NotFound(id))?;
        Ok(stored.as_str() == Some(given))
    }

    async fn authorize(&self, id: TournamentId, req: &HttpRequest) -> Result<bool, TournamentError> {
        match req.headers().get(CREDENTIAL_HEADER).and_then(|v| v.to_str().ok()) {
            Some(given) => self.check_credential(id, given).await,
            None => Ok(false),
        }
    }

    /// Close and delete every tournament idle for at least `timeout`.
    async fn cleanup(&self, timeout: std::time::Duration) {
        let expired: Vec<(TournamentId, Option<SessionHandle>)> = {
            let ids = self
                .activity
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .take_expired(timeout);
            let mut g = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
            ids.into_iter().map(|id| (id, g.remove(&id))).collect()
        };
        if expired.is_empty() {
            return;
        }
        for (id, handle) in &expired {
            if let Some(handle) = handle {
                handle.close().await;
            }
            if let Err(e) = self.store.set(&document_path(*id), serde_json::Value::Null).await {
                log::warn!("Could not delete tournament {}: {}", id, e);
            }
        }
        log::info!(
            "Cleaned up {} inactive tournament(s) (no activity for {}h)",
            expired.len(),
            timeout.as_secs() / 3600
        );
    }
}

fn error_response(e: TournamentError) -> HttpResponse {
    match e {
        TournamentError::NotFound(_)
        | TournamentError::MatchNotFound(_)
        | TournamentError::PlayerNotFound(_) => HttpResponse::NotFound().body(e.to_string()),
        TournamentError::Store(_) | TournamentError::SessionClosed => {
            HttpResponse::ServiceUnavailable().body(e.to_string())
        }
        TournamentError::Serialization(_) => {
            log::error!("{}", e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
        _ => HttpResponse::BadRequest().body(e.to_string()),
    }
}

/// Open the session, check the credential, then run `edit`.
async fn organiser_edit<T, F, Fut>(
    state: &AppState,
    id: TournamentId,
    req: &HttpRequest,
    edit: F,
) -> HttpResponse
where
    T: Serialize,
    F: FnOnce(SessionHandle) -> Fut,
    Fut: std::future::Future<Output = Result<T, TournamentError>>,
{
    match state.authorize(id, req).await {
        Ok(true) => {}
        Ok(false) => return HttpResponse::Forbidden().body("organiser credential required"),
        Err(e) => return error_response(e),
    }
    let handle = match state.session(id).await {
        Ok(handle) => handle,
        Err(e) => return error_response(e),
    };
    match edit(handle).await {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(e),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: TournamentId,
}

#[derive(Serialize)]
struct ChangedResponse {
    changed: bool,
}

#[derive(Serialize)]
struct UnlockResponse {
    ok: bool,
}

#[derive(Serialize)]
struct TimeslotResponse<'a> {
    round: usize,
    courts: Vec<CourtFixture<'a>>,
    resting: &'a [PlayerId],
}

#[derive(Deserialize)]
struct ScoreBody {
    side: Side,
    /// Raw input; anything that is not a valid score clears the side.
    #[serde(default)]
    input: String,
}

#[derive(Deserialize)]
struct MatchScoreBody {
    side: Side,
    value: Option<u32>,
}

#[derive(Deserialize)]
struct RenameBody {
    name: String,
}

#[derive(Deserialize)]
struct UnlockBody {
    credential: String,
}

#[derive(Serialize)]
struct StandingsRow<'a> {
    rank: usize,
    name: &'a str,
    games: u32,
    wins: u32,
    losses: u32,
    draws: u32,
    points: i64,
    diff: i64,
    avg_points: String,
    avg_diff: String,
}

fn standings_csv(standings: &Standings) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for (i, e) in standings.entries.iter().enumerate() {
        wtr.serialize(StandingsRow {
            rank: i + 1,
            name: &e.name,
            games: e.games_played,
            wins: e.wins,
            losses: e.losses,
            draws: e.draws,
            points: e.total_points,
            diff: e.point_diff,
            avg_points: format!("{:.2}", e.avg_points),
            avg_diff: format!("{:.2}", e.avg_diff),
        })?;
    }
    wtr.into_inner().map_err(|e| e.into_error().into())
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "padel-tournament-web",
    })
}

/// Avoid 404 in browser tab: favicon not required for app logic.
#[get("/favicon.ico")]
async fn favicon() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

#[post("/api/tournaments")]
async fn api_create_tournament(state: Shared, body: Json<NewTournament>) -> HttpResponse {
    match create_tournament(state.store.as_ref(), body.into_inner(), state.source.as_ref()).await {
        Ok(id) => {
            state.touch(id);
            HttpResponse::Ok().json(CreatedResponse { id })
        }
        Err(e) => error_response(e),
    }
}

/// Full document (meta and live state) as stored.
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: Shared, path: Path<TournamentId>) -> HttpResponse {
    let id = path.into_inner();
    match state.store.get(&document_path(id)).await {
        Ok(Some(mut doc)) => {
            state.touch(id);
            if let Some(meta) = doc.get_mut("meta").and_then(|m| m.as_object_mut()) {
                meta.remove("organiserCredential");
            }
            HttpResponse::Ok().json(doc)
        }
        Ok(None) => error_response(TournamentError::NotFound(id)),
        Err(e) => error_response(e.into()),
    }
}

/// Live subtree only, for clients that poll.
#[get("/api/tournaments/{id}/live")]
async fn api_get_live(state: Shared, path: Path<TournamentId>) -> HttpResponse {
    let id = path.into_inner();
    match state.store.get(&format!("{}/live", document_path(id))).await {
        Ok(Some(live)) => {
            state.touch(id);
            HttpResponse::Ok().json(live)
        }
        Ok(None) => error_response(TournamentError::NotFound(id)),
        Err(e) => error_response(e.into()),
    }
}

/// Lets a client check a credential before it starts sending edits.
#[post("/api/tournaments/{id}/unlock")]
async fn api_unlock(state: Shared, path: Path<TournamentId>, body: Json<UnlockBody>) -> HttpResponse {
    let id = path.into_inner();
    match state.check_credential(id, &body.credential).await {
        Ok(ok) => {
            state.touch(id);
            HttpResponse::Ok().json(UnlockResponse { ok })
        }
        Err(e) => error_response(e),
    }
}

/// Americano timeslots with each fixture labelled by its court name.
#[get("/api/tournaments/{id}/timeslots")]
async fn api_timeslots(state: Shared, path: Path<TournamentId>) -> HttpResponse {
    let handle = match state.session(path.into_inner()).await {
        Ok(handle) => handle,
        Err(e) => return error_response(e),
    };
    let slots = match handle.timeslots().await {
        Ok(slots) => slots,
        Err(e) => return error_response(e),
    };
    let live = handle.snapshot();
    let body: Vec<TimeslotResponse> = slots
        .iter()
        .map(|slot| TimeslotResponse {
            round: slot.round,
            courts: slot.on_courts(&live.settings),
            resting: &slot.resting,
        })
        .collect();
    HttpResponse::Ok().json(body)
}

#[get("/api/tournaments/{id}/progress")]
async fn api_progress(state: Shared, path: Path<TournamentId>) -> HttpResponse {
    match state.session(path.into_inner()).await {
        Ok(handle) => match handle.progress().await {
            Ok(progress) => HttpResponse::Ok().json(progress),
            Err(e) => error_response(e),
        },
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: Shared, path: Path<TournamentId>) -> HttpResponse {
    match state.session(path.into_inner()).await {
        Ok(handle) => match handle.standings().await {
            Ok(standings) => HttpResponse::Ok().json(standings),
            Err(e) => error_response(e),
        },
        Err(e) => error_response(e),
    }
}

#[get("/api/tournaments/{id}/standings.csv")]
async fn api_standings_csv(state: Shared, path: Path<TournamentId>) -> HttpResponse {
    let standings = match state.session(path.into_inner()).await {
        Ok(handle) => handle.standings().await,
        Err(e) => Err(e),
    };
    match standings {
        Ok(standings) => match standings_csv(&standings) {
            Ok(body) => HttpResponse::Ok().content_type("text/csv").body(body),
            Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
        },
        Err(e) => error_response(e),
    }
}

#[put("/api/tournaments/{id}/scores/{index}")]
async fn api_set_score(
    state: Shared,
    path: Path<(TournamentId, usize)>,
    body: Json<ScoreBody>,
    req: HttpRequest,
) -> HttpResponse {
    let (id, index) = path.into_inner();
    let ScoreBody { side, input } = body.into_inner();
    organiser_edit(&state, id, &req, |h| async move {
        let changed = h.set_score_input(index, side, input).await;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

#[delete("/api/tournaments/{id}/scores/{index}")]
async fn api_clear_score(
    state: Shared,
    path: Path<(TournamentId, usize)>,
    req: HttpRequest,
) -> HttpResponse {
    let (id, index) = path.into_inner();
    organiser_edit(&state, id, &req, |h| async move {
        let changed = h.clear_score(index).await;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

#[put("/api/tournaments/{id}/matches/{match_id}")]
async fn api_set_match_score(
    state: Shared,
    path: Path<(TournamentId, MatchId)>,
    body: Json<MatchScoreBody>,
    req: HttpRequest,
) -> HttpResponse {
    let (id, match_id) = path.into_inner();
    let MatchScoreBody { side, value } = body.into_inner();
    organiser_edit(&state, id, &req, |h| async move {
        let changed = h.set_match_score(match_id, side, value).await?;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

#[delete("/api/tournaments/{id}/matches/{match_id}")]
async fn api_clear_match_score(
    state: Shared,
    path: Path<(TournamentId, MatchId)>,
    req: HttpRequest,
) -> HttpResponse {
    let (id, match_id) = path.into_inner();
    organiser_edit(&state, id, &req, |h| async move {
        let changed = h.clear_match_score(match_id).await?;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

/// Complete the current Mexicano round; returns the new round number.
#[post("/api/tournaments/{id}/rounds/complete")]
async fn api_complete_round(state: Shared, path: Path<TournamentId>, req: HttpRequest) -> HttpResponse {
    organiser_edit(&state, path.into_inner(), &req, |h| async move {
        h.complete_round().await
    })
    .await
}

#[patch("/api/tournaments/{id}/settings")]
async fn api_update_settings(
    state: Shared,
    path: Path<TournamentId>,
    body: Json<SettingsUpdate>,
    req: HttpRequest,
) -> HttpResponse {
    let update = body.into_inner();
    organiser_edit(&state, path.into_inner(), &req, |h| async move {
        let changed = h.update_settings(update).await?;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

#[put("/api/tournaments/{id}/players/{player_id}")]
async fn api_rename_player(
    state: Shared,
    path: Path<(TournamentId, PlayerId)>,
    body: Json<RenameBody>,
    req: HttpRequest,
) -> HttpResponse {
    let (id, player_id) = path.into_inner();
    let name = body.into_inner().name;
    organiser_edit(&state, id, &req, |h| async move {
        let changed = h.rename_player(player_id, name).await?;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

#[post("/api/tournaments/{id}/reset")]
async fn api_reset_scores(state: Shared, path: Path<TournamentId>, req: HttpRequest) -> HttpResponse {
    organiser_edit(&state, path.into_inner(), &req, |h| async move {
        let changed = h.reset_scores().await;
        Ok::<_, TournamentError>(ChangedResponse { changed })
    })
    .await
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = ServerConfig::from_env();
    let sync = SyncConfig::from_env();
    log::info!("Starting server at http://{}:{}", config.host, config.port);

    let state = Data::new(AppState {
        store: Arc::new(MemoryStore::new()),
        source: Arc::new(RoundRobinFixtures),
        sync,
        sessions: RwLock::new(HashMap::new()),
        activity: RwLock::new(ActivityLog::new()),
    });

    // Background task: periodically drop tournaments nobody touched for the inactivity timeout
    let state_cleanup = state.clone();
    let (every, timeout) = (config.cleanup_interval, config.inactivity_timeout);
    actix_web::rt::spawn(async move {
        let mut interval = actix_web::rt::time::interval(every);
        loop {
            interval.tick().await;
            state_cleanup.cleanup(timeout).await;
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(favicon)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_get_live)
            .service(api_unlock)
            .service(api_timeslots)
            .service(api_progress)
            .service(api_standings_csv)
            .service(api_standings)
            .service(api_set_score)
            .service(api_clear_score)
            .service(api_set_match_score)
            .service(api_clear_match_score)
            .service(api_complete_round)
            .service(api_update_settings)
            .service(api_rename_player)
            .service(api_reset_scores)
            .service(Files::new("/static", "static").show_files_listing())
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
