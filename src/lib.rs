pub mod types;
pub mod config;
pub mod error;
pub mod entrants;
pub mod matchup;
pub mod summary;
pub mod images;
pub mod store;
pub mod service;

use types::*;
use config::*;
use error::MatchupError;
use images::{ConfiguredResolver, ImageResolver};
use service::{EngineSettings, MatchupService};
use store::MatchupStore;

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, get_service, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── Match-up handlers ──────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

async fn list_matchups<R: ImageResolver>(
    State(service): State<MatchupService<R>>,
) -> Result<Json<Vec<MatchupView>>, MatchupError> {
    let posts = service.list()?;
    Ok(Json(posts.into_iter().map(MatchupView::from).collect()))
}

async fn create_matchup<R: ImageResolver>(
    State(service): State<MatchupService<R>>,
    Json(request): Json<CreateMatchupRequest>,
) -> Result<(StatusCode, Json<MatchupView>), MatchupError> {
    let post = service.create_matchup(request).await?;
    Ok((StatusCode::CREATED, Json(MatchupView::from(post))))
}

async fn get_matchup<R: ImageResolver>(
    State(service): State<MatchupService<R>>,
    Path(id): Path<u64>,
) -> Result<Json<MatchupView>, MatchupError> {
    Ok(Json(MatchupView::from(service.get(id)?)))
}

async fn delete_matchup<R: ImageResolver>(
    State(service): State<MatchupService<R>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, MatchupError> {
    service.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn vote_matchup<R: ImageResolver>(
    State(service): State<MatchupService<R>>,
    Path(id): Path<u64>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<MatchupView>, MatchupError> {
    Ok(Json(MatchupView::from(service.vote(id, request.side)?)))
}

async fn matchup_summary<R: ImageResolver>(
    State(service): State<MatchupService<R>>,
    Path(id): Path<u64>,
) -> impl IntoResponse {
    service.summary(id).map(Json)
}

// ── HTTP server ────────────────────────────────────────────────────────

pub fn matchup_router<R: ImageResolver>(service: MatchupService<R>, static_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/matchups", get(list_matchups::<R>).post(create_matchup::<R>))
        .route("/matchups/:id", get(get_matchup::<R>).delete(delete_matchup::<R>))
        .route("/matchups/:id/vote", post(vote_matchup::<R>))
        .route("/matchups/:id/summary", get(matchup_summary::<R>))
        .with_state(service);

    match static_dir {
        Some(dir) => router.fallback_service(get_service(ServeDir::new(dir))),
        None => router,
    }
}

async fn start_matchup_server<R: ImageResolver>(
    service: MatchupService<R>,
    static_dir: Option<PathBuf>,
    addr: &str,
) {
    let app = matchup_router(service, static_dir);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("match-up server failed to bind {addr}: {e}");
            return;
        }
    };
    info!("match-up server listening at http://{addr}/");
    if let Err(e) = axum::serve(listener, app).await {
        error!("match-up server error: {e}");
    }
}

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();
    let (config, config_error) = match load_config_inner() {
        Ok(config) => (config, None),
        Err(err) => (apply_env_defaults(AppConfig::default()), Some(err)),
    };

    // Initialize tracing with a daily rolling log file
    let logs_dir = logs_dir_from_config(&config);
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "matchup.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Versus match-up service starting");
    if let Some(err) = config_error {
        error!("config unreadable, using defaults: {err}");
    }
    log_env_warnings(&config);

    let store = match data_path_from_config(&config) {
        Some(path) => match MatchupStore::open(&path) {
            Ok(store) => store,
            Err(err) => {
                error!("refusing to start over unreadable match-up data: {err}");
                return;
            }
        },
        None => MatchupStore::in_memory(),
    };
    let store: SharedMatchupStore = Arc::new(Mutex::new(store));
    let service = MatchupService::new(
        store,
        ConfiguredResolver::from_config(&config),
        EngineSettings::from_config(&config),
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return;
        }
    };
    runtime.block_on(async {
        let resumed = service.resume_pending();
        if resumed > 0 {
            info!("resumed {resumed} match-up(s) saved mid-round");
        }
        start_matchup_server(service, static_dir_from_config(&config), &config.listen_addr).await
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::PlaceholderImageResolver;
    use serde_json::{json, Value};
    use std::time::Duration;

    async fn spawn_test_server() -> String {
        let store: SharedMatchupStore = Arc::new(Mutex::new(MatchupStore::in_memory()));
        let settings = EngineSettings {
            advance_delay: Duration::from_millis(20),
            shuffle_seed: Some(3),
            ..EngineSettings::default()
        };
        let service = MatchupService::new(store, PlaceholderImageResolver, settings);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, matchup_router(service, None)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_http_vote_flow() {
        let base = spawn_test_server().await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        let created = client
            .post(format!("{base}/matchups"))
            .json(&json!({ "title": "Pizza toppings", "entrants": "ham comma olive comma onion comma basil", "voice": true }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        let body: Value = created.json().await.unwrap();
        let id = body["id"].as_u64().unwrap();
        assert_eq!(body["phase"], "awaitingVote");
        assert_eq!(body["tournament"]["initialContenders"].as_array().unwrap().len(), 4);

        let voted: Value = client
            .post(format!("{base}/matchups/{id}/vote"))
            .json(&json!({ "side": "A" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(voted["phase"], "roundDecided");
        assert_eq!(voted["tournament"]["slotA"]["votes"], 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let current: Value = client
            .get(format!("{base}/matchups/{id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(current["phase"], "awaitingVote");
        assert_eq!(current["tournament"]["eliminatedNames"].as_array().unwrap().len(), 1);

        let summary = client.get(format!("{base}/matchups/{id}/summary")).send().await.unwrap();
        assert_eq!(summary.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_http_errors() {
        let base = spawn_test_server().await;
        let client = reqwest::Client::builder().no_proxy().build().unwrap();

        let too_few = client
            .post(format!("{base}/matchups"))
            .json(&json!({ "title": "Tiny", "entrants": "a, b" }))
            .send()
            .await
            .unwrap();
        assert_eq!(too_few.status(), StatusCode::BAD_REQUEST);

        let missing = client.get(format!("{base}/matchups/42")).send().await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let deleted = client.delete(format!("{base}/matchups/42")).send().await.unwrap();
        assert_eq!(deleted.status(), StatusCode::NOT_FOUND);

        let health = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");
    }
}
