//! The HTTP surface: one route that solves a challenge, one that reports
//! liveness.
//!
//! Every `/solve` request gets its own browser process with an ephemeral
//! profile, so requests cannot leak state into each other.

use crate::{AppError, AppResult, config::Config};

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use recap_solver_core::{
    AssetFetcher, AudioChallenger, Browser, BrowserConfig, ChallengeOutcome, GoogleRecognizer,
    SolverError, SpeechConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

// Subresources the challenge flow never needs. Trimming them keeps
// page loads fast and quiet.
const BLOCKED_URL_PATTERNS: &[&str] = &[
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.svg",
    "*google-analytics.com*",
    "*googletagmanager.com*",
    "*doubleclick.net*",
];

const ASSET_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state behind the HTTP handlers.
pub(crate) struct AppState {
    config: Config,
    api_key: String,
    started: Instant,
}

impl AppState {
    /// Bundle the loaded config with the resolved API key.
    pub(crate) fn new(config: Config, api_key: String) -> Self {
        Self {
            config,
            api_key,
            started: Instant::now(),
        }
    }
}

/// Build the application router.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/solve", post(solve))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SolveRequest {
    /// Page hosting the challenge widget.
    pub(crate) url: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SolveResponse {
    pub(crate) status: &'static str,
    pub(crate) token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) status: String,
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
    pub(crate) version: &'static str,
    pub(crate) uptime_secs: u64,
}

#[instrument(skip(state, request), fields(request_id = %Uuid::new_v4(), url = %request.url))]
async fn solve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SolveRequest>,
) -> Response {
    let started = Instant::now();

    let result = run_challenge(&state, &request.url).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(ChallengeOutcome::Success { token }) => {
            info!(elapsed_ms, "Challenge passed");
            (
                StatusCode::OK,
                Json(SolveResponse {
                    status: "success",
                    token,
                }),
            )
                .into_response()
        }
        Ok(outcome) => {
            info!(elapsed_ms, outcome = outcome.as_str(), "Challenge did not pass");
            (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    status: outcome.as_str().to_string(),
                    error: format!("challenge ended with outcome '{}'", outcome.as_str()),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(elapsed_ms, error = ?e, "Challenge failed");
            (
                status_for(&e),
                Json(ErrorResponse {
                    status: "error".to_string(),
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}

/// Launch a fresh browser, run the challenge on `url` and tear down.
async fn run_challenge(state: &AppState, url: &str) -> AppResult<ChallengeOutcome> {
    let browser_config = BrowserConfig {
        executable: state.config.browser.executable.clone(),
        headless: state.config.browser.headless,
        ..BrowserConfig::default()
    };

    let browser = Browser::launch(&browser_config).await?;

    let result = drive_page(state, &browser, url).await;

    // Teardown happens regardless of how the challenge went.
    browser.close().await;

    result
}

async fn drive_page(state: &AppState, browser: &Browser, url: &str) -> AppResult<ChallengeOutcome> {
    let page = browser.new_page().await?;

    page.block_urls(BLOCKED_URL_PATTERNS).await?;
    page.navigate(
        url,
        Duration::from_millis(state.config.browser.navigation_timeout_ms),
    )
    .await?;

    let mut speech_config = SpeechConfig::new(state.api_key.clone());
    speech_config.language = state.config.speech.language.clone();
    let recognizer = GoogleRecognizer::new(speech_config)?;

    let challenger = AudioChallenger::new(
        state.config.cache_dir()?,
        Arc::new(recognizer),
        AssetFetcher::new(ASSET_TIMEOUT)?,
    )
    .with_settle_delay(Duration::from_millis(state.config.challenge.settle_delay_ms));

    let outcome = challenger.solve(&page).await?;

    Ok(outcome)
}

/// HTTP status for a failed solve.
pub(crate) fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Solver { source, .. } => match source {
            SolverError::BrowserNotFound { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            SolverError::Blocked { .. } | SolverError::RiskControl { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            SolverError::CommandTimeout { .. }
            | SolverError::Navigation { .. }
            | SolverError::ChallengeTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::BAD_GATEWAY,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
