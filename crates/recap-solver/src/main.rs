//! Recap-Solver: HTTP service that passes reCAPTCHA audio challenges.

mod config;
mod error;
mod server;

pub(crate) use error::{AppError, Result as AppResult};

use crate::{config::Config, server::AppState};

use std::{env, panic::Location, process, sync::Arc};

use error_location::ErrorLocation;
use tracing::{error, info};

/// Application entry point.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("recap_solver=debug,recap_solver_core=debug")
        .init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            process::exit(1);
        }
    };

    let api_key = match resolve_api_key(&config) {
        Ok(key) => key,
        Err(e) => {
            error!("Failed to resolve API key: {:?}", e);
            process::exit(1);
        }
    };

    if let Err(e) = serve(config, api_key).await {
        error!("Server error: {:?}", e);
        process::exit(1);
    }
}

/// Read the speech API key from the environment variable the config names.
///
/// The key never lives in the config file itself.
#[track_caller]
fn resolve_api_key(config: &Config) -> AppResult<String> {
    match env::var(&config.speech.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(AppError::MissingApiKey {
            variable: config.speech.api_key_env.clone(),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}

/// Bind the listener and run the HTTP surface until shutdown.
async fn serve(config: Config, api_key: String) -> AppResult<()> {
    let port = config.server.port;
    let state = Arc::new(AppState::new(config, api_key));
    let router = server::router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Failed to bind port {}: {}", port, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

    info!(port, "Listening for solve requests");

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::ServerError {
            reason: format!("Serve loop failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })
}
