//! Configuration management for recap-solver.
//!
//! Handles loading and saving TOML configuration files with cross-platform
//! paths, defaults on first run, and atomic write operations.

use crate::{
    AppError, AppResult,
    config::{
        BrowserConfig, ChallengeConfig, DEFAULT_API_KEY_ENV, DEFAULT_HEADLESS, DEFAULT_LANGUAGE,
        DEFAULT_NAVIGATION_TIMEOUT_MS, DEFAULT_PORT, DEFAULT_SETTLE_DELAY_MS, ServerConfig,
        SpeechConfig,
    },
};

use std::{fs, io::Write, panic::Location, path::PathBuf};

use directories::ProjectDirs;
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Browser launch settings.
    pub browser: BrowserConfig,
    /// Speech recognition settings.
    pub speech: SpeechConfig,
    /// Challenge flow settings.
    pub challenge: ChallengeConfig,
}

impl Config {
    /// Load configuration from disk, creating default if not found.
    ///
    /// Note: This does NOT check that the speech API key is set. The key
    /// is read from the environment at startup, after the config names
    /// the variable to consult.
    #[track_caller]
    #[instrument]
    pub fn load() -> AppResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to read config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            let config: Config = toml::from_str(&contents).map_err(|e| AppError::ConfigError {
                reason: format!("Failed to parse config: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

            info!(config_path = ?config_path, "Configuration loaded");

            Ok(config)
        } else {
            info!("No config found, creating default");
            Self::create_default()
        }
    }

    /// Save configuration to disk using atomic write pattern.
    ///
    /// Writes to a temporary file first, then renames to prevent corruption
    /// if the process crashes during the write.
    #[track_caller]
    #[instrument]
    pub fn save(&self) -> AppResult<()> {
        let config_path = Self::config_path()?;

        let contents = toml::to_string_pretty(self).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        // Atomic write: write to temp file then rename
        let temp_path = config_path.with_extension("toml.tmp");

        let mut temp_file = fs::File::create(&temp_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to create temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        temp_file
            .write_all(contents.as_bytes())
            .map_err(|e| AppError::ConfigError {
                reason: format!("Failed to write temp config file: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        temp_file.sync_all().map_err(|e| AppError::ConfigError {
            reason: format!("Failed to sync temp config file: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::rename(&temp_path, &config_path).map_err(|e| AppError::ConfigError {
            reason: format!("Failed to rename temp config to final: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        info!(config_path = ?config_path, "Configuration saved (atomic write)");

        Ok(())
    }

    /// Directory where transcoded audio prompts are cached.
    ///
    /// The configured override wins; otherwise a subdirectory of the
    /// platform cache directory is used.
    #[track_caller]
    pub fn cache_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = &self.challenge.cache_dir {
            return Ok(dir.clone());
        }

        let proj_dirs = Self::project_dirs()?;
        Ok(proj_dirs.cache_dir().join("audio"))
    }

    #[track_caller]
    fn project_dirs() -> AppResult<ProjectDirs> {
        ProjectDirs::from("com", "recap-solver", "Recap-Solver").ok_or_else(|| {
            AppError::ConfigError {
                reason: "Failed to get project directories".to_string(),
                location: ErrorLocation::from(Location::caller()),
            }
        })
    }

    #[track_caller]
    fn config_path() -> AppResult<PathBuf> {
        let proj_dirs = Self::project_dirs()?;

        let config_dir = proj_dirs.config_dir();

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
            debug!(config_dir = ?config_dir, "Created config directory");
        }

        Ok(config_dir.join("config.toml"))
    }

    #[track_caller]
    fn create_default() -> AppResult<Self> {
        let config = Config {
            server: ServerConfig { port: DEFAULT_PORT },
            browser: BrowserConfig {
                executable: None,
                headless: DEFAULT_HEADLESS,
                navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            },
            speech: SpeechConfig {
                api_key_env: DEFAULT_API_KEY_ENV.to_string(),
                language: DEFAULT_LANGUAGE.to_string(),
            },
            challenge: ChallengeConfig {
                cache_dir: None,
                settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            },
        };

        config.save()?;

        info!(
            api_key_env = DEFAULT_API_KEY_ENV,
            "Default config created. The speech API key is read from the environment."
        );

        Ok(config)
    }
}
