use recap_solver_core::SolverError;

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Application-level errors for the recap-solver binary.
///
/// All variants include `ErrorLocation` for call-site tracking.
#[derive(Error, Debug)]
pub enum AppError {
    /// Solver error from recap-solver-core.
    #[error("Solver error: {source} {location}")]
    Solver {
        /// The underlying solver error.
        #[source]
        source: SolverError,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Configuration loading or saving error.
    #[error("Configuration error: {reason} {location}")]
    ConfigError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// The speech API key environment variable is unset or empty.
    #[error("Speech API key not found in environment variable {variable} {location}")]
    MissingApiKey {
        /// Name of the environment variable that was consulted.
        variable: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// Failed to bind or run the HTTP listener.
    #[error("Server error: {reason} {location}")]
    ServerError {
        /// Human-readable reason for failure.
        reason: String,
        /// Location where this error was created.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    IoError {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Location where this error was created.
        location: ErrorLocation,
    },
}

// Manual From<SolverError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<SolverError> for AppError {
    #[track_caller]
    fn from(source: SolverError) -> Self {
        AppError::Solver {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for AppError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        AppError::IoError {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Convenience type alias for Results using `AppError`.
pub type Result<T> = StdResult<T, AppError>;
