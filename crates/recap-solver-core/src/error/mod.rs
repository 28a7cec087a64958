use error_location::ErrorLocation;
use thiserror::Error;

/// Challenge-solving errors with source location tracking.
#[derive(Error, Debug)]
pub enum SolverError {
    /// Chromium executable could not be found on this machine.
    #[error("No Chromium executable found {location}")]
    BrowserNotFound {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Browser process launch or DevTools attachment failed.
    #[error("Browser error: {reason} {location}")]
    Browser {
        /// Description of the browser failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The DevTools endpoint rejected a protocol command.
    #[error("DevTools protocol error: {reason} {location}")]
    Protocol {
        /// Error payload returned by the browser.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A protocol command did not complete before its deadline.
    #[error("DevTools command timed out: {method} {location}")]
    CommandTimeout {
        /// Protocol method that timed out.
        method: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Page navigation failed or never fired its load event.
    #[error("Navigation failed for {url}: {reason} {location}")]
    Navigation {
        /// Target URL of the navigation.
        url: String,
        /// Description of the navigation failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An expected iframe never produced an execution context.
    #[error("Frame not found: {url_fragment} {location}")]
    FrameNotFound {
        /// URL fragment the frame was matched against.
        url_fragment: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// An expected DOM element is missing.
    #[error("Element not found: {selector} {location}")]
    ElementNotFound {
        /// CSS selector of the missing element.
        selector: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The widget rate-limited this client ("Try again later").
    #[error("Blocked by the challenge provider: {reason} {location}")]
    Blocked {
        /// Header text shown by the widget.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The widget withheld the audio source; the session is burned.
    #[error("Trapped in risk control: {reason} {location}")]
    RiskControl {
        /// Description of the risk-control state.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The answer could not be submitted within the challenge window.
    #[error("Challenge submission timed out {location}")]
    ChallengeTimeout {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// HTTP request to an external service failed.
    #[error("HTTP request failed: {source} {location}")]
    Http {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Downloaded asset was rejected before decoding.
    #[error("Asset download failed: {reason} {location}")]
    Download {
        /// Description of the download failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Compressed audio could not be decoded to PCM.
    #[error("Audio decode failed: {reason} {location}")]
    Decode {
        /// Description of the decode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// PCM could not be encoded for the challenge cache.
    #[error("Audio encode failed: {reason} {location}")]
    Encode {
        /// Description of the encode failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Audio resampling failed.
    #[error("Resampling error: {reason} {location}")]
    Resampling {
        /// Description of the resampling error.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The speech API failed or returned an unusable payload.
    #[error("Speech recognition failed: {reason} {location}")]
    Recognition {
        /// Description of the recognition failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The speech API returned no transcript for the prompt.
    #[error("Speech API returned an empty transcript {location}")]
    EmptyTranscript {
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// IO error from filesystem operations.
    #[error("IO error: {source} {location}")]
    Io {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

// Manual From impls with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<reqwest::Error> for SolverError {
    #[track_caller]
    fn from(source: reqwest::Error) -> Self {
        SolverError::Http {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

impl From<std::io::Error> for SolverError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        SolverError::Io {
            source,
            location: ErrorLocation::from(std::panic::Location::caller()),
        }
    }
}

/// Result type alias using [`SolverError`].
pub type Result<T> = std::result::Result<T, SolverError>;
