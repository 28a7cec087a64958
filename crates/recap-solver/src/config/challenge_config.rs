use crate::config::default_settle_delay_ms;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Challenge flow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Directory for transcoded audio prompts; platform cache dir when absent.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Pause after activating the checkbox, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}
