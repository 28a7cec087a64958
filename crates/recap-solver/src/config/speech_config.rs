use crate::config::{default_api_key_env, default_language};

use serde::{Deserialize, Serialize};

/// Speech recognition configuration.
///
/// The API key itself never lives in the config file; only the name of
/// the environment variable that holds it does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Environment variable holding the speech API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// BCP-47 language code of the audio prompts.
    #[serde(default = "default_language")]
    pub language: String,
}
