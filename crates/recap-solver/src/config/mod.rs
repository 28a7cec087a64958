mod browser_config;
mod challenge_config;
#[allow(clippy::module_inception)]
mod config;
mod server_config;
mod speech_config;

pub(crate) use {
    browser_config::BrowserConfig, challenge_config::ChallengeConfig, config::Config,
    server_config::ServerConfig, speech_config::SpeechConfig,
};

pub(crate) const DEFAULT_PORT: u16 = 5000;
pub(crate) const DEFAULT_HEADLESS: bool = true;
pub(crate) const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_API_KEY_ENV: &str = "GOOGLE_SPEECH_API_KEY";
pub(crate) const DEFAULT_LANGUAGE: &str = "en-US";
pub(crate) const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

pub(crate) fn default_port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn default_headless() -> bool {
    DEFAULT_HEADLESS
}

pub(crate) fn default_navigation_timeout_ms() -> u64 {
    DEFAULT_NAVIGATION_TIMEOUT_MS
}

pub(crate) fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

pub(crate) fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

pub(crate) fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}
