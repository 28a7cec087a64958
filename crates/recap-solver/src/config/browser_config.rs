use crate::config::{default_headless, default_navigation_timeout_ms};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Browser launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chromium executable path; auto-detected when absent.
    #[serde(default)]
    pub executable: Option<PathBuf>,
    /// Whether to launch without a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// Page navigation deadline in milliseconds.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
}
