use crate::{
    CoreResult, SolverError,
    cdp::{Page, WsTransport, transport::CdpTransport},
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use error_location::ErrorLocation;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tracing::{debug, info, instrument};
use which::which;

/// Configuration for launching the browser process.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Explicit Chromium executable; discovered when `None`.
    pub executable: Option<PathBuf>,
    /// Run without a visible window.
    pub headless: bool,
    /// Deadline for individual DevTools commands.
    pub command_timeout: Duration,
    /// Deadline for the process to expose its DevTools endpoint.
    pub launch_timeout: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            command_timeout: Duration::from_secs(30),
            launch_timeout: Duration::from_secs(20),
        }
    }
}

/// A launched Chromium process plus its DevTools connection.
///
/// The profile directory is ephemeral and the child is killed when this
/// value drops, so every `/solve` request gets a clean browser.
pub struct Browser {
    transport: Arc<WsTransport>,
    child: Child,
    // Held for its Drop: removes the throwaway profile.
    _profile_dir: TempDir,
}

impl Browser {
    /// Launch a Chromium instance and attach to its DevTools endpoint.
    ///
    /// The process is started with `--remote-debugging-port=0` and the
    /// WebSocket URL is read from the `DevToolsActivePort` file in the
    /// profile directory, so concurrent launches never race on a port.
    #[instrument(skip(config))]
    pub async fn launch(config: &BrowserConfig) -> CoreResult<Self> {
        let executable = match &config.executable {
            Some(path) if path.exists() => path.clone(),
            _ => detect_chromium_executable().ok_or(SolverError::BrowserNotFound {
                location: ErrorLocation::from(Location::caller()),
            })?,
        };

        let profile_dir = TempDir::new()?;

        let mut command = Command::new(&executable);
        command
            .arg("--remote-debugging-port=0")
            .arg(format!("--user-data-dir={}", profile_dir.path().display()))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-gpu")
            .arg("--mute-audio")
            .arg("--lang=en-US")
            .arg("about:blank")
            .kill_on_drop(true)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        if config.headless {
            command.arg("--headless=new");
        }

        let child = command.spawn().map_err(|e| SolverError::Browser {
            reason: format!("Failed to spawn {:?}: {}", executable, e),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let ws_url = wait_for_debugger_url(profile_dir.path(), config.launch_timeout).await?;
        debug!(ws_url = %ws_url, "DevTools endpoint discovered");

        let transport = Arc::new(WsTransport::connect(&ws_url, config.command_timeout).await?);

        info!(executable = ?executable, headless = config.headless, "Browser launched");

        Ok(Self {
            transport,
            child,
            _profile_dir: profile_dir,
        })
    }

    /// Create a fresh page target and attach a session to it.
    #[instrument(skip(self))]
    pub async fn new_page(&self) -> CoreResult<Page> {
        let created = self
            .transport
            .send_command(None, "Target.createTarget", json!({ "url": "about:blank" }))
            .await?;
        let target_id = created
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| SolverError::Protocol {
                reason: "Target.createTarget returned no targetId".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let attached = self
            .transport
            .send_command(
                None,
                "Target.attachToTarget",
                json!({ "targetId": target_id, "flatten": true }),
            )
            .await?;
        let session_id = attached
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SolverError::Protocol {
                reason: "Target.attachToTarget returned no sessionId".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Page::attach(
            Arc::clone(&self.transport) as Arc<dyn CdpTransport>,
            session_id.to_string(),
        )
        .await
    }

    /// Ask the browser to shut down cleanly, then kill the child.
    #[instrument(skip(self))]
    pub async fn close(mut self) {
        let _ = self
            .transport
            .send_command(None, "Browser.close", json!({}))
            .await;
        let _ = self.child.kill().await;
    }
}

/// Wait for Chromium to write its `DevToolsActivePort` file.
async fn wait_for_debugger_url(profile_dir: &std::path::Path, deadline: Duration) -> CoreResult<String> {
    let marker = profile_dir.join("DevToolsActivePort");
    let started = Instant::now();

    while started.elapsed() < deadline {
        if let Ok(contents) = tokio::fs::read_to_string(&marker).await {
            if let Some(ws_url) = ws_url_from_active_port(&contents) {
                return Ok(ws_url);
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    Err(SolverError::Browser {
        reason: format!(
            "Browser did not expose DevTools within {:?}",
            deadline
        ),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Parse a `DevToolsActivePort` file: first line is the port, second the
/// browser target path.
pub(crate) fn ws_url_from_active_port(contents: &str) -> Option<String> {
    let mut lines = contents.lines();
    let port: u16 = lines.next()?.trim().parse().ok()?;
    let path = lines.next()?.trim();
    if path.is_empty() {
        return None;
    }
    Some(format!("ws://127.0.0.1:{}{}", port, path))
}

/// Locate a Chromium-family executable on this machine.
pub(crate) fn detect_chromium_executable() -> Option<PathBuf> {
    for name in chromium_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }

    os_specific_chromium_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chromium_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(any(target_os = "macos", target_os = "linux", target_os = "freebsd"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }

    #[cfg(not(any(
        target_os = "windows",
        target_os = "macos",
        target_os = "linux",
        target_os = "freebsd"
    )))]
    {
        &["chrome"]
    }
}

fn os_specific_chromium_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(any(target_os = "linux", target_os = "freebsd"))]
    {
        vec![
            PathBuf::from("/usr/bin/google-chrome-stable"),
            PathBuf::from("/usr/bin/google-chrome"),
            PathBuf::from("/usr/bin/chromium-browser"),
            PathBuf::from("/usr/bin/chromium"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "freebsd")))]
    {
        Vec::new()
    }
}
