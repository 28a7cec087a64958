use crate::{
    CoreResult, SolverError,
    cdp::transport::{CdpEvent, CdpTransport},
};

use std::{
    collections::HashMap,
    panic::Location,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use error_location::ErrorLocation;
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, instrument, warn};

const FRAME_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frame bookkeeping built from protocol events.
///
/// `Page.frameNavigated` maps frame ids to URLs;
/// `Runtime.executionContextCreated` maps frame ids to the execution
/// context JavaScript must be evaluated in.
#[derive(Debug, Default)]
pub(crate) struct FrameTable {
    frame_urls: HashMap<String, String>,
    frame_contexts: HashMap<String, u64>,
}

impl FrameTable {
    pub(crate) fn apply(&mut self, event: &CdpEvent) {
        match event.method.as_str() {
            "Page.frameNavigated" => {
                let frame = &event.params["frame"];
                if let (Some(id), Some(url)) = (
                    frame.get("id").and_then(Value::as_str),
                    frame.get("url").and_then(Value::as_str),
                ) {
                    self.frame_urls.insert(id.to_string(), url.to_string());
                }
            }
            "Runtime.executionContextCreated" => {
                let context = &event.params["context"];
                if let (Some(context_id), Some(frame_id)) = (
                    context.get("id").and_then(Value::as_u64),
                    context
                        .pointer("/auxData/frameId")
                        .and_then(Value::as_str),
                ) {
                    // Only the default world is useful for widget scripting.
                    let is_default = context
                        .pointer("/auxData/isDefault")
                        .and_then(Value::as_bool)
                        .unwrap_or(true);
                    if is_default {
                        self.frame_contexts.insert(frame_id.to_string(), context_id);
                    }
                }
            }
            "Runtime.executionContextDestroyed" => {
                if let Some(destroyed) = event
                    .params
                    .get("executionContextId")
                    .and_then(Value::as_u64)
                {
                    self.frame_contexts.retain(|_, id| *id != destroyed);
                }
            }
            "Runtime.executionContextsCleared" => {
                self.frame_contexts.clear();
            }
            _ => {}
        }
    }

    pub(crate) fn context_for(&self, url_fragment: &str) -> Option<u64> {
        self.frame_urls
            .iter()
            .find(|(_, url)| url.contains(url_fragment))
            .and_then(|(frame_id, _)| self.frame_contexts.get(frame_id).copied())
    }
}

/// One attached page target.
///
/// Wraps a session-scoped slice of the DevTools protocol: navigation,
/// JavaScript evaluation (main frame and iframes), input dispatch,
/// screenshots and request blocking.
pub struct Page {
    transport: Arc<dyn CdpTransport>,
    session_id: String,
    frames: Arc<Mutex<FrameTable>>,
    tracker: tokio::task::JoinHandle<()>,
}

impl Drop for Page {
    fn drop(&mut self) {
        self.tracker.abort();
    }
}

impl Page {
    /// Wrap an attached session and start tracking its frames.
    #[instrument(skip(transport))]
    pub async fn attach(transport: Arc<dyn CdpTransport>, session_id: String) -> CoreResult<Self> {
        let frames = Arc::new(Mutex::new(FrameTable::default()));

        // Subscribe before enabling the domains so no event is missed.
        let mut events = transport.subscribe();
        let tracker_frames = Arc::clone(&frames);
        let tracker_session = session_id.clone();
        let tracker = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if event.session_id.as_deref() == Some(tracker_session.as_str()) {
                            tracker_frames.lock().await.apply(&event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Frame tracker lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let page = Self {
            transport,
            session_id,
            frames,
            tracker,
        };

        page.command("Page.enable", json!({})).await?;
        page.command("Runtime.enable", json!({})).await?;

        Ok(page)
    }

    async fn command(&self, method: &str, params: Value) -> CoreResult<Value> {
        self.transport
            .send_command(Some(&self.session_id), method, params)
            .await
    }

    /// Navigate and wait for the page load event.
    #[instrument(skip(self))]
    pub async fn navigate(&self, url: &str, timeout: Duration) -> CoreResult<()> {
        let mut events = self.transport.subscribe();

        let reply = self.command("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = reply.get("errorText").and_then(Value::as_str) {
            return Err(SolverError::Navigation {
                url: url.to_string(),
                reason: error_text.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SolverError::Navigation {
                    url: url.to_string(),
                    reason: "load event never fired".to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            match tokio::time::timeout(remaining, events.recv()).await {
                Ok(Ok(event)) => {
                    if event.method == "Page.loadEventFired"
                        && event.session_id.as_deref() == Some(self.session_id.as_str())
                    {
                        debug!(url, "Page loaded");
                        return Ok(());
                    }
                }
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(SolverError::Browser {
                        reason: "event bus closed during navigation".to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                Err(_) => continue,
            }
        }
    }

    /// Evaluate JavaScript in the main frame and return its value.
    #[instrument(skip(self, expression))]
    pub async fn evaluate(&self, expression: &str) -> CoreResult<Value> {
        self.evaluate_inner(None, expression).await
    }

    pub(crate) async fn evaluate_inner(
        &self,
        context_id: Option<u64>,
        expression: &str,
    ) -> CoreResult<Value> {
        let mut params = json!({
            "expression": expression,
            "returnByValue": true,
            "awaitPromise": true,
        });
        if let (Some(context), Some(map)) = (context_id, params.as_object_mut()) {
            map.insert("contextId".to_string(), json!(context));
        }

        let reply = self.command("Runtime.evaluate", params).await?;
        if let Some(exception) = reply.get("exceptionDetails") {
            return Err(SolverError::Protocol {
                reason: format!("JavaScript exception: {}", exception),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(reply
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Handle onto an iframe selected by a fragment of its URL.
    ///
    /// Resolution is lazy: the execution context is looked up on every
    /// operation, because the widget recreates its frames freely.
    pub fn frame(&self, url_fragment: &str) -> FrameHandle<'_> {
        FrameHandle {
            page: self,
            url_fragment: url_fragment.to_string(),
        }
    }

    /// Press Enter as a trusted keystroke aimed at the focused element.
    #[instrument(skip(self))]
    pub async fn press_enter(&self) -> CoreResult<()> {
        self.command(
            "Input.dispatchKeyEvent",
            json!({
                "type": "rawKeyDown",
                "windowsVirtualKeyCode": 13,
                "code": "Enter",
                "key": "Enter",
            }),
        )
        .await?;
        self.command(
            "Input.dispatchKeyEvent",
            json!({ "type": "char", "text": "\r" }),
        )
        .await?;
        self.command(
            "Input.dispatchKeyEvent",
            json!({
                "type": "keyUp",
                "windowsVirtualKeyCode": 13,
                "code": "Enter",
                "key": "Enter",
            }),
        )
        .await?;
        Ok(())
    }

    /// Capture a PNG screenshot of the page into `path`.
    #[instrument(skip(self))]
    pub async fn screenshot(&self, path: &Path) -> CoreResult<()> {
        let reply = self
            .command("Page.captureScreenshot", json!({ "format": "png" }))
            .await?;
        let data = reply
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| SolverError::Protocol {
                reason: "captureScreenshot returned no data".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })?;
        let bytes = BASE64_STANDARD
            .decode(data)
            .map_err(|e| SolverError::Protocol {
                reason: format!("screenshot payload is not base64: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await?;
        debug!(path = ?path, "Screenshot saved");
        Ok(())
    }

    /// Abort requests whose URL matches any of the given patterns.
    #[instrument(skip(self, patterns))]
    pub async fn block_urls(&self, patterns: &[&str]) -> CoreResult<()> {
        self.command("Network.enable", json!({})).await?;
        self.command("Network.setBlockedURLs", json!({ "urls": patterns }))
            .await?;
        Ok(())
    }

    async fn context_for(&self, url_fragment: &str, timeout: Duration) -> CoreResult<u64> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(context) = self.frames.lock().await.context_for(url_fragment) {
                return Ok(context);
            }
            if Instant::now() >= deadline {
                return Err(SolverError::FrameNotFound {
                    url_fragment: url_fragment.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            tokio::time::sleep(FRAME_POLL_INTERVAL).await;
        }
    }
}

/// Scoped view of one iframe, resolved by URL fragment at call time.
pub struct FrameHandle<'a> {
    page: &'a Page,
    url_fragment: String,
}

impl FrameHandle<'_> {
    /// Wait until the frame exists and `selector` matches an element.
    #[instrument(skip(self))]
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> CoreResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(SolverError::ElementNotFound {
                    selector: selector.to_string(),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
            tokio::time::sleep(FRAME_POLL_INTERVAL).await;
        }
    }

    /// Whether `selector` currently matches an element in the frame.
    pub async fn exists(&self, selector: &str) -> CoreResult<bool> {
        let expression = format!(
            "!!document.querySelector({})",
            js_quote(selector)
        );
        Ok(self.evaluate(&expression).await?.as_bool().unwrap_or(false))
    }

    /// Click the first element matching `selector`.
    #[instrument(skip(self))]
    pub async fn click(&self, selector: &str) -> CoreResult<()> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; el.click(); return true; }})()",
            sel = js_quote(selector)
        );
        if self.evaluate(&expression).await?.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SolverError::ElementNotFound {
                selector: selector.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    /// Text content of the first matching element, if any.
    pub async fn text_content(&self, selector: &str) -> CoreResult<Option<String>> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return el ? el.textContent : null; }})()",
            sel = js_quote(selector)
        );
        Ok(self
            .evaluate(&expression)
            .await?
            .as_str()
            .map(str::to_string))
    }

    /// Attribute value of the first matching element, if any.
    pub async fn attribute(&self, selector: &str, name: &str) -> CoreResult<Option<String>> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             return el ? el.getAttribute({name}) : null; }})()",
            sel = js_quote(selector),
            name = js_quote(name)
        );
        Ok(self
            .evaluate(&expression)
            .await?
            .as_str()
            .map(str::to_string))
    }

    /// Focus the element matching `selector` and replace its value.
    #[instrument(skip(self, text))]
    pub async fn fill(&self, selector: &str, text: &str) -> CoreResult<()> {
        let expression = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; el.focus(); el.value = {text}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            sel = js_quote(selector),
            text = js_quote(text)
        );
        if self.evaluate(&expression).await?.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(SolverError::ElementNotFound {
                selector: selector.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
        }
    }

    async fn evaluate(&self, expression: &str) -> CoreResult<Value> {
        let context = self
            .page
            .context_for(&self.url_fragment, Duration::from_secs(10))
            .await?;
        self.page.evaluate_inner(Some(context), expression).await
    }
}

/// Quote a string as a JavaScript string literal.
pub(crate) fn js_quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
