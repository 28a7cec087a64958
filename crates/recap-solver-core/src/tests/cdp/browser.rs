use crate::{Browser, BrowserConfig, cdp::browser::ws_url_from_active_port};

/// WHAT: A well-formed DevToolsActivePort file yields the WebSocket URL
/// WHY: Endpoint discovery is the only handshake with the launched process
#[test]
fn given_active_port_file_when_parsing_then_ws_url_built() {
    // Given: Port on the first line, browser target path on the second
    let contents = "37245\n/devtools/browser/0b4f9de2-8b41-4b52-b34c-ba520346f56c\n";

    // When: Parsing the file contents
    let ws_url = ws_url_from_active_port(contents);

    // Then: URL points at the local debugger
    assert_eq!(
        ws_url.as_deref(),
        Some("ws://127.0.0.1:37245/devtools/browser/0b4f9de2-8b41-4b52-b34c-ba520346f56c")
    );
}

/// WHAT: A file without the target path is rejected
/// WHY: Chromium writes the file in two steps; a half-written file must not connect
#[test]
fn given_port_without_path_when_parsing_then_none() {
    assert_eq!(ws_url_from_active_port("37245\n"), None);
    assert_eq!(ws_url_from_active_port("37245\n\n"), None);
}

/// WHAT: Garbage contents are rejected
/// WHY: Stale profile dirs can carry junk
#[test]
fn given_garbage_when_parsing_then_none() {
    assert_eq!(ws_url_from_active_port(""), None);
    assert_eq!(ws_url_from_active_port("not-a-port\n/devtools/browser/x"), None);
}

/// WHAT: A real Chromium launches, attaches a page and evaluates
/// WHY: Covers endpoint discovery and session attach against the live protocol
#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn given_installed_chromium_when_launching_then_page_evaluates() {
    // Given: A default headless launch
    let browser = Browser::launch(&BrowserConfig::default()).await.unwrap();

    // When: Opening a page and evaluating an expression
    let page = browser.new_page().await.unwrap();
    let value = page.evaluate("1 + 1").await.unwrap();

    // Then: The result comes back through the session
    assert_eq!(value, serde_json::json!(2));
    browser.close().await;
}
