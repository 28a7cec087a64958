use crate::{
    AssetFetcher, AudioChallenger, ChallengeOutcome, CoreResult, SolverError, SpeechRecognizer,
    cdp::{CdpTransport, Page},
    tests::support::{ScriptedTransport, context_created, frame_navigated, value_reply},
};

use std::{fs, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Value, json};
use tempfile::tempdir;

struct FixedRecognizer;

#[async_trait]
impl SpeechRecognizer for FixedRecognizer {
    async fn recognize(&self, _samples: &[f32]) -> CoreResult<String> {
        Ok("seven two four".to_string())
    }
}

fn challenger(cache_dir: std::path::PathBuf) -> AudioChallenger {
    AudioChallenger::new(
        cache_dir,
        Arc::new(FixedRecognizer),
        AssetFetcher::new(Duration::from_secs(5)).unwrap(),
    )
    .with_settle_delay(Duration::ZERO)
}

/// Attach a page over `transport` and announce the anchor and bframe
/// iframes on the event bus.
async fn page_with_frames(transport: &Arc<ScriptedTransport>) -> Page {
    let page = Page::attach(
        Arc::clone(transport) as Arc<dyn CdpTransport>,
        "S1".to_string(),
    )
    .await
    .unwrap();

    let _ = transport.events.send(frame_navigated(
        "F1",
        "https://host/recaptcha/api2/anchor?k=x",
        "S1",
    ));
    let _ = transport.events.send(context_created("F1", 11, "S1"));
    let _ = transport.events.send(frame_navigated(
        "F2",
        "https://host/recaptcha/api2/bframe?k=x",
        "S1",
    ));
    let _ = transport.events.send(context_created("F2", 12, "S1"));
    // Let the tracker task drain the bus.
    tokio::time::sleep(Duration::from_millis(50)).await;

    page
}

/// WHAT: A token right after activation ends the run as a pass
/// WHY: Some sites accept the checkbox alone; no audio work should happen
#[tokio::test(start_paused = true)]
async fn given_token_after_activation_when_solving_then_early_success_and_cache_cleared() {
    // Given: A widget that issues a token on the checkbox click
    let transport = ScriptedTransport::new(vec![
        Ok(Value::Null),                  // Page.enable
        Ok(Value::Null),                  // Runtime.enable
        value_reply(json!(true)),         // checkbox present
        value_reply(json!(true)),         // checkbox clicked
        value_reply(json!("early-token")), // grecaptcha.getResponse()
    ]);
    let page = page_with_frames(&transport).await;

    let dir = tempdir().unwrap();
    let stale_wav = dir.path().join("audio_1700000000.wav");
    fs::write(&stale_wav, b"RIFF").unwrap();

    // When: Solving
    let outcome = challenger(dir.path().to_path_buf())
        .solve(&page)
        .await
        .unwrap();

    // Then: The token comes back and the cached audio is gone
    assert_eq!(
        outcome,
        ChallengeOutcome::Success {
            token: "early-token".to_string()
        }
    );
    assert!(!stale_wav.exists());
}

/// WHAT: The rate-limit header ends the run with a blocked error
/// WHY: Retrying against "Try again later" only digs the hole deeper
#[tokio::test(start_paused = true)]
async fn given_rate_limit_header_when_solving_then_blocked_error() {
    // Given: A widget showing the rate-limit header in the challenge frame
    let transport = ScriptedTransport::new(vec![
        Ok(Value::Null),
        Ok(Value::Null),
        value_reply(json!(true)),  // checkbox present
        value_reply(json!(true)),  // checkbox clicked
        value_reply(json!("")),    // no token yet
        value_reply(json!(true)),  // audio button present
        value_reply(json!(true)),  // audio button clicked
        value_reply(json!("Try again later")), // rate-limit header text
    ]);
    let page = page_with_frames(&transport).await;
    let dir = tempdir().unwrap();

    // When: Solving
    let result = challenger(dir.path().to_path_buf()).solve(&page).await;

    // Then: The run fails as blocked
    assert!(matches!(result, Err(SolverError::Blocked { .. })));
}

/// WHAT: A withheld audio source ends the run as risk control
/// WHY: A session the widget distrusts never produces a prompt
#[tokio::test(start_paused = true)]
async fn given_missing_audio_source_when_solving_then_risk_control_error() {
    // Given: Five attempts where the source element never gets a src
    let mut replies = vec![
        Ok(Value::Null),
        Ok(Value::Null),
        value_reply(json!(true)), // checkbox present
        value_reply(json!(true)), // checkbox clicked
        value_reply(json!("")),   // no token yet
        value_reply(json!(true)), // audio button present
        value_reply(json!(true)), // audio button clicked
    ];
    for _ in 0..5 {
        replies.push(value_reply(Value::Null)); // no rate-limit header
        replies.push(value_reply(json!(false))); // play button missing
        replies.push(value_reply(Value::Null)); // no src attribute
    }
    let transport = ScriptedTransport::new(replies);
    let page = page_with_frames(&transport).await;
    let dir = tempdir().unwrap();

    // When: Solving
    let result = challenger(dir.path().to_path_buf()).solve(&page).await;

    // Then: The run fails as risk control
    assert!(matches!(result, Err(SolverError::RiskControl { .. })));
}

/// WHAT: An error message after submission means retry
/// WHY: A rejected answer is recoverable with a fresh prompt
#[tokio::test]
async fn given_error_message_when_verifying_then_retry() {
    // Given: The challenge frame shows a rejection message
    let transport = ScriptedTransport::new(vec![
        Ok(Value::Null),
        Ok(Value::Null),
        value_reply(json!(" Multiple correct solutions required. ")),
    ]);
    let page = page_with_frames(&transport).await;
    let dir = tempdir().unwrap();

    // When: Verifying the submission
    let outcome = challenger(dir.path().to_path_buf())
        .verify(&page)
        .await
        .unwrap();

    // Then: The outcome asks for a retry
    assert_eq!(outcome, ChallengeOutcome::Retry);
}

/// WHAT: No message and no token means the widget wants more
/// WHY: Continue must stay distinct from a pass
#[tokio::test]
async fn given_no_token_when_verifying_then_continue() {
    let transport = ScriptedTransport::new(vec![
        Ok(Value::Null),
        Ok(Value::Null),
        value_reply(Value::Null), // no error message
        value_reply(json!("")),   // empty token
    ]);
    let page = page_with_frames(&transport).await;
    let dir = tempdir().unwrap();

    let outcome = challenger(dir.path().to_path_buf())
        .verify(&page)
        .await
        .unwrap();

    assert_eq!(outcome, ChallengeOutcome::Continue);
}

/// WHAT: A token after submission is a pass and clears the cache
/// WHY: The caller gets the token; the WAV prompt has served its purpose
#[tokio::test]
async fn given_token_when_verifying_then_success_and_cache_cleared() {
    // Given: A clean verify with a token and a cached prompt on disk
    let transport = ScriptedTransport::new(vec![
        Ok(Value::Null),
        Ok(Value::Null),
        value_reply(Value::Null),        // no error message
        value_reply(json!("solved-token")), // token issued
    ]);
    let page = page_with_frames(&transport).await;

    let dir = tempdir().unwrap();
    let cached_wav = dir.path().join("audio_1700000001.wav");
    fs::write(&cached_wav, b"RIFF").unwrap();

    // When: Verifying the submission
    let outcome = challenger(dir.path().to_path_buf())
        .verify(&page)
        .await
        .unwrap();

    // Then: Success carries the token and the cache is empty
    assert_eq!(
        outcome,
        ChallengeOutcome::Success {
            token: "solved-token".to_string()
        }
    );
    assert!(!cached_wav.exists());
}

/// WHAT: Cache cleanup removes WAV prompts and nothing else
/// WHY: A passed run must not leave audio behind, or eat unrelated files
#[tokio::test]
async fn given_cached_files_when_cleaning_then_only_wav_removed() {
    // Given: A cache dir with a WAV prompt and an unrelated file
    let dir = tempdir().unwrap();
    let wav = dir.path().join("audio_1700000000.wav");
    let note = dir.path().join("notes.txt");
    fs::write(&wav, b"RIFF").unwrap();
    fs::write(&note, b"keep me").unwrap();

    // When: Cleaning the cache
    challenger(dir.path().to_path_buf()).cleanup_cached_audio().await;

    // Then: The WAV is gone, the unrelated file survives
    assert!(!wav.exists());
    assert!(note.exists());
}

/// WHAT: Cleanup of a missing cache dir is a no-op
/// WHY: The first run may fail before anything was cached
#[tokio::test]
async fn given_missing_cache_dir_when_cleaning_then_no_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("never-created");

    // Should simply return.
    challenger(missing).cleanup_cached_audio().await;
}

/// WHAT: Screenshot paths land next to the cache dir with a labeled name
/// WHY: Failed runs are diagnosed from these files
#[test]
fn given_label_when_building_screenshot_path_then_sibling_dir_and_label_used() {
    // Given: A challenger caching under <base>/audio
    let dir = tempdir().unwrap();
    let cache = dir.path().join("audio");
    let challenger = challenger(cache);

    // When: Building a screenshot path
    let path = challenger.screenshot_path("rate-limited");

    // Then: It lives in <base>/captcha_screenshot/<ts>.rate-limited.png
    assert_eq!(
        path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()),
        Some("captcha_screenshot")
    );
    let name = path.file_name().and_then(|n| n.to_str()).unwrap();
    assert!(name.ends_with(".rate-limited.png"), "unexpected name: {name}");
}
