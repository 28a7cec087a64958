use crate::{
    AssetFetcher, CoreResult, SolverError,
    audio::{RECOGNITION_SAMPLE_RATE, Resampler, decode_to_pcm, encode_wav},
    cdp::Page,
    challenge::ChallengeOutcome,
    speech::SpeechRecognizer,
};

use std::{
    panic::Location,
    path::PathBuf,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use error_location::ErrorLocation;
use tracing::{debug, info, instrument, warn};

// The anchor iframe hosts the checkbox; the bframe hosts the challenge.
const ANCHOR_FRAME: &str = "api2/anchor";
const CHALLENGE_FRAME: &str = "bframe";

const CHECKBOX: &str = ".recaptcha-checkbox-border";
const AUDIO_BUTTON: &str = "#recaptcha-audio-button";
const PLAY_BUTTON: &str = "button[aria-labelledby]";
const AUDIO_SOURCE: &str = "#audio-source";
const ANSWER_INPUT: &str = "#audio-response";
const ERROR_MESSAGE: &str = ".rc-audiochallenge-error-message";
const RATE_LIMIT_HEADER: &str = ".rc-doscaptcha-header-text";

const ELEMENT_WAIT: Duration = Duration::from_secs(10);
const AUDIO_SOURCE_ATTEMPTS: u32 = 5;

/// Drives the audio variant of the challenge widget end to end.
///
/// Owns the pieces the flow needs — the asset fetcher, the speech
/// recognizer and a cache directory for transcoded prompts — and
/// sequences: activate → switch mode → fetch audio → transcode →
/// transcribe → submit → verify.
pub struct AudioChallenger {
    cache_dir: PathBuf,
    recognizer: Arc<dyn SpeechRecognizer>,
    fetcher: AssetFetcher,
    settle_delay: Duration,
}

impl AudioChallenger {
    /// Create a challenger writing transcoded prompts under `cache_dir`.
    pub fn new(
        cache_dir: PathBuf,
        recognizer: Arc<dyn SpeechRecognizer>,
        fetcher: AssetFetcher,
    ) -> Self {
        Self {
            cache_dir,
            recognizer,
            fetcher,
            settle_delay: Duration::from_millis(500),
        }
    }

    /// Override the pause after activating the checkbox.
    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Run the whole challenge against an already-navigated page.
    #[instrument(skip(self, page))]
    pub async fn solve(&self, page: &Page) -> CoreResult<ChallengeOutcome> {
        self.activate_widget(page).await?;

        // Some sites pass on the checkbox alone.
        if let Some(token) = self.current_token(page).await? {
            info!("Challenge passed on activation");
            self.cleanup_cached_audio().await;
            return Ok(ChallengeOutcome::Success { token });
        }

        self.switch_to_audio(page).await?;

        let audio_url = self.audio_source_url(page).await?;
        let samples = self.fetch_and_transcode(&audio_url).await?;
        let answer = self.recognizer.recognize(&samples).await?;
        info!(text_len = answer.len(), "Prompt transcribed");

        self.submit_answer(page, &answer).await?;
        self.verify(page).await
    }

    /// Click the checkbox in the anchor iframe.
    #[instrument(skip(self, page))]
    async fn activate_widget(&self, page: &Page) -> CoreResult<()> {
        let anchor = page.frame(ANCHOR_FRAME);
        anchor.wait_for(CHECKBOX, ELEMENT_WAIT).await?;
        anchor.click(CHECKBOX).await?;
        debug!("Widget activated");

        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    /// Token already issued by the widget, if any.
    async fn current_token(&self, page: &Page) -> CoreResult<Option<String>> {
        let value = page
            .evaluate(
                "typeof grecaptcha !== 'undefined' ? grecaptcha.getResponse() : ''",
            )
            .await?;
        Ok(value
            .as_str()
            .filter(|token| !token.is_empty())
            .map(str::to_string))
    }

    /// Switch the widget from the image grid to the audio prompt.
    #[instrument(skip(self, page))]
    async fn switch_to_audio(&self, page: &Page) -> CoreResult<()> {
        let challenge = page.frame(CHALLENGE_FRAME);
        challenge.wait_for(AUDIO_BUTTON, ELEMENT_WAIT).await?;
        challenge.click(AUDIO_BUTTON).await?;
        info!("Audio challenge accepted");
        Ok(())
    }

    /// Find the download URL of the spoken prompt.
    ///
    /// Presses play and reads `#audio-source`'s `src`, retrying a few
    /// times; the widget withholding the source means the session is
    /// burned by risk control, and the rate-limit header ends the run
    /// immediately.
    #[instrument(skip(self, page))]
    async fn audio_source_url(&self, page: &Page) -> CoreResult<String> {
        let challenge = page.frame(CHALLENGE_FRAME);

        for attempt in 1..=AUDIO_SOURCE_ATTEMPTS {
            if let Some(header) = challenge.text_content(RATE_LIMIT_HEADER).await? {
                if header.contains("Try again later") {
                    self.capture_screenshot(page, "rate-limited").await;
                    return Err(SolverError::Blocked {
                        reason: header.trim().to_string(),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }

            // Play is best-effort; the source element matters.
            if challenge.click(PLAY_BUTTON).await.is_ok() {
                debug!(attempt, "Play challenge audio");
            }

            if let Some(src) = challenge.attribute(AUDIO_SOURCE, "src").await? {
                if !src.is_empty() {
                    return Ok(src);
                }
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        self.capture_screenshot(page, "risk-control").await;
        Err(SolverError::RiskControl {
            reason: "audio source never appeared".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Download the prompt and transcode it to 16 kHz mono PCM.
    ///
    /// A WAV copy is kept in the challenge cache until the run passes.
    #[instrument(skip(self, audio_url))]
    async fn fetch_and_transcode(&self, audio_url: &str) -> CoreResult<Vec<f32>> {
        info!("Downloading challenge audio");
        let bytes = self.fetcher.fetch(audio_url).await?;

        info!("Audio transcoding MP3 --> 16kHz PCM");
        let samples = tokio::task::spawn_blocking(move || -> CoreResult<Vec<f32>> {
            let decoded = decode_to_pcm(&bytes)?;
            if decoded.sample_rate == RECOGNITION_SAMPLE_RATE {
                return Ok(decoded.samples);
            }
            let mut resampler = Resampler::new(decoded.sample_rate, RECOGNITION_SAMPLE_RATE)?;
            resampler.resample(&decoded.samples)
        })
        .await
        .map_err(|e| SolverError::Decode {
            reason: format!("transcode task failed: {}", e),
            location: ErrorLocation::from(Location::caller()),
        })??;

        let wav = encode_wav(&samples, RECOGNITION_SAMPLE_RATE)?;
        let wav_path = self
            .cache_dir
            .join(format!("audio_{}.wav", unix_timestamp()));
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::write(&wav_path, wav).await?;
        debug!(wav_path = ?wav_path, "Transcoding complete");

        Ok(samples)
    }

    /// Fill the answer box and submit with a trusted Enter keystroke.
    #[instrument(skip(self, page, answer))]
    async fn submit_answer(&self, page: &Page, answer: &str) -> CoreResult<()> {
        let challenge = page.frame(CHALLENGE_FRAME);
        challenge
            .fill(ANSWER_INPUT, &answer.to_lowercase())
            .await
            .map_err(|_| SolverError::ChallengeTimeout {
                location: ErrorLocation::from(Location::caller()),
            })?;
        page.press_enter().await?;
        info!("Submit the challenge");
        Ok(())
    }

    /// Check whether the submitted answer passed.
    #[instrument(skip(self, page))]
    pub(crate) async fn verify(&self, page: &Page) -> CoreResult<ChallengeOutcome> {
        let challenge = page.frame(CHALLENGE_FRAME);

        if let Some(message) = challenge.text_content(ERROR_MESSAGE).await? {
            let message = message.trim();
            if !message.is_empty() {
                warn!(err_message = message, "Challenge failed");
                return Ok(ChallengeOutcome::Retry);
            }
        }

        match self.current_token(page).await? {
            Some(token) => {
                info!("Challenge success");
                self.cleanup_cached_audio().await;
                Ok(ChallengeOutcome::Success { token })
            }
            None => Ok(ChallengeOutcome::Continue),
        }
    }

    /// Remove cached WAV prompts once they are no longer useful.
    pub(crate) async fn cleanup_cached_audio(&self) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.cache_dir).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "wav") {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    warn!(path = ?path, error = %e, "Failed to remove cached audio");
                }
            }
        }
    }

    /// Where a diagnostic screenshot for `label` would be written.
    pub(crate) fn screenshot_path(&self, label: &str) -> PathBuf {
        let base = self
            .cache_dir
            .parent()
            .map(|parent| parent.to_path_buf())
            .unwrap_or_else(|| self.cache_dir.clone());
        base.join("captcha_screenshot")
            .join(format!("{}.{}.png", unix_timestamp(), label))
    }

    /// Best-effort screenshot for diagnosing failed runs.
    async fn capture_screenshot(&self, page: &Page, label: &str) {
        let path = self.screenshot_path(label);
        if let Err(e) = page.screenshot(&path).await {
            warn!(error = %e, "Failed to capture challenge screenshot");
        }
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
