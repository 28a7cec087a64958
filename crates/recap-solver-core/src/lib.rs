//! Recap-solver Core Library
//!
//! Drives a headless Chromium through the reCAPTCHA audio challenge:
//! activate the widget, switch to the audio mode, download and transcode
//! the spoken prompt, transcribe it with a cloud speech API, submit the
//! answer and collect the verification token.
//!
//! # Example
//!
//! ```no_run
//! use recap_solver_core::{
//!     AssetFetcher, AudioChallenger, Browser, BrowserConfig, ChallengeOutcome,
//!     CoreResult, GoogleRecognizer, SpeechConfig,
//! };
//!
//! use std::{path::PathBuf, sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let browser = Browser::launch(&BrowserConfig::default()).await?;
//!     let page = browser.new_page().await?;
//!     page.navigate("https://example.com/signup", Duration::from_secs(30))
//!         .await?;
//!
//!     let recognizer = GoogleRecognizer::new(SpeechConfig::new("api-key"))?;
//!     let challenger = AudioChallenger::new(
//!         PathBuf::from("/tmp/challenge-cache"),
//!         Arc::new(recognizer),
//!         AssetFetcher::new(Duration::from_secs(30))?,
//!     );
//!
//!     match challenger.solve(&page).await? {
//!         ChallengeOutcome::Success { token } => println!("token: {token}"),
//!         other => println!("challenge did not pass: {}", other.as_str()),
//!     }
//!     Ok(())
//! }
//! ```

mod asset;
mod audio;
mod cdp;
mod challenge;
mod error;
mod speech;

pub use {
    asset::AssetFetcher,
    audio::{DecodedAudio, Resampler, decode_to_pcm, encode_wav, pcm_to_linear16},
    cdp::{Browser, BrowserConfig, CdpEvent, CdpTransport, FrameHandle, Page, WsTransport},
    challenge::{AudioChallenger, ChallengeOutcome},
    error::{Result as CoreResult, SolverError},
    speech::{GoogleRecognizer, SpeechConfig, SpeechRecognizer},
};

#[cfg(test)]
mod tests;
