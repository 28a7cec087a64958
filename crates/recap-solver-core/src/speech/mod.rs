//! Speech-to-text client for the challenge prompt.
//!
//! The recognizer is an opaque cloud service behind [`SpeechRecognizer`];
//! [`GoogleRecognizer`] is the REST implementation used in production.

pub(crate) mod google;

use crate::CoreResult;

use async_trait::async_trait;

pub use google::{GoogleRecognizer, SpeechConfig};

/// Seam over the speech-recognition service.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe 16 kHz mono f32 PCM into text.
    async fn recognize(&self, samples: &[f32]) -> CoreResult<String>;
}
