use crate::{
    CoreResult, SolverError,
    audio::{RECOGNITION_SAMPLE_RATE, pcm_to_linear16},
    speech::SpeechRecognizer,
};

use std::{panic::Location, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_ENDPOINT: &str = "https://speech.googleapis.com/v1/speech:recognize";
const DEFAULT_LANGUAGE: &str = "en-US";

/// Settings for the Google Cloud Speech-to-Text client.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// API key passed as the `key` query parameter.
    pub api_key: String,
    /// BCP-47 language code of the prompt.
    pub language: String,
    /// Recognition endpoint; overridable for testing.
    pub endpoint: String,
    /// Request deadline.
    pub timeout: Duration,
}

impl SpeechConfig {
    /// Config with the production endpoint and `en-US` prompts.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognizeRequest {
    config: RecognitionConfig,
    audio: RecognitionAudio,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognizeResponse {
    #[serde(default)]
    pub(crate) results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognitionResult {
    #[serde(default)]
    pub(crate) alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RecognitionAlternative {
    #[serde(default)]
    pub(crate) transcript: String,
}

/// REST client for the Google Cloud Speech-to-Text batch endpoint.
pub struct GoogleRecognizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl GoogleRecognizer {
    /// Build the HTTP client for the given config.
    #[track_caller]
    pub fn new(config: SpeechConfig) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SolverError::Recognition {
                reason: format!("Failed to build HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { client, config })
    }

    pub(crate) fn request_body(&self, samples: &[f32]) -> RecognizeRequest {
        RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: RECOGNITION_SAMPLE_RATE,
                language_code: self.config.language.clone(),
            },
            audio: RecognitionAudio {
                content: BASE64_STANDARD.encode(pcm_to_linear16(samples)),
            },
        }
    }
}

#[async_trait]
impl SpeechRecognizer for GoogleRecognizer {
    #[instrument(skip(self, samples), fields(sample_count = samples.len()))]
    async fn recognize(&self, samples: &[f32]) -> CoreResult<String> {
        if samples.is_empty() {
            return Err(SolverError::Recognition {
                reason: "no samples to recognize".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&self.request_body(samples))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SolverError::Recognition {
                reason: format!("speech API returned {}: {}", status, body),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let payload: RecognizeResponse = response.json().await?;
        let transcript = first_transcript(&payload).ok_or(SolverError::EmptyTranscript {
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(text_len = transcript.len(), "Prompt transcribed");

        Ok(transcript)
    }
}

/// First non-empty alternative across the results, trimmed.
pub(crate) fn first_transcript(response: &RecognizeResponse) -> Option<String> {
    response
        .results
        .iter()
        .flat_map(|result| result.alternatives.iter())
        .map(|alternative| alternative.transcript.trim())
        .find(|transcript| !transcript.is_empty())
        .map(str::to_string)
}
