use crate::{CoreResult, SolverError};

use std::{panic::Location, time::Duration};

use error_location::ErrorLocation;
use tracing::{debug, instrument};

// Sound prompts are a few hundred kilobytes; anything larger is wrong.
const MAX_ASSET_BYTES: u64 = 4 * 1024 * 1024;

/// Whether a payload of `byte_len` bytes exceeds the asset size cap.
pub(crate) fn exceeds_asset_cap(byte_len: u64) -> bool {
    byte_len > MAX_ASSET_BYTES
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36 Edg/105.0.1343.27";

/// Downloads challenge assets (the audio prompt) over HTTP.
pub struct AssetFetcher {
    client: reqwest::Client,
}

impl AssetFetcher {
    /// Build a fetcher with a desktop-browser User-Agent.
    #[track_caller]
    pub fn new(timeout: Duration) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SolverError::Download {
                reason: format!("Failed to build HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        Ok(Self { client })
    }

    /// Download the asset at `url`, bounded by a size cap.
    #[instrument(skip(self))]
    pub async fn fetch(&self, url: &str) -> CoreResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SolverError::Download {
                reason: format!("asset host returned {}", status),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Some(length) = response.content_length() {
            if exceeds_asset_cap(length) {
                return Err(SolverError::Download {
                    reason: format!("asset too large: {} bytes", length),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        let bytes = response.bytes().await?;
        if exceeds_asset_cap(bytes.len() as u64) {
            return Err(SolverError::Download {
                reason: format!("asset too large: {} bytes", bytes.len()),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        if bytes.is_empty() {
            return Err(SolverError::Download {
                reason: "asset host returned an empty body".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        debug!(url, byte_len = bytes.len(), "Challenge asset downloaded");

        Ok(bytes.to_vec())
    }
}
