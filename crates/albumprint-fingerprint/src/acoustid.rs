// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

const ACOUSTID_API_BASE: &str = "https://api.acoustid.org/v2";
const USER_AGENT: &str = concat!(
    "Albumprint/",
    env!("CARGO_PKG_VERSION"),
    " ( ",
    env!("CARGO_PKG_REPOSITORY"),
    " )"
);

/// One AcoustID track matched by a fingerprint, with the MusicBrainz
/// recordings linked to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcoustidResult {
    /// AcoustID track id.
    pub id: Uuid,
    /// Match score (0-1), higher is more confident.
    pub score: f32,
    #[serde(default)]
    pub recordings: Vec<RecordingMatch>,
}

/// MusicBrainz recording linked to an AcoustID track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingMatch {
    /// MusicBrainz recording ID.
    pub id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artists: Vec<RecordingArtist>,
}

impl RecordingMatch {
    /// Artist names joined the way AcoustID credits them.
    pub fn artist_name(&self) -> Option<String> {
        if self.artists.is_empty() {
            return None;
        }
        Some(
            self.artists
                .iter()
                .map(|artist| format!("{}{}", artist.name, artist.joinphrase.as_deref().unwrap_or("")))
                .collect(),
        )
    }
}

/// Artist associated with a recording.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingArtist {
    /// MusicBrainz artist ID.
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub joinphrase: Option<String>,
}

/// AcoustID API client for fingerprint lookup.
#[derive(Debug, Clone)]
pub struct AcoustidClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl AcoustidClient {
    /// Create a new AcoustID client.
    ///
    /// # Arguments
    /// * `api_key` - AcoustID application key sent with every request.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder(api_key).build()
    }

    /// Create a client builder for custom configuration.
    pub fn builder(api_key: impl Into<String>) -> AcoustidClientBuilder {
        AcoustidClientBuilder::new(api_key)
    }

    async fn lookup_raw(&self, fingerprint: &Fingerprint) -> Result<Vec<AcoustidResult>> {
        fingerprint.validate()?;

        let mut url = Url::parse(&format!("{}/lookup", self.base_url))
            .map_err(|e| crate::FingerprintError::InvalidResponse(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("client", &self.api_key)
            .append_pair("format", "json")
            .append_pair("fingerprint", &fingerprint.hash)
            .append_pair("duration", &fingerprint.duration_secs().to_string())
            .append_pair("meta", "recordings");

        trace!(target: "fingerprint", "AcoustID lookup: {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        debug!(target: "fingerprint", "AcoustID response status: {}", status);

        let body = response.text().await?;
        trace!(target: "fingerprint", "AcoustID response: {}", body);

        // AcoustID reports API errors with a JSON body on non-2xx statuses too.
        let api_response: AcoustidResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(crate::FingerprintError::AcoustidError(format!(
                    "HTTP {}: {}",
                    status, body
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if !api_response.status.eq_ignore_ascii_case("ok") {
            return Err(crate::FingerprintError::AcoustidError(
                api_response
                    .error
                    .map(|error| error.message)
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        Ok(api_response.results)
    }

    /// Lookup a fingerprint on AcoustID and return results scoring at least `min_score`.
    ///
    /// # Example
    /// ```no_run
    /// # use albumprint_fingerprint::{AcoustidClient, Fingerprint};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = AcoustidClient::new("your-api-key")?;
    /// let fp = Fingerprint::new("AQADvEWZ==", 241_000);
    /// let results = client.lookup(&fp, 0.5).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn lookup(&self, fingerprint: &Fingerprint, min_score: f32) -> Result<Vec<AcoustidResult>> {
        if !(0.0..=1.0).contains(&min_score) {
            return Err(crate::FingerprintError::AcoustidError(
                "Invalid parameter: min_score must be between 0.0 and 1.0".to_string(),
            ));
        }

        let mut results: Vec<AcoustidResult> = self
            .lookup_raw(fingerprint)
            .await?
            .into_iter()
            .filter(|result| result.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            target: "fingerprint",
            results = results.len(),
            min_score,
            "AcoustID lookup complete"
        );

        Ok(results)
    }
}

#[derive(Debug, Deserialize)]
struct AcoustidResponse {
    status: String,
    #[serde(default)]
    results: Vec<AcoustidResult>,
    error: Option<AcoustidErrorBody>,
}

#[derive(Debug, Deserialize)]
struct AcoustidErrorBody {
    message: String,
}

/// Builder for AcoustID client.
#[derive(Debug)]
pub struct AcoustidClientBuilder {
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl AcoustidClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ACOUSTID_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom base URL (useful for testing).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the AcoustID client.
    ///
    /// # Errors
    /// Returns an error if:
    /// - The base URL is not a valid URL format
    /// - The HTTP client cannot be created
    pub fn build(self) -> Result<AcoustidClient> {
        Url::parse(&self.base_url).map_err(|e| {
            crate::FingerprintError::AcoustidError(format!("Invalid base URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(AcoustidClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: self.api_key,
        })
    }
}
