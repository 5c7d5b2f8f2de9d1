// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{MusicBrainzError, Result};
use crate::models::{Recording, RecordingRelease, Release, ReleaseBrowse};
use crate::rate_limiter::RateLimiter;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = concat!(
    "Albumprint/",
    env!("CARGO_PKG_VERSION"),
    " ( ",
    env!("CARGO_PKG_REPOSITORY"),
    " )"
);
/// Largest page the browse endpoints hand out.
const BROWSE_LIMIT: usize = 100;

/// MusicBrainz API client with rate limiting.
#[derive(Debug, Clone)]
pub struct MusicBrainzClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl MusicBrainzClient {
    /// Create a new MusicBrainz client with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> MusicBrainzClientBuilder {
        MusicBrainzClientBuilder::default()
    }

    /// Look up a recording by MusicBrainz ID, including the releases it appears on.
    ///
    /// # Example
    /// ```no_run
    /// # use albumprint_musicbrainz::MusicBrainzClient;
    /// # use uuid::Uuid;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = MusicBrainzClient::new()?;
    /// let mbid = Uuid::parse_str("e5a3f0c4-1fae-4f2e-8f76-0c3b4f1e4fa6")?;
    /// let recording = client.lookup_recording(mbid).await?;
    /// println!("{} appears on {} releases", recording.title, recording.releases.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn lookup_recording(&self, mbid: Uuid) -> Result<Recording> {
        let url = self.lookup_url("recording", mbid, "releases")?;
        self.get(url.as_str()).await
    }

    /// Every release a recording appears on.
    ///
    /// The recording lookup embeds at most 25 releases, so this pages through
    /// `/release?recording=<id>` until `release-count` entries have been read.
    pub async fn browse_recording_releases(&self, recording: Uuid) -> Result<Vec<RecordingRelease>> {
        let mut releases: Vec<RecordingRelease> = Vec::new();

        loop {
            let url = self.browse_url("release", "recording", recording, releases.len())?;
            let page: ReleaseBrowse = self.get(url.as_str()).await?;
            let fetched = page.releases.len();
            releases.extend(page.releases);

            trace!(
                target: "musicbrainz",
                recording = %recording,
                offset = page.release_offset,
                fetched,
                total = page.release_count,
                "release page"
            );

            if fetched == 0 || releases.len() >= page.release_count as usize {
                break;
            }
        }

        debug!(
            target: "musicbrainz",
            recording = %recording,
            releases = releases.len(),
            "browsed recording releases"
        );
        Ok(releases)
    }

    /// Look up a release by MusicBrainz ID with its media, track list and artist credits.
    pub async fn lookup_release(&self, mbid: Uuid) -> Result<Release> {
        let url = self.lookup_url("release", mbid, "recordings artist-credits")?;
        self.get(url.as_str()).await
    }

    fn lookup_url(&self, entity: &str, mbid: Uuid, inc: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}/{}", self.base_url, entity, mbid))
            .map_err(|e| MusicBrainzError::InvalidResponse(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair("fmt", "json")
            .append_pair("inc", inc);

        Ok(url)
    }

    fn browse_url(&self, entity: &str, linked: &str, mbid: Uuid, offset: usize) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, entity))
            .map_err(|e| MusicBrainzError::InvalidResponse(e.to_string()))?;

        url.query_pairs_mut()
            .append_pair(linked, &mbid.to_string())
            .append_pair("fmt", "json")
            .append_pair("limit", &BROWSE_LIMIT.to_string())
            .append_pair("offset", &offset.to_string());

        Ok(url)
    }

    /// Internal method to perform rate-limited GET requests.
    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.acquire().await;

        trace!(target: "musicbrainz", "GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        debug!(target: "musicbrainz", "response status: {}", status);

        if status == 404 {
            return Err(MusicBrainzError::NotFound(url.to_string()));
        }

        if status == 503 {
            return Err(MusicBrainzError::RateLimitExceeded);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MusicBrainzError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        trace!(target: "musicbrainz", "response body: {}", body);

        serde_json::from_str(&body).map_err(|e| {
            MusicBrainzError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }
}

/// Builder for configuring a MusicBrainz client.
#[derive(Debug)]
pub struct MusicBrainzClientBuilder {
    base_url: String,
    timeout: Duration,
    rate_limit_interval: Duration,
}

impl Default for MusicBrainzClientBuilder {
    fn default() -> Self {
        Self {
            base_url: MUSICBRAINZ_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            rate_limit_interval: Duration::from_secs(1),
        }
    }
}

impl MusicBrainzClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set rate limit interval between requests.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    pub fn build(self) -> Result<MusicBrainzClient> {
        Url::parse(&self.base_url).map_err(|e| {
            MusicBrainzError::InvalidResponse(format!("Invalid base URL: {}", e))
        })?;

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(MusicBrainzClient {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(self.rate_limit_interval),
        })
    }
}
