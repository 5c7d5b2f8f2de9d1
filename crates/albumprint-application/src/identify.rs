// SPDX-License-Identifier: GPL-3.0-or-later

use crate::adapters::{AcoustidIdentifier, ChromaprintFingerprinter, MusicBrainzMetadataStore};
use crate::error::{IdentifyError, IdentifyResult};
use crate::materializer::HypothesisMaterializer;
use crate::metadata_cache::CachingMetadataStore;
use crate::pipeline::TrackPipeline;
use crate::ports::{CollaboratorError, Fingerprinter, IdentificationService, MetadataStore, Transcoder};
use crate::resolution::ReleaseResolver;
use crate::scanner::scan_directory;
use crate::transcode::{CommandTranscoder, PassthroughTranscoder};
use albumprint_config::{AppConfig, PositionMatch};
use albumprint_domain::{AlbumHypothesis, TrackObservation};
use albumprint_fingerprint::AcoustidClient;
use albumprint_musicbrainz::MusicBrainzClient;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Everything learned about one directory.
#[derive(Debug, Clone, Serialize)]
pub struct IdentificationReport {
    pub observations: Vec<TrackObservation>,
    /// Matching releases, best supported first. Empty when nothing matches.
    pub albums: Vec<AlbumHypothesis>,
}

/// Runs scan, per-file identification, resolution and materialization for a directory.
pub struct AlbumIdentificationService {
    transcoder: Arc<dyn Transcoder>,
    fingerprinter: Arc<dyn Fingerprinter>,
    identifier: Arc<dyn IdentificationService>,
    metadata: Arc<dyn MetadataStore>,
    extensions: Vec<String>,
    position_match: PositionMatch,
    web_url: String,
    max_concurrent_tracks: usize,
    track_timeout: Option<Duration>,
}

impl AlbumIdentificationService {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        fingerprinter: Arc<dyn Fingerprinter>,
        identifier: Arc<dyn IdentificationService>,
        metadata: Arc<dyn MetadataStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            transcoder,
            fingerprinter,
            identifier,
            metadata,
            extensions: config.pipeline.extensions.clone(),
            position_match: config.resolution.position_match,
            web_url: config.musicbrainz.web_url.clone(),
            max_concurrent_tracks: config.pipeline.max_concurrent_tracks,
            track_timeout: config.pipeline.track_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Wire the production collaborators (ffmpeg, Chromaprint, AcoustID, MusicBrainz).
    pub fn from_config(config: &AppConfig) -> IdentifyResult<Self> {
        let api_key = config
            .acoustid
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                IdentifyError::Configuration("acoustid.api_key is not set".to_string())
            })?;

        let acoustid = AcoustidClient::builder(api_key)
            .base_url(config.acoustid.base_url.clone())
            .timeout(Duration::from_secs(config.acoustid.timeout_secs))
            .build()
            .map_err(CollaboratorError::from)?;

        let musicbrainz = MusicBrainzClient::builder()
            .base_url(config.musicbrainz.base_url.clone())
            .timeout(Duration::from_secs(config.musicbrainz.timeout_secs))
            .rate_limit_interval(Duration::from_millis(config.musicbrainz.rate_limit_ms))
            .build()
            .map_err(CollaboratorError::from)?;

        let transcoder: Arc<dyn Transcoder> = if config.pipeline.transcode {
            Arc::new(CommandTranscoder::from_config(&config.pipeline))
        } else {
            Arc::new(PassthroughTranscoder)
        };

        Ok(Self::new(
            transcoder,
            Arc::new(ChromaprintFingerprinter::new()),
            Arc::new(AcoustidIdentifier::new(acoustid, config.acoustid.min_score)),
            Arc::new(MusicBrainzMetadataStore::new(musicbrainz)),
            config,
        ))
    }

    #[instrument(skip_all, target = "pipeline", fields(dir = %dir.as_ref().display()))]
    pub async fn identify_directory(&self, dir: impl AsRef<Path>) -> IdentifyResult<IdentificationReport> {
        let files = scan_directory(dir.as_ref(), &self.extensions)?;
        info!(target: "pipeline", files = files.len(), "identifying directory");

        // Fresh cache per run so catalog edits are picked up next time.
        let metadata: Arc<dyn MetadataStore> =
            Arc::new(CachingMetadataStore::new(self.metadata.clone()));

        let observations = TrackPipeline::new(
            self.transcoder.clone(),
            self.fingerprinter.clone(),
            self.identifier.clone(),
            metadata.clone(),
        )
        .with_concurrency(self.max_concurrent_tracks)
        .with_track_timeout(self.track_timeout)
        .observe(&files)
        .await;

        let hypotheses = ReleaseResolver::new(metadata.clone(), self.position_match)
            .resolve(&observations)
            .await;

        let albums = HypothesisMaterializer::new(metadata, self.web_url.clone())
            .materialize(&hypotheses, &observations)
            .await?;

        info!(target: "pipeline", albums = albums.len(), "directory identified");

        Ok(IdentificationReport {
            observations,
            albums,
        })
    }
}
