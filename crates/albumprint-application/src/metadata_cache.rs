// SPDX-License-Identifier: GPL-3.0-or-later

use crate::ports::{CollaboratorResult, MetadataStore};
use albumprint_domain::{CandidateTrack, RecordingId, Release, ReleaseId};
use async_trait::async_trait;
use moka::sync::Cache;
use std::sync::Arc;
use tracing::trace;

/// Memoizes catalog lookups for the lifetime of one identification run.
///
/// Failed lookups are not cached, so a transient error can be retried by a
/// later position.
pub struct CachingMetadataStore {
    inner: Arc<dyn MetadataStore>,
    releases: Cache<ReleaseId, Release>,
    candidates: Cache<RecordingId, Vec<CandidateTrack>>,
}

impl CachingMetadataStore {
    pub fn new(inner: Arc<dyn MetadataStore>) -> Self {
        Self {
            inner,
            releases: Cache::new(10_000),
            candidates: Cache::new(10_000),
        }
    }
}

#[async_trait]
impl MetadataStore for CachingMetadataStore {
    async fn tracks_for_candidate(
        &self,
        candidate_id: RecordingId,
    ) -> CollaboratorResult<Vec<CandidateTrack>> {
        if let Some(cached) = self.candidates.get(&candidate_id) {
            trace!(target: "musicbrainz", candidate_id = %candidate_id, "candidate cache hit");
            return Ok(cached);
        }

        let tracks = self.inner.tracks_for_candidate(candidate_id).await?;
        self.candidates.insert(candidate_id, tracks.clone());
        Ok(tracks)
    }

    async fn release_by_id(&self, release_id: ReleaseId) -> CollaboratorResult<Release> {
        if let Some(cached) = self.releases.get(&release_id) {
            trace!(target: "musicbrainz", release_id = %release_id, "release cache hit");
            return Ok(cached);
        }

        let release = self.inner.release_by_id(release_id).await?;
        self.releases.insert(release_id, release.clone());
        Ok(release)
    }
}
