// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{IdentifyError, IdentifyResult};
use crate::ports::MetadataStore;
use albumprint_domain::{AlbumHypothesis, AlbumTrack, ReleaseHypothesis, ReleaseId, TrackObservation};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Turns surviving release hypotheses into output records.
pub struct HypothesisMaterializer {
    metadata: Arc<dyn MetadataStore>,
    web_url: String,
}

impl HypothesisMaterializer {
    /// `web_url` is the base of the human-facing catalog site.
    pub fn new(metadata: Arc<dyn MetadataStore>, web_url: impl Into<String>) -> Self {
        Self {
            metadata,
            web_url: web_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn release_url(&self, release_id: ReleaseId) -> String {
        format!("{}/release/{}.html", self.web_url, release_id)
    }

    /// Build one [`AlbumHypothesis`] per hypothesis, keeping their order.
    ///
    /// Every hypothesis must have confirmed all observations. A release that
    /// can no longer be fetched, or whose track count changed, is reported as
    /// [`IdentifyError::InconsistentMetadata`].
    #[instrument(skip_all, target = "resolution", fields(hypotheses = hypotheses.len()))]
    pub async fn materialize(
        &self,
        hypotheses: &[ReleaseHypothesis],
        observations: &[TrackObservation],
    ) -> IdentifyResult<Vec<AlbumHypothesis>> {
        let mut albums = Vec::with_capacity(hypotheses.len());

        for hypothesis in hypotheses {
            let release_id = hypothesis.release_id;
            let release = self
                .metadata
                .release_by_id(release_id)
                .await
                .map_err(|err| IdentifyError::InconsistentMetadata {
                    release_id,
                    reason: err.to_string(),
                })?;

            if release.track_count() != observations.len() {
                return Err(IdentifyError::InconsistentMetadata {
                    release_id,
                    reason: format!(
                        "release has {} tracks, directory has {}",
                        release.track_count(),
                        observations.len()
                    ),
                });
            }

            let mut tracks = Vec::with_capacity(observations.len());
            for observation in observations {
                let position = observation.position;
                let index = (position as usize).checked_sub(1);
                let (Some(track), Some(artist)) = (
                    index.and_then(|index| release.tracks.get(index)),
                    release.resolved_artist(position),
                ) else {
                    return Err(IdentifyError::InconsistentMetadata {
                        release_id,
                        reason: format!("no track at position {}", position),
                    });
                };

                tracks.push(AlbumTrack {
                    position,
                    artist: artist.to_string(),
                    title: track.title.clone(),
                    duration_ms: observation.duration_ms,
                    source_path: observation.source_path.clone(),
                });
            }

            debug!(target: "resolution", release_id = %release_id, title = %release.title, "materialized");

            albums.push(AlbumHypothesis {
                album_artist: release.album_artist.clone(),
                release_title: release.title.clone(),
                release_id,
                release_url: self.release_url(release_id),
                release_dates: release.release_dates(),
                tracks,
            });
        }

        Ok(albums)
    }
}
