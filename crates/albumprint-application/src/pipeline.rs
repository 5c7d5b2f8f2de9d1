// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-file identification: decode, fingerprint, identify, then look up the
//! releases each candidate recording appears on.
//!
//! Files are processed concurrently but observations always come back in
//! position order. A failure on one file never aborts the run; the file is
//! reported with no candidates instead.

use crate::ports::{
    CollaboratorError, CollaboratorResult, Fingerprinter, IdentificationService, MetadataStore,
    Transcoder,
};
use crate::scanner::ScannedAudioFile;
use albumprint_domain::TrackObservation;
use albumprint_fingerprint::Fingerprint;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
struct TrackWorker {
    transcoder: Arc<dyn Transcoder>,
    fingerprinter: Arc<dyn Fingerprinter>,
    identifier: Arc<dyn IdentificationService>,
    metadata: Arc<dyn MetadataStore>,
}

impl TrackWorker {
    #[instrument(skip_all, target = "pipeline", fields(position = file.position))]
    async fn observe(&self, file: &ScannedAudioFile) -> TrackObservation {
        let fingerprint = match self.fingerprint(file).await {
            Ok(fingerprint) => fingerprint,
            Err(err) => {
                warn!(
                    target: "pipeline",
                    path = %file.path.display(),
                    error = %err,
                    "could not fingerprint file"
                );
                return TrackObservation::unidentified(file.position, &file.path, 0);
            }
        };

        let identification = match self.identifier.lookup(&fingerprint).await {
            Ok(identification) => identification,
            Err(err) => {
                warn!(
                    target: "pipeline",
                    path = %file.path.display(),
                    error = %err,
                    "identification failed"
                );
                return TrackObservation::unidentified(
                    file.position,
                    &file.path,
                    fingerprint.duration_ms,
                );
            }
        };

        let mut candidates = Vec::new();
        for candidate_id in &identification.candidate_ids {
            match self.metadata.tracks_for_candidate(*candidate_id).await {
                Ok(tracks) => candidates.extend(tracks),
                Err(err) => warn!(
                    target: "pipeline",
                    candidate_id = %candidate_id,
                    error = %err,
                    "dropping candidate without release data"
                ),
            }
        }

        info!(
            target: "pipeline",
            position = file.position,
            path = %file.path.display(),
            title = identification.title.as_deref().unwrap_or("?"),
            candidates = candidates.len(),
            "track observed"
        );

        TrackObservation {
            position: file.position,
            source_path: file.path.clone(),
            duration_ms: fingerprint.duration_ms,
            title: identification.title,
            artist: identification.artist,
            candidates,
        }
    }

    async fn fingerprint(&self, file: &ScannedAudioFile) -> CollaboratorResult<Fingerprint> {
        let waveform = self.transcoder.decode(&file.path).await?;
        self.fingerprinter.fingerprint(&waveform).await
    }
}

pub struct TrackPipeline {
    worker: TrackWorker,
    max_concurrent: usize,
    track_timeout: Option<Duration>,
}

impl TrackPipeline {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        fingerprinter: Arc<dyn Fingerprinter>,
        identifier: Arc<dyn IdentificationService>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            worker: TrackWorker {
                transcoder,
                fingerprinter,
                identifier,
                metadata,
            },
            max_concurrent: 1,
            track_timeout: None,
        }
    }

    /// Number of files processed at once (at least one).
    pub fn with_concurrency(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Give up on a file after `timeout`; it is then reported unidentified.
    pub fn with_track_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.track_timeout = timeout;
        self
    }

    /// One observation per file, ordered by position.
    pub async fn observe(&self, files: &[ScannedAudioFile]) -> Vec<TrackObservation> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for (index, file) in files.iter().cloned().enumerate() {
            let worker = self.worker.clone();
            let semaphore = semaphore.clone();
            let track_timeout = self.track_timeout;

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, TrackObservation::unidentified(file.position, &file.path, 0));
                };

                let observation = match track_timeout {
                    Some(limit) => match tokio::time::timeout(limit, worker.observe(&file)).await {
                        Ok(observation) => observation,
                        Err(_) => {
                            warn!(
                                target: "pipeline",
                                path = %file.path.display(),
                                error = %CollaboratorError::Timeout(limit),
                                "giving up on file"
                            );
                            TrackObservation::unidentified(file.position, &file.path, 0)
                        }
                    },
                    None => worker.observe(&file).await,
                };

                (index, observation)
            });
        }

        let mut slots: Vec<Option<TrackObservation>> = vec![None; files.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, observation)) => slots[index] = Some(observation),
                Err(err) => warn!(target: "pipeline", error = %err, "track task failed"),
            }
        }

        let observations: Vec<TrackObservation> = slots
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| TrackObservation::unidentified(file.position, &file.path, 0))
            })
            .collect();

        debug!(
            target: "pipeline",
            files = observations.len(),
            identified = observations.iter().filter(|o| o.is_identified()).count(),
            "pipeline finished"
        );

        observations
    }
}
