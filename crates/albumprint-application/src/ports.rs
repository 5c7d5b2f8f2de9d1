// SPDX-License-Identifier: GPL-3.0-or-later

//! Boundaries to the collaborators the identification pipeline delegates to.
//!
//! Each trait has a production adapter (see [`crate::adapters`] and
//! [`crate::transcode`]) and an in-memory fake used by the tests.

use albumprint_domain::{CandidateTrack, RecordingId, Release, ReleaseId};
use albumprint_fingerprint::{Fingerprint, FingerprintError};
use albumprint_musicbrainz::MusicBrainzError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by external collaborators.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("transcoding failed: {0}")]
    Transcode(String),

    #[error("fingerprinting failed: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("MusicBrainz lookup failed: {0}")]
    MusicBrainz(#[from] MusicBrainzError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// What the identification service reported for one fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identification {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Candidate recordings, best match first, without duplicates.
    pub candidate_ids: Vec<RecordingId>,
}

/// Produces a waveform the fingerprinter can read.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the path of the decoded waveform. Idempotent when the output already exists.
    async fn decode(&self, source: &Path) -> CollaboratorResult<PathBuf>;
}

#[async_trait]
pub trait Fingerprinter: Send + Sync {
    async fn fingerprint(&self, waveform: &Path) -> CollaboratorResult<Fingerprint>;
}

/// Fingerprint to candidate recordings (AcoustID in production).
#[async_trait]
pub trait IdentificationService: Send + Sync {
    async fn lookup(&self, fingerprint: &Fingerprint) -> CollaboratorResult<Identification>;
}

/// Catalog access (MusicBrainz in production).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Catalog tracks for a candidate id, each with the releases containing it.
    async fn tracks_for_candidate(
        &self,
        candidate_id: RecordingId,
    ) -> CollaboratorResult<Vec<CandidateTrack>>;

    /// Full release record with its ordered track list.
    async fn release_by_id(&self, release_id: ReleaseId) -> CollaboratorResult<Release>;
}
