// SPDX-License-Identifier: GPL-3.0-or-later

//! In-memory collaborators shared by the unit tests of this crate.

use crate::ports::{
    CollaboratorError, CollaboratorResult, Fingerprinter, Identification, IdentificationService,
    MetadataStore, Transcoder,
};
use albumprint_domain::{
    CandidateTrack, RecordingId, Release, ReleaseEvent, ReleaseId, ReleaseTrack, TrackObservation,
};
use albumprint_fingerprint::Fingerprint;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

pub fn release_id(n: u128) -> ReleaseId {
    ReleaseId::from_uuid(Uuid::from_u128(n))
}

pub fn recording_id(n: u128) -> RecordingId {
    RecordingId::from_uuid(Uuid::from_u128(n))
}

/// A release whose tracks carry the given `(recording, title)` pairs, in order.
pub fn release(id: ReleaseId, title: &str, tracks: &[(RecordingId, &str)]) -> Release {
    Release {
        id,
        title: title.to_string(),
        album_artist: "Album Artist".to_string(),
        release_events: vec![ReleaseEvent {
            date: "2004-05-17".to_string(),
            country: Some("GB".to_string()),
        }],
        tracks: tracks
            .iter()
            .map(|(recording_id, title)| ReleaseTrack {
                title: title.to_string(),
                artist: None,
                recording_id: *recording_id,
            })
            .collect(),
    }
}

pub fn candidate(id: RecordingId, title: &str, releases: &[ReleaseId]) -> CandidateTrack {
    CandidateTrack {
        id,
        title: title.to_string(),
        release_ids: releases.to_vec(),
    }
}

pub fn observation(position: u32, candidates: Vec<CandidateTrack>) -> TrackObservation {
    TrackObservation {
        position,
        source_path: PathBuf::from(format!("/music/{:02}.mp3", position)),
        duration_ms: 180_000 + u64::from(position),
        title: None,
        artist: None,
        candidates,
    }
}

/// Metadata store backed by maps, counting how often it is consulted.
#[derive(Default)]
pub struct FakeMetadataStore {
    releases: Mutex<HashMap<ReleaseId, Release>>,
    candidates: HashMap<RecordingId, Vec<CandidateTrack>>,
    release_calls: AtomicUsize,
    candidate_calls: AtomicUsize,
}

impl FakeMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release(self, release: Release) -> Self {
        self.releases
            .lock()
            .unwrap()
            .insert(release.id, release);
        self
    }

    pub fn with_candidate(mut self, id: RecordingId, tracks: Vec<CandidateTrack>) -> Self {
        self.candidates.insert(id, tracks);
        self
    }

    /// Replace or drop a release after the fact, as if the catalog changed mid-run.
    pub fn set_release(&self, id: ReleaseId, release: Option<Release>) {
        let mut releases = self.releases.lock().unwrap();
        match release {
            Some(release) => releases.insert(id, release),
            None => releases.remove(&id),
        };
    }

    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataStore for FakeMetadataStore {
    async fn tracks_for_candidate(
        &self,
        candidate_id: RecordingId,
    ) -> CollaboratorResult<Vec<CandidateTrack>> {
        self.candidate_calls.fetch_add(1, Ordering::SeqCst);
        self.candidates
            .get(&candidate_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("recording {}", candidate_id)))
    }

    async fn release_by_id(&self, release_id: ReleaseId) -> CollaboratorResult<Release> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        self.releases
            .lock()
            .unwrap()
            .get(&release_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("release {}", release_id)))
    }
}

/// Hands back the source path, failing for files whose name contains "corrupt".
#[derive(Default)]
pub struct FakeTranscoder;

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn decode(&self, source: &Path) -> CollaboratorResult<PathBuf> {
        if source.to_string_lossy().contains("corrupt") {
            return Err(CollaboratorError::Transcode("unreadable stream".to_string()));
        }
        Ok(source.to_path_buf())
    }
}

/// Uses the file stem as the fingerprint hash; duration comes from the file length.
#[derive(Default)]
pub struct FakeFingerprinter;

#[async_trait]
impl Fingerprinter for FakeFingerprinter {
    async fn fingerprint(&self, waveform: &Path) -> CollaboratorResult<Fingerprint> {
        let stem = waveform
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let duration_ms = std::fs::metadata(waveform)
            .map(|meta| meta.len() * 1000)
            .unwrap_or(0);
        Ok(Fingerprint::new(stem, duration_ms))
    }
}

/// Answers lookups from a hash → identification table; unknown hashes have no candidates.
#[derive(Default)]
pub struct FakeIdentifier {
    answers: HashMap<String, Identification>,
}

impl FakeIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(mut self, hash: &str, candidate_ids: Vec<RecordingId>) -> Self {
        self.answers.insert(
            hash.to_string(),
            Identification {
                title: Some(format!("title of {}", hash)),
                artist: Some("Reported Artist".to_string()),
                candidate_ids,
            },
        );
        self
    }
}

#[async_trait]
impl IdentificationService for FakeIdentifier {
    async fn lookup(&self, fingerprint: &Fingerprint) -> CollaboratorResult<Identification> {
        Ok(self
            .answers
            .get(&fingerprint.hash)
            .cloned()
            .unwrap_or_default())
    }
}
