// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

// ============================================================================
// Value Objects & IDs
// ============================================================================

/// MusicBrainz recording id; the catalog identity of a candidate track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordingId(pub Uuid);

impl RecordingId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for RecordingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// MusicBrainz release id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReleaseId(pub Uuid);

impl ReleaseId {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Title comparison key: NFKC normalized, trimmed and lowercased.
pub fn normalize_title(title: &str) -> String {
    title.nfkc().collect::<String>().trim().to_lowercase()
}

// ============================================================================
// Catalog
// ============================================================================

/// A catalog recording returned for an identified fingerprint, with the
/// releases it appears on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTrack {
    pub id: RecordingId,
    pub title: String,
    pub release_ids: Vec<ReleaseId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    /// YYYY, YYYY-MM or YYYY-MM-DD.
    pub date: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseTrack {
    pub title: String,
    /// Credited artist when the track has its own credit.
    pub artist: Option<String>,
    pub recording_id: RecordingId,
}

/// A specific album edition with a fixed, ordered track list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub title: String,
    pub album_artist: String,
    pub release_events: Vec<ReleaseEvent>,
    pub tracks: Vec<ReleaseTrack>,
}

impl Release {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Track at 1-based `position`.
    pub fn track_at(&self, position: u32) -> Option<&ReleaseTrack> {
        let index = position.checked_sub(1)? as usize;
        self.tracks.get(index)
    }

    /// Whether the track at `position` carries `recording_id`. A recording
    /// repeated on the release matches at each of its positions.
    pub fn has_recording_at(&self, position: u32, recording_id: RecordingId) -> bool {
        self.track_at(position)
            .is_some_and(|track| track.recording_id == recording_id)
    }

    /// Whether the track at `position` has `title`, compared normalized.
    pub fn has_title_at(&self, position: u32, title: &str) -> bool {
        self.track_at(position)
            .is_some_and(|track| normalize_title(&track.title) == normalize_title(title))
    }

    /// Artist for the track at 1-based `position`, falling back to the album artist.
    pub fn resolved_artist(&self, position: u32) -> Option<&str> {
        let track = self.track_at(position)?;
        Some(track.artist.as_deref().unwrap_or(&self.album_artist))
    }

    pub fn release_dates(&self) -> Vec<String> {
        self.release_events
            .iter()
            .map(|event| event.date.clone())
            .collect()
    }
}

// ============================================================================
// Observations & Hypotheses
// ============================================================================

/// What was learned about one audio file in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackObservation {
    /// 1-based position in directory order.
    pub position: u32,
    pub source_path: PathBuf,
    pub duration_ms: u64,
    /// Best title reported by the identification service.
    pub title: Option<String>,
    /// Best artist reported by the identification service.
    pub artist: Option<String>,
    pub candidates: Vec<CandidateTrack>,
}

impl TrackObservation {
    /// An observation for a file that could not be identified.
    pub fn unidentified(position: u32, source_path: impl Into<PathBuf>, duration_ms: u64) -> Self {
        Self {
            position,
            source_path: source_path.into(),
            duration_ms,
            title: None,
            artist: None,
            candidates: Vec::new(),
        }
    }

    pub fn candidate_track_ids(&self) -> BTreeSet<RecordingId> {
        self.candidates.iter().map(|candidate| candidate.id).collect()
    }

    pub fn is_identified(&self) -> bool {
        !self.candidates.is_empty()
    }
}

/// A release under evaluation, tracked by the positions it has confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHypothesis {
    pub release_id: ReleaseId,
    confirmed: BTreeSet<u32>,
    support: u32,
}

impl ReleaseHypothesis {
    pub fn new(release_id: ReleaseId) -> Self {
        Self {
            release_id,
            confirmed: BTreeSet::new(),
            support: 0,
        }
    }

    /// Record that `position` matched. Confirming the same position twice
    /// leaves the match count unchanged but still counts as support.
    pub fn confirm(&mut self, position: u32) {
        self.confirmed.insert(position);
        self.support += 1;
    }

    /// Length of the unbroken run of confirmed positions starting at 1.
    pub fn consecutive_match_count(&self) -> u32 {
        let mut count = 0;
        for position in &self.confirmed {
            if *position != count + 1 {
                break;
            }
            count += 1;
        }
        count
    }

    pub fn is_confirmed_at(&self, position: u32) -> bool {
        self.confirmed.contains(&position)
    }

    /// Number of (position, candidate) pairings that confirmed this release.
    pub fn support(&self) -> u32 {
        self.support
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumTrack {
    pub position: u32,
    pub artist: String,
    pub title: String,
    pub duration_ms: u64,
    pub source_path: PathBuf,
}

/// A fully resolved album identification for the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumHypothesis {
    pub album_artist: String,
    pub release_title: String,
    pub release_id: ReleaseId,
    pub release_url: String,
    pub release_dates: Vec<String>,
    pub tracks: Vec<AlbumTrack>,
}
