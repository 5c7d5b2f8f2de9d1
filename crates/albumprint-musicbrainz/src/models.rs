// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Artist credit entry (artist contribution to a release or track).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistCredit {
    /// Name as credited.
    pub name: String,
    pub artist: ArtistRef,
    /// Join phrase (e.g., " & ", " feat. ").
    #[serde(default)]
    pub joinphrase: Option<String>,
}

impl ArtistCredit {
    /// Render a credit list as displayed on MusicBrainz ("A feat. B").
    pub fn join(credits: &[ArtistCredit]) -> Option<String> {
        if credits.is_empty() {
            return None;
        }
        Some(
            credits
                .iter()
                .map(|credit| {
                    format!(
                        "{}{}",
                        credit.name,
                        credit.joinphrase.as_deref().unwrap_or("")
                    )
                })
                .collect(),
        )
    }
}

/// Reference to an artist (minimal info).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistRef {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "sort-name", default)]
    pub sort_name: Option<String>,
}

/// Recording lookup (`inc=releases`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recording {
    pub id: Uuid,
    pub title: String,
    /// Length in milliseconds.
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(default)]
    pub releases: Vec<RecordingRelease>,
}

/// Release stub embedded in a recording lookup or a release browse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingRelease {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

/// One page of `/release?recording=<id>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseBrowse {
    #[serde(rename = "release-count")]
    pub release_count: u32,
    #[serde(rename = "release-offset", default)]
    pub release_offset: u32,
    #[serde(default)]
    pub releases: Vec<RecordingRelease>,
}

/// Full release lookup (`inc=recordings+artist-credits`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(rename = "release-events", default)]
    pub release_events: Vec<ReleaseEvent>,
    #[serde(default)]
    pub media: Vec<Medium>,
}

impl Release {
    /// Tracks across all media, in medium order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        let mut media: Vec<&Medium> = self.media.iter().collect();
        media.sort_by_key(|medium| medium.position.unwrap_or(0));
        media.into_iter().flat_map(|medium| medium.tracks.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseEvent {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub area: Option<ReleaseEventArea>,
}

impl ReleaseEvent {
    /// First ISO 3166-1 code of the event's area, if any.
    pub fn country(&self) -> Option<&str> {
        self.area
            .as_ref()
            .and_then(|area| area.iso_codes.first())
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseEventArea {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "iso-3166-1-codes", default)]
    pub iso_codes: Vec<String>,
}

/// Disc, side or other medium of a release.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medium {
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub id: Uuid,
    pub position: u32,
    pub title: String,
    #[serde(default)]
    pub length: Option<u64>,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    pub recording: RecordingRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordingRef {
    pub id: Uuid,
    pub title: String,
}
