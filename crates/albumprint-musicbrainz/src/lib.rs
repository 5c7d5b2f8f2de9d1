// SPDX-License-Identifier: GPL-3.0-or-later

//! MusicBrainz API client for recording and release lookups and release browsing.
//!
//! Requests are serialized through a rate limiter to comply with the
//! MusicBrainz API guidelines (one request per second by default).

pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;

pub use client::{MusicBrainzClient, MusicBrainzClientBuilder};
pub use error::{MusicBrainzError, Result};
pub use models::{
    ArtistCredit, ArtistRef, Medium, Recording, RecordingRef, RecordingRelease, Release,
    ReleaseBrowse, ReleaseEvent, ReleaseEventArea, Track,
};
