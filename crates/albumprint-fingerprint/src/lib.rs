// SPDX-License-Identifier: GPL-3.0-or-later

//! Audio fingerprinting and AcoustID integration for track identification.
//!
//! This crate provides functionality for:
//! - Decoding audio files and generating Chromaprint fingerprints
//! - Looking fingerprints up on AcoustID to obtain MusicBrainz recording ids

pub mod acoustid;
pub mod error;
pub mod fingerprint;
pub mod generator;

pub use acoustid::{AcoustidClient, AcoustidClientBuilder, AcoustidResult, RecordingArtist, RecordingMatch};
pub use error::{FingerprintError, Result};
pub use fingerprint::Fingerprint;
pub use generator::FingerprintGenerator;
