// SPDX-License-Identifier: GPL-3.0-or-later

use serde::{Deserialize, Serialize};

/// Audio fingerprint (Chromaprint) together with the length of the track it
/// was computed from.
///
/// The hash only covers the first 120 seconds of audio, but `duration_ms` is
/// the full decoded length; AcoustID uses it to disambiguate lookups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fingerprint {
    /// Compressed Chromaprint fingerprint (base64, URL-safe or standard alphabet).
    pub hash: String,
    /// Full duration of the decoded audio, in milliseconds.
    pub duration_ms: u64,
    /// Algorithm version used (typically 4 for modern Chromaprint).
    #[serde(default = "default_algorithm")]
    pub algorithm: u32,
}

fn default_algorithm() -> u32 {
    4
}

impl Fingerprint {
    pub fn new(hash: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            hash: hash.into(),
            duration_ms,
            algorithm: 4,
        }
    }

    /// Duration rounded to whole seconds, as the AcoustID API expects.
    pub fn duration_secs(&self) -> u64 {
        (self.duration_ms + 500) / 1000
    }

    /// Validate the fingerprint format.
    pub fn validate(&self) -> crate::Result<()> {
        if self.hash.is_empty() {
            return Err(crate::FingerprintError::InvalidFingerprint(
                "fingerprint hash is empty".to_string(),
            ));
        }

        if self.duration_secs() == 0 {
            return Err(crate::FingerprintError::InvalidFingerprint(
                "duration must be at least one second".to_string(),
            ));
        }

        let trimmed = self.hash.trim_end_matches('=');

        let padding_len = self.hash.len() - trimmed.len();
        if padding_len > 2 {
            return Err(crate::FingerprintError::InvalidFingerprint(
                "invalid base64 padding: too many '=' characters".to_string(),
            ));
        }

        if trimmed.contains('=') {
            return Err(crate::FingerprintError::InvalidFingerprint(
                "padding character '=' must only appear at the end".to_string(),
            ));
        }

        // libchromaprint emits the URL-safe alphabet; accept both.
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '-' | '_'))
        {
            return Err(crate::FingerprintError::InvalidFingerprint(
                "fingerprint contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}
