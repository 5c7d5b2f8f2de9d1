// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::{Path, PathBuf};

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcoustidConfig {
    /// Client key registered with AcoustID. Required for lookups.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Lookup results scoring below this are not treated as candidates.
    pub min_score: f32,
    pub timeout_secs: u64,
}

impl Default for AcoustidConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.acoustid.org/v2".to_string(),
            min_score: 0.5,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicBrainzConfig {
    pub base_url: String,
    /// Base of the human-facing site, used to build release reference URLs.
    pub web_url: String,
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            base_url: "https://musicbrainz.org/ws/2".to_string(),
            web_url: "https://musicbrainz.org".to_string(),
            rate_limit_ms: 1000,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Lowercase file extensions accepted as audio, without the dot.
    pub extensions: Vec<String>,
    /// When false, files are fingerprinted directly instead of being decoded to WAV first.
    pub transcode: bool,
    pub decoder_program: String,
    /// Arguments passed to the decoder; `{input}` and `{output}` are substituted.
    pub decoder_args: Vec<String>,
    pub cache_dir: PathBuf,
    pub max_concurrent_tracks: usize,
    pub track_timeout_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extensions: ["mp3", "flac", "wav", "ogg", "m4a"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            transcode: true,
            decoder_program: "ffmpeg".to_string(),
            decoder_args: [
                "-nostdin", "-loglevel", "error", "-y", "-i", "{input}", "{output}",
            ]
            .iter()
            .map(|arg| arg.to_string())
            .collect(),
            cache_dir: std::env::temp_dir().join("albumprint"),
            max_concurrent_tracks: 4,
            track_timeout_secs: None,
        }
    }
}

/// How a candidate recording is located inside a release's track list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMatch {
    /// Match on the recording id attached to each release track.
    #[default]
    RecordingId,
    /// Match on the normalized title of the release track at that position.
    Title,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResolutionConfig {
    pub position_match: PositionMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub acoustid: AcoustidConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub pipeline: PipelineConfig,
    pub resolution: ResolutionConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: ALBUMPRINT_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("ALBUMPRINT_").split("__"));

    Ok(figment.extract()?)
}
