// SPDX-License-Identifier: GPL-3.0-or-later

//! Audio fingerprint generation from decoded audio files.
//!
//! Files are decoded with symphonia, downmixed to mono 16-bit PCM and fed to
//! Chromaprint. Only the first 120 seconds are fingerprinted, but the whole
//! stream is decoded so the reported duration is the real track length.
//!
//! # Supported Formats
//!
//! - WAV (the output of the transcoding step)
//! - FLAC
//! - MP3
//!
//! # Example
//!
//! ```no_run
//! use albumprint_fingerprint::FingerprintGenerator;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let generator = FingerprintGenerator::new();
//! let fingerprint = generator.generate_from_file(Path::new("01.wav")).await?;
//! println!("{} ms", fingerprint.duration_ms);
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chromaprint::Chromaprint;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument};

use crate::{Fingerprint, FingerprintError, Result};

/// Maximum duration to use for fingerprinting (in seconds).
pub(crate) const MAX_FINGERPRINT_DURATION_SECS: u32 = 120;

/// Fallback when the container does not declare a sample rate.
const SAMPLE_RATE: u32 = 44100;

const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "flac", "mp3"];

/// Mono 16-bit PCM plus the length of the full decoded stream.
struct AudioSamples {
    samples: Vec<i16>,
    sample_rate: u32,
    total_frames: u64,
}

impl AudioSamples {
    fn new(samples: Vec<i16>, sample_rate: u32) -> Self {
        let total_frames = samples.len() as u64;
        Self {
            samples,
            sample_rate,
            total_frames,
        }
    }

    fn duration_ms(&self) -> u64 {
        self.total_frames * 1000 / u64::from(self.sample_rate.max(1))
    }

    fn max_fingerprint_samples(&self) -> usize {
        (self.sample_rate.max(1) * MAX_FINGERPRINT_DURATION_SECS) as usize
    }

    /// Keep counting frames past the fingerprint window without storing them.
    fn push(&mut self, sample: i16) {
        self.total_frames += 1;
        if self.samples.len() < self.max_fingerprint_samples() {
            self.samples.push(sample);
        }
    }

    /// Drop samples beyond the fingerprint window, keeping the full duration.
    fn limit_to_fingerprint_duration(&mut self) {
        let max_samples = self.max_fingerprint_samples();
        if self.samples.len() > max_samples {
            debug!(
                original_len = self.samples.len(),
                max_samples, "Truncating audio samples to fingerprint duration limit"
            );
            self.samples.truncate(max_samples);
        }
    }
}

/// Fingerprint generator for audio files.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintGenerator;

impl FingerprintGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Decode `path` and compute its fingerprint and full duration.
    ///
    /// Decoding runs on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be opened or has an unsupported extension
    /// - Audio decoding fails
    /// - Chromaprint fails to produce a fingerprint
    #[instrument(skip_all, fields(file = %path.as_ref().display()))]
    pub async fn generate_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Fingerprint> {
        let path: PathBuf = path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || {
            let samples = decode_file(&path)?;
            fingerprint_samples(samples)
        })
        .await
        .map_err(|e| FingerprintError::AudioProcessing(format!("Decoder task failed: {}", e)))?
    }
}

fn decode_file(path: &Path) -> Result<AudioSamples> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| {
            FingerprintError::AudioProcessing("Cannot determine audio format".to_string())
        })?;

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(FingerprintError::AudioProcessing(format!(
            "Unsupported audio format: {}",
            extension
        )));
    }

    debug!("Opening audio file for fingerprinting");
    let reader = File::open(path).map_err(|e| {
        FingerprintError::AudioProcessing(format!("Failed to open audio file: {}", e))
    })?;

    decode_audio(reader, &extension)
}

/// Decode audio using symphonia and return mono PCM samples.
fn decode_audio(reader: File, extension: &str) -> Result<AudioSamples> {
    let mss = MediaSourceStream::new(Box::new(reader), Default::default());

    let mut hint = Hint::new();
    hint.with_extension(extension);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| {
            FingerprintError::AudioProcessing(format!(
                "Failed to probe {} stream: {}",
                extension, e
            ))
        })?;

    let mut format = probed.format;
    let track = format.default_track().ok_or_else(|| {
        FingerprintError::AudioProcessing("No audio tracks found".to_string())
    })?;

    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            FingerprintError::AudioProcessing(format!(
                "Failed to create decoder for {}: {}",
                extension, e
            ))
        })?;

    let sample_rate = track.codec_params.sample_rate.unwrap_or(SAMPLE_RATE);
    let mut audio = AudioSamples::new(Vec::new(), sample_rate);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => {
                return Err(FingerprintError::AudioProcessing(format!(
                    "Error reading {} packet: {}",
                    extension, e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt frames are skipped rather than failing the whole file.
            Err(SymphoniaError::DecodeError(reason)) => {
                debug!(reason, "Skipping undecodable {} frame", extension);
                continue;
            }
            Err(e) => {
                return Err(FingerprintError::AudioProcessing(format!(
                    "Failed to decode {} frame: {}",
                    extension, e
                )))
            }
        };

        match decoded {
            AudioBufferRef::F32(buf) => {
                let channels = buf.spec().channels.count().max(1);
                for frame_idx in 0..buf.frames() {
                    let mut mixed = 0.0f32;
                    for ch in 0..channels {
                        mixed += buf.chan(ch)[frame_idx];
                    }
                    mixed /= channels as f32;
                    audio.push((mixed.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                }
            }
            AudioBufferRef::S16(buf) => {
                let channels = buf.spec().channels.count().max(1);
                for frame_idx in 0..buf.frames() {
                    let mut mixed: i32 = 0;
                    for ch in 0..channels {
                        mixed += buf.chan(ch)[frame_idx] as i32;
                    }
                    mixed /= channels as i32;
                    audio.push(mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
                }
            }
            AudioBufferRef::S32(buf) => {
                let channels = buf.spec().channels.count().max(1);
                for frame_idx in 0..buf.frames() {
                    let mut mixed: f64 = 0.0;
                    for ch in 0..channels {
                        mixed += buf.chan(ch)[frame_idx] as f64;
                    }
                    mixed /= channels as f64;
                    let clipped = (mixed / i32::MAX as f64).clamp(-1.0, 1.0);
                    audio.push((clipped * i16::MAX as f64) as i16);
                }
            }
            _other => {
                return Err(FingerprintError::AudioProcessing(format!(
                    "Unsupported sample format for {:?}",
                    extension
                )));
            }
        }
    }

    Ok(audio)
}

fn fingerprint_samples(mut samples: AudioSamples) -> Result<Fingerprint> {
    if samples.samples.is_empty() {
        return Err(FingerprintError::AudioProcessing(
            "No audio samples available".to_string(),
        ));
    }

    samples.limit_to_fingerprint_duration();

    debug!(
        sample_count = samples.samples.len(),
        duration_ms = samples.duration_ms(),
        sample_rate = samples.sample_rate,
        "Generating fingerprint from audio samples"
    );

    let mut ctx = Chromaprint::new();

    if !ctx.start(samples.sample_rate as i32, 1) {
        return Err(FingerprintError::AudioProcessing(
            "Failed to start Chromaprint".to_string(),
        ));
    }

    if !ctx.feed(&samples.samples) {
        return Err(FingerprintError::AudioProcessing(
            "Failed to feed samples to Chromaprint".to_string(),
        ));
    }

    if !ctx.finish() {
        return Err(FingerprintError::AudioProcessing(
            "Chromaprint finalize failed".to_string(),
        ));
    }

    let hash = ctx.fingerprint().ok_or_else(|| {
        FingerprintError::AudioProcessing("Chromaprint did not return a fingerprint".to_string())
    })?;

    Ok(Fingerprint::new(hash, samples.duration_ms()))
}
