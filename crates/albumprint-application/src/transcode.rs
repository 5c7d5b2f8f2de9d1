// SPDX-License-Identifier: GPL-3.0-or-later

//! Decoding source files to WAV before fingerprinting.
//!
//! Decoded files are cached under a directory keyed by the source path, so a
//! second run over the same album skips the decoder entirely. The cache is
//! purely a speed-up: deleting it never changes results.

use crate::ports::{CollaboratorError, CollaboratorResult, Transcoder};
use albumprint_config::PipelineConfig;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs an external decoder (ffmpeg by default) into a WAV cache.
#[derive(Debug, Clone)]
pub struct CommandTranscoder {
    program: String,
    args: Vec<String>,
    cache_dir: PathBuf,
}

impl CommandTranscoder {
    /// `args` may contain `{input}` and `{output}` placeholders.
    pub fn new(program: impl Into<String>, args: Vec<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.decoder_program.clone(),
            config.decoder_args.clone(),
            config.cache_dir.clone(),
        )
    }

    /// Location of the cached waveform for `source`.
    pub fn cached_path(&self, source: &Path) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);

        let stem = source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "track".to_string());

        self.cache_dir
            .join(format!("{:016x}-{}.wav", hasher.finish(), stem))
    }

    fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

#[async_trait]
impl Transcoder for CommandTranscoder {
    async fn decode(&self, source: &Path) -> CollaboratorResult<PathBuf> {
        let output = self.cached_path(source);

        if tokio::fs::try_exists(&output).await.unwrap_or(false) {
            debug!(target: "pipeline", output = %output.display(), "using cached waveform");
            return Ok(output);
        }

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| CollaboratorError::Transcode(format!("cannot create cache dir: {}", e)))?;

        // Decode next to the final name so an interrupted run never leaves a
        // truncated file that later runs would trust.
        let partial = output.with_extension("partial.wav");

        info!(target: "pipeline", source = %source.display(), "decoding");
        let result = Command::new(&self.program)
            .args(self.render_args(source, &partial))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                CollaboratorError::Transcode(format!("failed to run {}: {}", self.program, e))
            })?;

        if !result.status.success() {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(CollaboratorError::Transcode(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        tokio::fs::rename(&partial, &output)
            .await
            .map_err(|e| CollaboratorError::Transcode(format!("cannot finalize waveform: {}", e)))?;

        Ok(output)
    }
}

/// Hands the source file straight to the fingerprinter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranscoder;

#[async_trait]
impl Transcoder for PassthroughTranscoder {
    async fn decode(&self, source: &Path) -> CollaboratorResult<PathBuf> {
        Ok(source.to_path_buf())
    }
}
