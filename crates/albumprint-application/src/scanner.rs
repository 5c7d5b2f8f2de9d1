// SPDX-License-Identifier: GPL-3.0-or-later

use crate::error::{IdentifyError, IdentifyResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// An audio file accepted for identification, numbered in directory order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedAudioFile {
    /// 1-based position among accepted files.
    pub position: u32,
    pub path: PathBuf,
    pub extension: String,
}

/// List the audio files directly inside `root`, sorted by file name.
///
/// Files whose extension is not in `extensions` are skipped and do not
/// consume a position. Subdirectories are ignored.
pub fn scan_directory(
    root: impl AsRef<Path>,
    extensions: &[String],
) -> IdentifyResult<Vec<ScannedAudioFile>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(IdentifyError::DirectoryNotFound(root.display().to_string()));
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(root).map_err(|err| IdentifyError::Io(err.to_string()))? {
        let entry = entry.map_err(|err| IdentifyError::Io(err.to_string()))?;
        let path = entry.path();

        // Follows symlinks, so linked files count as regular entries.
        if !path.is_file() {
            debug!(target: "pipeline", path = %path.display(), "ignoring non-file entry");
            continue;
        }

        paths.push(path);
    }

    paths.sort_by(|left, right| left.file_name().cmp(&right.file_name()));

    let mut scanned = Vec::new();
    for path in paths {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        let Some(extension) = extension.filter(|ext| is_accepted(ext, extensions)) else {
            info!(target: "pipeline", path = %path.display(), "skipping non-audio file");
            continue;
        };

        scanned.push(ScannedAudioFile {
            position: scanned.len() as u32 + 1,
            path,
            extension,
        });
    }

    debug!(target: "pipeline", accepted = scanned.len(), "directory scanned");
    Ok(scanned)
}

fn is_accepted(extension: &str, extensions: &[String]) -> bool {
    extensions
        .iter()
        .any(|accepted| accepted.eq_ignore_ascii_case(extension))
}
