// SPDX-License-Identifier: GPL-3.0-or-later

use crate::ports::CollaboratorError;
use albumprint_domain::ReleaseId;
use thiserror::Error;

/// Errors that abort an identification run.
///
/// Per-file failures never show up here; they degrade to an unidentified
/// track instead.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("directory does not exist: {0}")]
    DirectoryNotFound(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("release {release_id} was confirmed but is no longer consistent: {reason}")]
    InconsistentMetadata { release_id: ReleaseId, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to set up collaborator: {0}")]
    Collaborator(#[from] CollaboratorError),
}

pub type IdentifyResult<T> = Result<T, IdentifyError>;
