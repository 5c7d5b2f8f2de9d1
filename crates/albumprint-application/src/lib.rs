// SPDX-License-Identifier: GPL-3.0-or-later
pub mod adapters;
pub mod error;
pub mod identify;
pub mod materializer;
pub mod metadata_cache;
pub mod pipeline;
pub mod ports;
pub mod resolution;
pub mod scanner;
pub mod transcode;

#[cfg(test)]
mod test_support;

pub use error::{IdentifyError, IdentifyResult};
pub use identify::{AlbumIdentificationService, IdentificationReport};
pub use materializer::HypothesisMaterializer;
pub use pipeline::TrackPipeline;
pub use ports::{
    CollaboratorError, CollaboratorResult, Fingerprinter, Identification, IdentificationService,
    MetadataStore, Transcoder,
};
pub use resolution::ReleaseResolver;
pub use scanner::{scan_directory, ScannedAudioFile};
