//! Experience provenance.
//!
//! One logical experience entry can exist on disk as a hand-written file, a model-generated
//! file, and any number of archived copies. This module is the only place that interprets
//! those file names; everything else goes through [`ExperienceStore`].

pub mod store;
pub mod variant;

pub use store::{ActiveFile, ExperienceStore};
pub use variant::{Authorship, FileVariant};

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("Failed to {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize experience {id}: {message}")]
    Serialize { id: String, message: String },

    #[error("Regeneration failed ({cause}) and restore also failed ({restore})")]
    RestoreFailed {
        cause: Box<ProvenanceError>,
        restore: Box<ProvenanceError>,
    },
}

impl ProvenanceError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProvenanceError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ProvenanceError::Io { .. } => "PROVENANCE_IO",
            ProvenanceError::Serialize { .. } => "PROVENANCE_SERIALIZE",
            ProvenanceError::RestoreFailed { .. } => "PROVENANCE_RESTORE_FAILED",
        }
    }
}

/// Source of the epoch stamped into archive and backup names.
pub trait Clock {
    fn now_epoch(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }
}

/// A pinned epoch, for tests and reproducible runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_epoch(&self) -> u64 {
        self.0
    }
}
