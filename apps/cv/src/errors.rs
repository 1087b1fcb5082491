use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grounding::DraftError;
use crate::loader::LoadError;
use crate::provenance::ProvenanceError;

/// Severity of a lint or validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        }
    }
}

/// A single finding produced by linting, grounding, or the build pipeline.
///
/// Findings accumulate into a list so one pass reports every problem; only
/// `Severity::Error` findings block output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub code: String,
    pub message: String,
    pub severity: Severity,
    /// Entity id or file path the finding points at.
    pub source: Option<String>,
}

impl Issue {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: Severity::Error,
            source: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: Severity::Warning,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity.as_str(), self.code, self.message)?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(Issue::is_error)
}

/// Top-level error for a build. Every variant maps to a stable code.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Provenance error: {0}")]
    Provenance(#[from] ProvenanceError),

    #[error("Draft error: {0}")]
    Draft(#[from] DraftError),

    #[error("Markdown source not found: {0}")]
    MarkdownMissing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable upper-snake code for reporting.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Load(e) => e.code(),
            CompileError::Provenance(e) => e.code(),
            CompileError::Draft(e) => e.code(),
            CompileError::MarkdownMissing(_) => "MARKDOWN_MISSING",
            CompileError::Io { .. } => "IO_ERROR",
        }
    }
}
