//! Anti-fabrication checks for model-drafted experience entries.
//!
//! A draft may only say what its cited projects already say. Structural problems with a batch
//! are hard errors; ungrounded numbers and keywords are accumulated as warnings.

pub mod draft;
pub mod validator;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ExperienceEntry;

pub use draft::{parse_experience_drafts, sanitize_id, ExperienceDraft};
pub use validator::{
    check_draft, materialize_drafts, validate, AcceptedDraft, GroundingPolicy, Materialized,
};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Draft payload is not valid YAML or JSON: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Draft payload has the wrong shape: {0}")]
    Malformed(String),

    #[error("Draft batch has {count} experiences, at most {max} allowed")]
    TooMany { count: usize, max: usize },

    #[error("Experience `{id}` has no source_project_ids")]
    MissingSources { id: String },

    #[error("Experience `{id}` cites unknown project `{project_id}`")]
    UnknownProject { id: String, project_id: String },

    #[error("Unknown skill selected: {0}")]
    UnknownSkill(String),
}

impl DraftError {
    pub fn code(&self) -> &'static str {
        match self {
            DraftError::Parse(_) => "DRAFT_PARSE_FAILED",
            DraftError::Malformed(_) => "DRAFT_MALFORMED",
            DraftError::TooMany { .. } => "DRAFT_TOO_MANY",
            DraftError::MissingSources { .. } => "MISSING_SOURCE_PROJECTS",
            DraftError::UnknownProject { .. } => "UNKNOWN_PROJECT_ID",
            DraftError::UnknownSkill(_) => "SKILL_UNKNOWN",
        }
    }
}

/// A validated draft ready to be written as `llm_<id>.md`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedExperience {
    #[serde(flatten)]
    pub entry: ExperienceEntry,
    pub source_project_ids: Vec<String>,
}
