//! Deterministic, ATS-safe CV compiler.
//!
//! Canonical facts are loaded from flat files, optionally narrowed to a job description,
//! optionally extended with model-drafted experience that must stay grounded in project facts,
//! and rendered to ASCII markdown plus a paginated PDF. An existing PDF CV can be imported to
//! bootstrap the fact files.

pub mod config;
pub mod drafting;
pub mod errors;
pub mod grounding;
pub mod ingest;
pub mod keywords;
pub mod layout;
pub mod lint;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod provenance;
pub mod render;
pub mod selection;
pub mod skills;

pub use errors::{CompileError, Issue, Severity};
pub use pipeline::{build_cv, BuildRequest, BuildResult};
