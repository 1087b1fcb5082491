//! Drafting collaborator: the only boundary where model output enters the compiler.
//!
//! Providers return raw response text. Nothing returned here is trusted; drafts go through
//! `grounding`, highlights through `skills` and structured CV imports through `ingest` before
//! they can reach a rendered CV.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{JobSpec, Profile, ProjectEntry};

pub mod prompts;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think pattern is valid"));

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Response file missing: paste the model output into {0} and retry")]
    ResponseMissing(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn code(&self) -> &'static str {
        match self {
            ProviderError::ResponseMissing(_) => "LLM_RESPONSE_MISSING",
            ProviderError::Io { .. } => "LLM_IO",
            ProviderError::Json(_) => "LLM_JSON",
        }
    }
}

/// Source of model-drafted text.
///
/// `Ok(None)` means the provider has nothing to offer and the build continues without it.
pub trait DraftProvider {
    fn name(&self) -> &'static str;

    /// Raw response for an experience-drafting request over `projects`.
    fn generate_experience(
        &self,
        projects: &[ProjectEntry],
        job: Option<&JobSpec>,
    ) -> Result<Option<String>, ProviderError>;

    /// Raw response for a skill-highlighting request.
    fn highlight_skills(
        &self,
        skills: &[String],
        profile: &Profile,
        job: Option<&JobSpec>,
    ) -> Result<Option<String>, ProviderError>;

    /// Raw response for structuring text extracted from an existing CV into canonical facts.
    fn structure_cv(&self, cv_text: &str) -> Result<Option<String>, ProviderError>;
}

/// Provider that never drafts anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

impl DraftProvider for NoopProvider {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn generate_experience(
        &self,
        _projects: &[ProjectEntry],
        _job: Option<&JobSpec>,
    ) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }

    fn highlight_skills(
        &self,
        _skills: &[String],
        _profile: &Profile,
        _job: Option<&JobSpec>,
    ) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }

    fn structure_cv(&self, _cv_text: &str) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }
}

/// Offline provider: writes each request next to where it expects a pasted response.
///
/// For the experience request it writes `experience_request.json` and reads
/// `experience_response.json` (likewise `skills_*` and `ingest_*`). A missing response file is an error so the
/// user knows where to paste the model output.
#[derive(Debug, Clone)]
pub struct ManualProvider {
    dir: PathBuf,
}

impl ManualProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn exchange(&self, stem: &str, prompt: String) -> Result<Option<String>, ProviderError> {
        fs::create_dir_all(&self.dir).map_err(|source| ProviderError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let request_path = self.dir.join(format!("{stem}_request.json"));
        let request = json!({
            "system": prompts::JSON_ONLY_SYSTEM,
            "prompt": prompt,
        });
        let body = serde_json::to_string_pretty(&request)? + "\n";
        fs::write(&request_path, body).map_err(|source| ProviderError::Io {
            path: request_path.clone(),
            source,
        })?;
        info!(request = %request_path.display(), "Wrote manual drafting request");

        let response_path = self.dir.join(format!("{stem}_response.json"));
        if !response_path.exists() {
            return Err(ProviderError::ResponseMissing(response_path));
        }
        let raw = read_text(&response_path)?;
        Ok(Some(extract_response_content(&raw)))
    }
}

impl DraftProvider for ManualProvider {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn generate_experience(
        &self,
        projects: &[ProjectEntry],
        job: Option<&JobSpec>,
    ) -> Result<Option<String>, ProviderError> {
        self.exchange("experience", prompts::experience_prompt(projects, job)?)
    }

    fn highlight_skills(
        &self,
        skills: &[String],
        profile: &Profile,
        job: Option<&JobSpec>,
    ) -> Result<Option<String>, ProviderError> {
        self.exchange("skills", prompts::skills_prompt(skills, profile, job)?)
    }

    fn structure_cv(&self, cv_text: &str) -> Result<Option<String>, ProviderError> {
        self.exchange("ingest", prompts::ingest_prompt(cv_text))
    }
}

fn read_text(path: &Path) -> Result<String, ProviderError> {
    fs::read_to_string(path).map_err(|source| ProviderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Response envelopes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectContent {
    content: String,
}

/// Unwraps a saved API response to the model's text.
///
/// Accepts a chat-completions body (`choices[0].message.content`), a messages body (first
/// `text` content block) or `{"content": "..."}`. Anything else is returned unchanged.
pub fn extract_response_content(raw: &str) -> String {
    if let Ok(chat) = serde_json::from_str::<ChatCompletion>(raw) {
        if let Some(content) = chat.choices.into_iter().find_map(|c| c.message.content) {
            return content;
        }
    }
    if let Ok(messages) = serde_json::from_str::<MessagesResponse>(raw) {
        if let Some(text) = messages
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
        {
            return text;
        }
    }
    if let Ok(direct) = serde_json::from_str::<DirectContent>(raw) {
        return direct.content;
    }
    raw.to_string()
}

/// Pulls the YAML or JSON payload out of free-form model text.
///
/// Drops `<think>` blocks, then prefers the first fenced block mentioning `marker`, then
/// everything from a bare `marker:` line to the end, then the span from the first `{` to the
/// last `}`.
pub fn extract_payload(text: &str, marker: &str) -> String {
    let stripped = THINK_RE.replace_all(text.trim(), "");
    let stripped = stripped.trim();

    if stripped.contains("```") {
        for block in stripped.split("```").skip(1).step_by(2) {
            let block = strip_fence_language(block);
            if block.contains(marker) {
                debug!("Using fenced block from model response");
                return block.trim().to_string();
            }
        }
    }

    if let Some(start) = yaml_key_line(stripped, marker) {
        debug!("Using YAML block from model response");
        return stripped[start..].trim().to_string();
    }

    match (stripped.find('{'), stripped.rfind('}')) {
        (Some(start), Some(end)) if start < end => stripped[start..=end].to_string(),
        _ => stripped.to_string(),
    }
}

/// Byte offset of the first line that is exactly `marker:` (surrounding whitespace allowed).
fn yaml_key_line(text: &str, marker: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim().strip_suffix(':').map(str::trim_end) == Some(marker) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Drops a `json`/`yaml`/`yml` language tag from the first line of a fenced block.
fn strip_fence_language(block: &str) -> &str {
    match block.split_once('\n') {
        Some((first, rest))
            if ["json", "yaml", "yml"]
                .iter()
                .any(|tag| first.trim().eq_ignore_ascii_case(tag)) =>
        {
            rest
        }
        _ => block,
    }
}
