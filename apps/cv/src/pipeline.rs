//! End-to-end build: load, lint, optional drafting, select, render, write, lint outputs.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::drafting::DraftProvider;
use crate::errors::{has_errors, CompileError, Issue, Severity};
use crate::grounding::{materialize_drafts, parse_experience_drafts, GroundingPolicy};
use crate::keywords::job_keywords;
use crate::layout::PageConfig;
use crate::lint::{lint_build_inputs, lint_rendered_output};
use crate::loader::{load_canonical_data, load_job_spec};
use crate::models::{CanonicalData, JobSpec};
use crate::provenance::{Clock, ExperienceStore};
use crate::render::{render, render_markdown_source, DocumentModel, SkillsView};
use crate::selection::{select_with_policy, SelectionPolicy, SelectionResult};
use crate::skills::{filter_skills, parse_skill_highlights};

const GENERIC_STEM: &str = "cv_generic";

/// Inputs and switches for one build.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Where experience backups go; defaults to `<data_dir>/../tmp`.
    pub backup_dir: Option<PathBuf>,
    pub job_path: Option<PathBuf>,
    /// Ask the provider for drafted experience entries.
    pub generate_experience: bool,
    /// Archive hand-authored experience files before writing generated ones.
    pub experience_regenerate: bool,
    /// Ask the provider which skills to emphasize.
    pub highlight_skills: bool,
    pub selection: SelectionPolicy,
    pub grounding: GroundingPolicy,
    pub max_skills_per_category: usize,
    pub page: PageConfig,
}

/// Everything a build reports. Output paths are set only when files were written.
#[derive(Debug, Clone, Default)]
pub struct BuildResult {
    pub issues: Vec<Issue>,
    pub selection: Option<SelectionResult>,
    pub markdown_path: Option<PathBuf>,
    pub pdf_path: Option<PathBuf>,
}

impl BuildResult {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.issues)
    }
}

/// Output file stem for a build: `cv_generic` or `cv_<sanitized job id>`.
pub fn output_stem(job: Option<&JobSpec>) -> String {
    match job {
        None => GENERIC_STEM.to_string(),
        Some(job) => format!("cv_{}", sanitize_stem(&job.id)),
    }
}

/// Keeps ASCII alphanumerics, `-` and `_`; anything else becomes `_`. Never empty.
pub fn sanitize_stem(text: &str) -> String {
    let mapped: String = text
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = mapped.trim_matches('_');
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}

fn experience_store(request: &BuildRequest) -> ExperienceStore {
    let store = ExperienceStore::new(&request.data_dir);
    match &request.backup_dir {
        Some(dir) => store.with_backup_root(dir),
        None => store,
    }
}

/// Loads facts and lints them without building.
pub fn lint_inputs(data_dir: &Path) -> Result<Vec<Issue>, CompileError> {
    let data = load_canonical_data(data_dir)?;
    Ok(lint_build_inputs(&data))
}

/// Selection for `data_dir` against an optional job, for the explain surface.
pub fn explain_selection(
    data_dir: &Path,
    job_path: Option<&Path>,
    policy: &SelectionPolicy,
) -> Result<SelectionResult, CompileError> {
    let data = load_canonical_data(data_dir)?;
    let job = job_path.map(load_job_spec).transpose()?;
    Ok(select_with_policy(&data, job.as_ref(), policy))
}

/// Runs one build.
///
/// Warnings never stop a build. Errors found by lint or drafting stop it before anything is
/// rendered; the returned result lists them. A failed write of generated experience is
/// rolled back by the store and returned as `Err`.
pub fn build_cv(
    request: &BuildRequest,
    provider: &dyn DraftProvider,
    clock: &dyn Clock,
) -> Result<BuildResult, CompileError> {
    let mut result = BuildResult::default();

    let mut data = load_canonical_data(&request.data_dir)?;
    let job = request
        .job_path
        .as_deref()
        .map(load_job_spec)
        .transpose()?;

    result.issues.extend(lint_build_inputs(&data));
    if result.has_errors() {
        warn!("Input lint failed; nothing rendered");
        return Ok(result);
    }

    if request.generate_experience {
        let regenerated = draft_experience(
            request,
            &data,
            job.as_ref(),
            provider,
            clock,
            &mut result.issues,
        )?;
        if result.has_errors() {
            return Ok(result);
        }
        if regenerated {
            data = load_canonical_data(&request.data_dir)?;
            let relint = lint_build_inputs(&data);
            let failed = has_errors(&relint);
            for issue in relint {
                if !result.issues.contains(&issue) {
                    result.issues.push(issue);
                }
            }
            if failed {
                return Ok(result);
            }
        }
    }

    let selection = select_with_policy(&data, job.as_ref(), &request.selection);
    info!(
        experience = selection.selected_experience_ids.len(),
        projects = selection.selected_project_ids.len(),
        "Selected content"
    );

    let skills = skills_view(request, &data, job.as_ref(), provider, &mut result.issues);
    result.selection = Some(selection.clone());
    if result.has_errors() {
        return Ok(result);
    }

    let rendered = render(
        DocumentModel {
            data: &data,
            selection: &selection,
            skills: &skills,
        },
        &request.page,
    );

    fs::create_dir_all(&request.out_dir).map_err(|e| CompileError::io(&request.out_dir, e))?;
    let stem = output_stem(job.as_ref());
    let md_path = request.out_dir.join(format!("{stem}.md"));
    let pdf_path = request.out_dir.join(format!("{stem}.pdf"));
    fs::write(&md_path, &rendered.markdown).map_err(|e| CompileError::io(&md_path, e))?;
    fs::write(&pdf_path, rendered.pdf_bytes()).map_err(|e| CompileError::io(&pdf_path, e))?;
    info!(markdown = %md_path.display(), pdf = %pdf_path.display(), "Wrote CV");

    result.issues.extend(lint_rendered_output(&md_path));
    result.issues.extend(lint_rendered_output(&pdf_path));
    result.markdown_path = Some(md_path);
    result.pdf_path = Some(pdf_path);
    Ok(result)
}

/// Re-renders a hand-edited markdown artifact to `<out_dir>/<stem>.pdf`.
pub fn build_from_markdown(
    source: &Path,
    out_dir: &Path,
    page: &PageConfig,
) -> Result<BuildResult, CompileError> {
    if !source.is_file() {
        return Err(CompileError::MarkdownMissing(source.to_path_buf()));
    }
    let text = fs::read_to_string(source).map_err(|e| CompileError::io(source, e))?;
    let rendered = render_markdown_source(&text, page);

    let stem = source
        .file_stem()
        .map(|s| sanitize_stem(&s.to_string_lossy()))
        .unwrap_or_else(|| GENERIC_STEM.to_string());
    fs::create_dir_all(out_dir).map_err(|e| CompileError::io(out_dir, e))?;
    let pdf_path = out_dir.join(format!("{stem}.pdf"));
    fs::write(&pdf_path, rendered.pdf_bytes()).map_err(|e| CompileError::io(&pdf_path, e))?;
    info!(source = %source.display(), pdf = %pdf_path.display(), "Re-rendered markdown");

    Ok(BuildResult {
        issues: lint_rendered_output(&pdf_path),
        selection: None,
        markdown_path: None,
        pdf_path: Some(pdf_path),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Drafting
// ────────────────────────────────────────────────────────────────────────────

/// Asks the provider for experience drafts and writes whatever survives grounding.
///
/// Returns whether the experience directory changed. Provider and parse failures become an
/// `LLM_GENERATION_FAILED` warning. Batch-level integrity failures are errors. An entry that
/// cannot be materialized is skipped, so its error is reported as a warning here.
fn draft_experience(
    request: &BuildRequest,
    data: &CanonicalData,
    job: Option<&JobSpec>,
    provider: &dyn DraftProvider,
    clock: &dyn Clock,
    issues: &mut Vec<Issue>,
) -> Result<bool, CompileError> {
    let text = match provider.generate_experience(&data.projects, job) {
        Ok(Some(text)) => text,
        Ok(None) => {
            debug!(provider = provider.name(), "No drafted experience");
            return Ok(false);
        }
        Err(e) => {
            issues.push(Issue::warning(
                "LLM_GENERATION_FAILED",
                format!("{} provider failed: {e} [{}]", provider.name(), e.code()),
            ));
            return Ok(false);
        }
    };

    let drafts = match parse_experience_drafts(&text) {
        Ok(drafts) => drafts,
        Err(e) => {
            issues.push(Issue::warning(
                "LLM_GENERATION_FAILED",
                format!("Unusable experience draft: {e} [{}]", e.code()),
            ));
            return Ok(false);
        }
    };

    let materialized = match materialize_drafts(&drafts, &data.projects, &request.grounding) {
        Ok(materialized) => materialized,
        Err(e) => {
            issues.push(Issue::error(e.code(), e.to_string()));
            return Ok(false);
        }
    };
    issues.extend(materialized.issues.into_iter().map(|issue| {
        if issue.severity == Severity::Error {
            Issue {
                severity: Severity::Warning,
                message: format!("{} (entry skipped)", issue.message),
                ..issue
            }
        } else {
            issue
        }
    }));
    if materialized.entries.is_empty() {
        warn!("No drafted experience survived grounding");
        return Ok(false);
    }

    let store = experience_store(request);
    if request.experience_regenerate {
        let archived = store.archive_user_experience_files(clock)?;
        info!(archived = archived.len(), "Archived hand-authored experience");
    }
    let written = store.replace_generated(&materialized.entries, clock)?;
    info!(written = written.len(), "Wrote generated experience");
    Ok(true)
}

fn skills_view(
    request: &BuildRequest,
    data: &CanonicalData,
    job: Option<&JobSpec>,
    provider: &dyn DraftProvider,
    issues: &mut Vec<Issue>,
) -> SkillsView {
    let filter = job.and_then(|job| {
        filter_skills(&data.skills, &job_keywords(job), request.max_skills_per_category)
    });

    let mut highlighted = Vec::new();
    if request.highlight_skills {
        let allowed = filter.clone().unwrap_or_else(|| data.skills.all_items());
        match provider.highlight_skills(&allowed, &data.profile, job) {
            Ok(Some(text)) => match parse_skill_highlights(&text, &allowed) {
                Ok(picked) => highlighted = picked,
                Err(e) => issues.push(Issue::warning(
                    "LLM_SKILL_HIGHLIGHT_FAILED",
                    format!("Unusable skill highlights: {e} [{}]", e.code()),
                )),
            },
            Ok(None) => debug!(provider = provider.name(), "No skill highlights"),
            Err(e) => issues.push(Issue::warning(
                "LLM_SKILL_HIGHLIGHT_FAILED",
                format!("{} provider failed: {e} [{}]", provider.name(), e.code()),
            )),
        }
    }

    SkillsView {
        highlighted,
        filter,
    }
}
