//! Flat-file loader for canonical data and job specs.
//!
//! Layout of a data directory:
//! - `profile.md`, `skills.md`, optional `education.md`
//! - `projects/*.md`
//! - `experience/*.md` (only the files the provenance resolver marks active)

pub mod frontmatter;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::loader::frontmatter::{parse_frontmatter, FrontmatterDocument, FrontmatterError};
use crate::models::{
    CanonicalData, Education, ExperienceEntry, JobSpec, Profile, ProjectEntry, Skills,
};
use crate::provenance::{ExperienceStore, ProvenanceError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Missing required file: {0}")]
    Missing(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },

    #[error(transparent)]
    Provenance(#[from] ProvenanceError),
}

impl LoadError {
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::Missing(_) => "LOAD_MISSING",
            LoadError::Io { .. } => "LOAD_IO",
            LoadError::Invalid { .. } => "LOAD_INVALID",
            LoadError::Provenance(e) => e.code(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Canonical data
// ────────────────────────────────────────────────────────────────────────────

/// Loads every canonical entity from `data_dir`.
pub fn load_canonical_data(data_dir: &Path) -> Result<CanonicalData, LoadError> {
    let profile_path = data_dir.join("profile.md");
    let (mut profile, body): (Profile, String) = load_entity(&profile_path)?;
    if profile.about_me.trim().is_empty() {
        // About-me is a single line; a wrapped body paragraph is joined.
        profile.about_me = body.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    profile.source_path = Some(profile_path.display().to_string());

    let skills_path = data_dir.join("skills.md");
    let (mut skills, _): (Skills, String) = load_entity(&skills_path)?;
    skills.source_path = Some(skills_path.display().to_string());

    let education_path = data_dir.join("education.md");
    let education = if education_path.exists() {
        let (mut education, _): (Education, String) = load_entity(&education_path)?;
        education.source_path = Some(education_path.display().to_string());
        Some(education)
    } else {
        None
    };

    let mut projects = Vec::new();
    for path in list_markdown(&data_dir.join("projects"))? {
        let (mut project, _): (ProjectEntry, String) = load_entity(&path)?;
        project.source_path = Some(path.display().to_string());
        projects.push(project);
    }

    let store = ExperienceStore::new(data_dir);
    let mut experience = Vec::new();
    for active in store.active_files()? {
        let (mut entry, _): (ExperienceEntry, String) = load_entity(&active.path)?;
        entry.source_path = Some(active.path.display().to_string());
        experience.push(entry);
    }

    info!(
        data_dir = %data_dir.display(),
        experience = experience.len(),
        projects = projects.len(),
        "Loaded canonical data"
    );

    Ok(CanonicalData {
        profile,
        experience,
        projects,
        skills,
        education,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Job specs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct JobFrontmatter {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

/// Loads a job description. The body is the raw text; `id` defaults to the file stem.
pub fn load_job_spec(path: &Path) -> Result<JobSpec, LoadError> {
    let doc = read_document(path)?;
    let meta: JobFrontmatter = doc.decode().map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".to_string());

    Ok(JobSpec {
        id: meta.id.filter(|id| !id.trim().is_empty()).unwrap_or(stem),
        title: meta.title.filter(|t| !t.trim().is_empty()),
        raw_text: doc.body.trim().to_string(),
        keywords: meta.keywords,
        source_path: Some(path.display().to_string()),
    })
}

/// Job files under `jobs_dir`, sorted, excluding any README.
pub fn list_job_files(jobs_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    Ok(list_markdown(jobs_dir)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .map(|n| !n.to_string_lossy().eq_ignore_ascii_case("readme.md"))
                .unwrap_or(false)
        })
        .collect())
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn read_document(path: &Path) -> Result<FrontmatterDocument, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_frontmatter(&text).map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

fn load_entity<T: DeserializeOwned>(path: &Path) -> Result<(T, String), LoadError> {
    let doc = read_document(path)?;
    let value = doc.decode().map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded document");
    Ok((value, doc.body))
}

/// `*.md` files directly under `dir`, sorted by path. A missing directory is empty.
fn list_markdown(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "md").unwrap_or(false) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn seed(root: &Path) {
        write(
            &root.join("profile.md"),
            "---\n{\"id\": \"profile\", \"name\": \"Test User\", \"headline\": \"Engineer\", \
             \"location\": \"Remote\", \"email\": \"test@example.com\", \
             \"links\": [{\"label\": \"GitHub\", \"url\": \"https://github.com/test\"}]}\n---\n\
             Builds software.\n",
        );
        write(
            &root.join("skills.md"),
            "---\n{\"id\": \"skills\", \"categories\": [{\"name\": \"Languages\", \"items\": [\"Python\"]}]}\n---\n",
        );
        write(
            &root.join("projects/one.md"),
            "---\n{\"id\": \"proj_one\", \"name\": \"Project One\", \"company\": \"Example Corp\", \
             \"role\": \"Engineer\", \"start_date\": \"2023-01\", \"tags\": [\"python\"], \
             \"bullets\": [\"Improved throughput by 20%.\"]}\n---\n",
        );
    }

    fn experience_md(bullet: &str) -> String {
        format!(
            "---\n{{\"id\": \"exp_one\", \"company\": \"Example Corp\", \"title\": \"Engineer\", \
             \"start_date\": \"2023-01\", \"bullets\": [\"{bullet}\"]}}\n---\n"
        )
    }

    #[test]
    fn test_load_canonical_data_minimal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        seed(&root);

        let data = load_canonical_data(&root).unwrap();
        assert_eq!(data.profile.name, "Test User");
        assert_eq!(data.profile.about_me, "Builds software.");
        assert_eq!(data.projects.len(), 1);
        assert!(data.experience.is_empty());
        assert!(data.education.is_none());
        assert!(data.projects[0].source_path.as_deref().unwrap().ends_with("one.md"));
    }

    #[test]
    fn test_user_experience_overrides_llm_and_legacy() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        seed(&root);
        write(&root.join("experience/llm_exp_one.md"), &experience_md("LLM bullet"));
        write(&root.join("experience/exp_one.md"), &experience_md("Manual bullet"));
        write(
            &root.join("experience/user_exp_one.1700000000.md"),
            &experience_md("Archived user bullet"),
        );
        write(&root.join("experience/user_exp_one.md"), &experience_md("User bullet"));

        let data = load_canonical_data(&root).unwrap();
        assert_eq!(data.experience.len(), 1);
        assert_eq!(data.experience[0].bullets[0], "User bullet");
    }

    #[test]
    fn test_llm_experience_used_without_user_override() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        seed(&root);
        write(&root.join("experience/llm_exp_one.md"), &experience_md("LLM bullet"));
        write(&root.join("experience/exp_one.md"), &experience_md("Manual bullet"));

        let data = load_canonical_data(&root).unwrap();
        assert_eq!(data.experience.len(), 1);
        assert_eq!(data.experience[0].bullets[0], "LLM bullet");
    }

    #[test]
    fn test_about_me_from_multiline_body_is_one_line() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        seed(&root);
        write(
            &root.join("profile.md"),
            "---\n{\"id\": \"profile\", \"name\": \"Test User\", \"headline\": \"Engineer\", \
             \"location\": \"Remote\"}\n---\nI build systems.\nMostly in Rust.\n",
        );

        let data = load_canonical_data(&root).unwrap();
        assert_eq!(data.profile.about_me, "I build systems. Mostly in Rust.");
        let issues = crate::lint::lint_build_inputs(&data);
        assert!(issues.iter().all(|i| i.code != "TEXT_NEWLINE"), "{issues:?}");
    }

    #[test]
    fn test_load_block_yaml_frontmatter() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        seed(&root);
        write(
            &root.join("profile.md"),
            "---\nid: profile\nname: \"Test User\"\nheadline: \"Engineer\"\nlocation: \"Remote\"\n\
             email: \"test@example.com\"\nlinks:\n  - label: \"GitHub\"\n    url: \"https://github.com/test\"\n\
             about_me: \"Builds software.\"\n---\n",
        );
        write(
            &root.join("skills.md"),
            "---\nid: skills\ncategories:\n  - name: Languages\n    items: [Python, C#]\n---\n",
        );

        let data = load_canonical_data(&root).unwrap();
        assert_eq!(data.profile.about_me, "Builds software.");
        assert_eq!(data.profile.links[0].url, "https://github.com/test");
        assert_eq!(data.skills.categories[0].items, vec!["Python", "C#"]);
    }

    #[test]
    fn test_missing_profile_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_canonical_data(tmp.path()).unwrap_err();
        assert_eq!(err.code(), "LOAD_MISSING");
    }

    #[test]
    fn test_invalid_frontmatter_is_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("data");
        seed(&root);
        write(&root.join("projects/bad.md"), "---\n{\"id\": \"bad\"}\n---\n");

        let err = load_canonical_data(&root).unwrap_err();
        assert_eq!(err.code(), "LOAD_INVALID");
    }

    #[test]
    fn test_load_job_spec_defaults_id_to_stem() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("acme.md");
        write(
            &path,
            "---\n{\"title\": \"Backend Engineer\", \"keywords\": [\"Kafka\"]}\n---\nRust and Postgres.\n",
        );
        let job = load_job_spec(&path).unwrap();
        assert_eq!(job.id, "acme");
        assert_eq!(job.title.as_deref(), Some("Backend Engineer"));
        assert_eq!(job.raw_text, "Rust and Postgres.");
        assert_eq!(job.keywords, vec!["Kafka"]);
    }

    #[test]
    fn test_list_job_files_skips_readme() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("b.md"), "B");
        write(&tmp.path().join("a.md"), "A");
        write(&tmp.path().join("README.md"), "docs");
        write(&tmp.path().join("notes.txt"), "x");
        let files = list_job_files(tmp.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }
}
