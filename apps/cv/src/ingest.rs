//! Bootstrap canonical files from an existing PDF CV.
//!
//! Text is pulled from the PDF, structured by a drafting provider, then written as
//! hand-authored files the user is expected to review. Missing required fields get a visible
//! placeholder and a warning instead of failing the import.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::drafting::{extract_payload, DraftProvider, ProviderError};
use crate::grounding::sanitize_id;
use crate::loader::frontmatter::{render_frontmatter, FrontmatterError};
use crate::models::{
    Education, EducationEntry, ExperienceEntry, Link, Profile, ProjectEntry, Skills,
    SkillsCategory,
};
use crate::provenance::variant::user_file_name;

/// Scanned PDFs yield little or no text; below this many non-whitespace chars we refuse.
pub const MIN_TEXT_CHARS: usize = 200;

pub const PLACEHOLDER: &str = "TODO: edit this field";

const NOTE_BODY: &str = "\nNotes (not rendered):\n- Generated from PDF.\n";
const PROFILE_KEY: &str = "profile";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to extract text from {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error(
        "PDF contains too little extractable text ({found} chars); it may be scanned. \
         Run OCR or provide a machine-readable PDF."
    )]
    TooLittleText { found: usize },

    #[error("Provider `{0}` returned nothing to import")]
    NoResponse(&'static str),

    #[error("Ingest payload is not valid YAML or JSON: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Ingest payload has the wrong shape: {0}")]
    Malformed(String),

    #[error("Refusing to overwrite existing file: {0}")]
    Exists(PathBuf),

    #[error("Failed to render {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl IngestError {
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::Pdf { .. } => "INGEST_PDF",
            IngestError::TooLittleText { .. } => "INGEST_TOO_LITTLE_TEXT",
            IngestError::NoResponse(_) => "INGEST_NO_RESPONSE",
            IngestError::Parse(_) => "INGEST_PARSE_FAILED",
            IngestError::Malformed(_) => "INGEST_MALFORMED",
            IngestError::Exists(_) => "INGEST_EXISTS",
            IngestError::Render { .. } => "INGEST_RENDER",
            IngestError::Io { .. } => "INGEST_IO",
            IngestError::Provider(e) => e.code(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Parsed CV
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedLink {
    pub label: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedProfile {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub about_me: Option<String>,
    pub links: Vec<ParsedLink>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedExperience {
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub bullets: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedProject {
    pub name: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub bullets: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSkillCategory {
    pub name: Option<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEducation {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Everything a model pulled out of a CV. Every field is optional at this stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCv {
    pub profile: ParsedProfile,
    pub experience: Vec<ParsedExperience>,
    pub projects: Vec<ParsedProject>,
    pub skills: Vec<ParsedSkillCategory>,
    pub education: Vec<ParsedEducation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestResult {
    pub written_paths: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction
// ────────────────────────────────────────────────────────────────────────────

/// Text of a machine-readable PDF.
pub fn extract_pdf_text(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = pdf_extract::extract_text_from_mem(&bytes).map_err(|e| IngestError::Pdf {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    ensure_enough_text(text.trim())
}

fn ensure_enough_text(text: &str) -> Result<String, IngestError> {
    let found = text.chars().filter(|c| !c.is_whitespace()).count();
    if found < MIN_TEXT_CHARS {
        return Err(IngestError::TooLittleText { found });
    }
    Ok(text.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing
// ────────────────────────────────────────────────────────────────────────────

/// Parses a model response (YAML or JSON, fences and reasoning tolerated).
pub fn parse_ingest_response(text: &str) -> Result<ParsedCv, IngestError> {
    let payload = extract_payload(text, PROFILE_KEY);
    let data: Value = serde_yaml::from_str(&payload)?;
    parse_ingest_payload(&data)
}

/// Builds a [`ParsedCv`] from a decoded payload.
///
/// Only a missing `profile` object is an error. Non-string values become `None`, non-object
/// list entries are skipped and blank strings are dropped.
pub fn parse_ingest_payload(payload: &Value) -> Result<ParsedCv, IngestError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| IngestError::Malformed("payload must be an object".into()))?;
    let profile = obj
        .get(PROFILE_KEY)
        .and_then(Value::as_object)
        .ok_or_else(|| IngestError::Malformed("missing or invalid `profile` section".into()))?;

    Ok(ParsedCv {
        profile: ParsedProfile {
            name: coerce_str(profile.get("name")),
            headline: coerce_str(profile.get("headline")),
            location: coerce_str(profile.get("location")),
            email: coerce_str(profile.get("email")),
            about_me: coerce_str(profile.get("about_me")),
            links: objects(profile.get("links"))
                .map(|link| ParsedLink {
                    label: coerce_str(link.get("label")),
                    url: coerce_str(link.get("url")),
                })
                .collect(),
        },
        experience: objects(obj.get("experience"))
            .map(|item| ParsedExperience {
                company: coerce_str(item.get("company")),
                title: coerce_str(item.get("title")),
                location: coerce_str(item.get("location")),
                start_date: coerce_str(item.get("start_date")),
                end_date: coerce_str(item.get("end_date")),
                bullets: coerce_str_list(item.get("bullets")),
                tags: coerce_str_list(item.get("tags")),
            })
            .collect(),
        projects: objects(obj.get("projects"))
            .map(|item| ParsedProject {
                name: coerce_str(item.get("name")),
                company: coerce_str(item.get("company")),
                role: coerce_str(item.get("role")),
                start_date: coerce_str(item.get("start_date")),
                end_date: coerce_str(item.get("end_date")),
                bullets: coerce_str_list(item.get("bullets")),
                tags: coerce_str_list(item.get("tags")),
            })
            .collect(),
        skills: objects(obj.get("skills"))
            .map(|item| ParsedSkillCategory {
                name: coerce_str(item.get("name")),
                items: coerce_str_list(item.get("items")),
            })
            .collect(),
        education: objects(obj.get("education"))
            .map(|item| ParsedEducation {
                institution: coerce_str(item.get("institution")),
                degree: coerce_str(item.get("degree")),
                location: coerce_str(item.get("location")),
                start_date: coerce_str(item.get("start_date")),
                end_date: coerce_str(item.get("end_date")),
            })
            .collect(),
    })
}

fn objects<'a>(value: Option<&'a Value>) -> impl Iterator<Item = &'a Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn coerce_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn coerce_str_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| coerce_str(Some(item)))
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Writing
// ────────────────────────────────────────────────────────────────────────────

/// Writes `profile.md`, `skills.md`, `education.md`, `experience/user_<id>.md` and
/// `projects/<id>.md` under `data_dir`.
///
/// Every target is checked before anything is written: unless `overwrite` is set, a single
/// existing file aborts the import and leaves the directory untouched.
pub fn write_ingest_files(
    data_dir: &Path,
    parsed: &ParsedCv,
    overwrite: bool,
) -> Result<IngestResult, IngestError> {
    let mut planner = Planner::default();
    let mut files: Vec<(PathBuf, String)> = Vec::new();

    let profile = planner.profile(&parsed.profile);
    files.push(render(data_dir.join("profile.md"), &profile)?);

    let skills = Skills {
        id: "skills".to_string(),
        categories: parsed
            .skills
            .iter()
            .map(|category| SkillsCategory {
                name: planner.require(category.name.as_deref(), "skills.category.name"),
                items: category.items.clone(),
            })
            .collect(),
        source_path: None,
    };
    files.push(render(data_dir.join("skills.md"), &skills)?);

    let education = Education {
        id: "education".to_string(),
        entries: parsed
            .education
            .iter()
            .map(|entry| EducationEntry {
                institution: planner.require(entry.institution.as_deref(), "education.institution"),
                degree: planner.require(entry.degree.as_deref(), "education.degree"),
                location: entry.location.clone(),
                start_date: entry.start_date.clone(),
                end_date: entry.end_date.clone(),
            })
            .collect(),
        languages: Vec::new(),
        source_path: None,
    };
    files.push(render(data_dir.join("education.md"), &education)?);

    for (idx, entry) in parsed.experience.iter().enumerate() {
        let fallback = (idx + 1).to_string();
        let id = planner.unique_id(&format!(
            "exp_{}_{}",
            entry.company.as_deref().unwrap_or("unknown"),
            entry.start_date.as_deref().unwrap_or(&fallback)
        ));
        let experience = ExperienceEntry {
            company: planner.require(entry.company.as_deref(), "experience.company"),
            title: planner.require(entry.title.as_deref(), "experience.title"),
            location: entry.location.clone(),
            start_date: planner.require(entry.start_date.as_deref(), "experience.start_date"),
            end_date: entry.end_date.clone(),
            tags: entry.tags.clone(),
            keywords: Vec::new(),
            bullets: entry.bullets.clone(),
            source_path: None,
            id,
        };
        let path = data_dir.join("experience").join(user_file_name(&experience.id));
        files.push(render(path, &experience)?);
    }

    for (idx, entry) in parsed.projects.iter().enumerate() {
        let fallback = (idx + 1).to_string();
        let id = planner.unique_id(&format!(
            "proj_{}",
            entry.name.as_deref().unwrap_or(&fallback)
        ));
        let project = ProjectEntry {
            name: planner.require(entry.name.as_deref(), "projects.name"),
            company: entry.company.clone(),
            role: entry.role.clone(),
            start_date: entry.start_date.clone(),
            end_date: entry.end_date.clone(),
            tags: entry.tags.clone(),
            bullets: entry.bullets.clone(),
            source_path: None,
            id,
        };
        let path = data_dir.join("projects").join(format!("{}.md", project.id));
        files.push(render(path, &project)?);
    }

    if !overwrite {
        if let Some((path, _)) = files.iter().find(|(path, _)| path.exists()) {
            return Err(IngestError::Exists(path.clone()));
        }
    }

    let mut written_paths = Vec::with_capacity(files.len());
    for (path, content) in files {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| IngestError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        written_paths.push(path);
    }

    for warning in &planner.warnings {
        warn!("{warning}");
    }
    info!(files = written_paths.len(), "Wrote imported CV files");
    Ok(IngestResult {
        written_paths,
        warnings: planner.warnings,
    })
}

/// Extracts `pdf_path`, asks `provider` to structure it and writes the result.
pub fn ingest_pdf(
    data_dir: &Path,
    pdf_path: &Path,
    provider: &dyn DraftProvider,
    overwrite: bool,
) -> Result<IngestResult, IngestError> {
    let text = extract_pdf_text(pdf_path)?;
    info!(
        pdf = %pdf_path.display(),
        chars = text.len(),
        provider = provider.name(),
        "Extracted CV text"
    );
    import_cv_text(data_dir, &text, provider, overwrite)
}

/// Structures already-extracted CV text through `provider` and writes the result.
pub fn import_cv_text(
    data_dir: &Path,
    cv_text: &str,
    provider: &dyn DraftProvider,
    overwrite: bool,
) -> Result<IngestResult, IngestError> {
    let raw = provider
        .structure_cv(cv_text)?
        .ok_or(IngestError::NoResponse(provider.name()))?;
    let parsed = parse_ingest_response(&raw)?;
    write_ingest_files(data_dir, &parsed, overwrite)
}

fn render<T: Serialize>(path: PathBuf, value: &T) -> Result<(PathBuf, String), IngestError> {
    match render_frontmatter(value, NOTE_BODY) {
        Ok(content) => Ok((path, content)),
        Err(source) => Err(IngestError::Render { path, source }),
    }
}

/// Tracks ids handed out and placeholder warnings while files are planned.
#[derive(Debug)]
struct Planner {
    used_ids: HashSet<String>,
    warnings: Vec<String>,
}

impl Default for Planner {
    fn default() -> Self {
        Self {
            used_ids: ["profile", "skills", "education"]
                .into_iter()
                .map(String::from)
                .collect(),
            warnings: Vec::new(),
        }
    }
}

impl Planner {
    fn require(&mut self, value: Option<&str>, field: &str) -> String {
        match value {
            Some(value) => value.to_string(),
            None => {
                self.warnings.push(format!("Missing {field}; set placeholder."));
                PLACEHOLDER.to_string()
            }
        }
    }

    /// Sanitized `base`, suffixed `_2`, `_3`, ... until unused.
    fn unique_id(&mut self, base: &str) -> String {
        let mut base = sanitize_id(base);
        if base.is_empty() {
            base = "item".to_string();
        }
        let mut candidate = base.clone();
        let mut counter = 2;
        while self.used_ids.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        self.used_ids.insert(candidate.clone());
        candidate
    }

    fn profile(&mut self, parsed: &ParsedProfile) -> Profile {
        Profile {
            id: "profile".to_string(),
            name: self.require(parsed.name.as_deref(), "profile.name"),
            headline: self.require(parsed.headline.as_deref(), "profile.headline"),
            location: self.require(parsed.location.as_deref(), "profile.location"),
            email: parsed.email.clone(),
            links: parsed
                .links
                .iter()
                .filter(|link| link.label.is_some() || link.url.is_some())
                .map(|link| Link {
                    label: self.require(link.label.as_deref(), "profile.links.label"),
                    url: self.require(link.url.as_deref(), "profile.links.url"),
                })
                .collect(),
            about_me: self.require(parsed.about_me.as_deref(), "profile.about_me"),
            source_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drafting::{ManualProvider, NoopProvider};
    use crate::loader::load_canonical_data;
    use serde_json::json;
    use tempfile::TempDir;

    fn parsed_cv() -> ParsedCv {
        ParsedCv {
            profile: ParsedProfile {
                name: Some("Jane Doe".to_string()),
                headline: Some("Engineer".to_string()),
                location: Some("Remote".to_string()),
                email: Some("jane@example.com".to_string()),
                about_me: Some("Builds reliable systems.".to_string()),
                links: vec![],
            },
            experience: vec![ParsedExperience {
                company: Some("Acme".to_string()),
                title: Some("Developer".to_string()),
                start_date: Some("2022-01".to_string()),
                bullets: vec!["Did a thing.".to_string()],
                tags: vec!["python".to_string()],
                ..Default::default()
            }],
            projects: vec![],
            skills: vec![ParsedSkillCategory {
                name: Some("Languages".to_string()),
                items: vec!["Python".to_string()],
            }],
            education: vec![],
        }
    }

    #[test]
    fn test_parse_ingest_payload() {
        let payload = json!({
            "profile": {
                "name": "Jane Doe",
                "headline": " Engineer ",
                "location": "Remote",
                "email": "jane@example.com",
                "links": [{"label": "GitHub", "url": "https://github.com/jane"}, "junk"],
                "about_me": "Builds reliable systems."
            },
            "experience": [{
                "company": "Acme",
                "title": "Developer",
                "start_date": "2022-01",
                "end_date": "",
                "bullets": ["Did a thing.", 3, " "],
                "tags": ["python"]
            }],
            "projects": "none",
            "skills": [{"name": "Languages", "items": ["Python"]}]
        });
        let parsed = parse_ingest_payload(&payload).unwrap();
        assert_eq!(parsed.profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(parsed.profile.headline.as_deref(), Some("Engineer"));
        assert_eq!(parsed.profile.links.len(), 1);
        assert_eq!(parsed.experience[0].company.as_deref(), Some("Acme"));
        assert_eq!(parsed.experience[0].end_date, None);
        assert_eq!(parsed.experience[0].bullets, vec!["Did a thing."]);
        assert!(parsed.projects.is_empty());
        assert!(parsed.education.is_empty());
        assert_eq!(parsed.skills[0].name.as_deref(), Some("Languages"));
    }

    #[test]
    fn test_parse_ingest_payload_requires_profile() {
        let err = parse_ingest_payload(&json!({"experience": []})).unwrap_err();
        assert_eq!(err.code(), "INGEST_MALFORMED");
        let err = parse_ingest_payload(&json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), "INGEST_MALFORMED");
    }

    #[test]
    fn test_parse_ingest_response_fenced() {
        let text = "Here it is:\n```json\n{\"profile\": {\"name\": \"Jane Doe\"}}\n```";
        let parsed = parse_ingest_response(text).unwrap();
        assert_eq!(parsed.profile.name.as_deref(), Some("Jane Doe"));
        assert_eq!(
            parse_ingest_response("profile: {name: [oops").unwrap_err().code(),
            "INGEST_PARSE_FAILED"
        );
    }

    #[test]
    fn test_too_little_text_is_rejected() {
        let err = ensure_enough_text("Jane Doe\nEngineer").unwrap_err();
        assert_eq!(err.code(), "INGEST_TOO_LITTLE_TEXT");
        let long = "word ".repeat(60);
        assert!(ensure_enough_text(long.trim()).is_ok());
    }

    #[test]
    fn test_extract_rejects_non_pdf() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cv.pdf");
        fs::write(&path, "not a pdf").unwrap();
        assert_eq!(extract_pdf_text(&path).unwrap_err().code(), "INGEST_PDF");
        let missing = extract_pdf_text(&tmp.path().join("nope.pdf")).unwrap_err();
        assert_eq!(missing.code(), "INGEST_IO");
    }

    #[test]
    fn test_write_ingest_files_loads_back() {
        let tmp = TempDir::new().unwrap();
        let data_dir = tmp.path().join("data");
        let result = write_ingest_files(&data_dir, &parsed_cv(), false).unwrap();
        assert_eq!(result.written_paths.len(), 4);
        assert!(result.warnings.is_empty());
        assert!(data_dir.join("experience/user_exp_acme_2022_01.md").exists());

        let profile = fs::read_to_string(data_dir.join("profile.md")).unwrap();
        assert!(profile.starts_with("---\nid: profile\n"));
        assert!(profile.ends_with("---\n\nNotes (not rendered):\n- Generated from PDF.\n"));

        let data = load_canonical_data(&data_dir).unwrap();
        assert_eq!(data.profile.name, "Jane Doe");
        assert_eq!(data.profile.about_me, "Builds reliable systems.");
        assert_eq!(data.experience.len(), 1);
        assert_eq!(data.experience[0].title, "Developer");
        assert_eq!(data.skills.all_items(), vec!["Python"]);
    }

    #[test]
    fn test_missing_fields_get_placeholders_and_unique_ids() {
        let mut parsed = parsed_cv();
        parsed.profile.about_me = None;
        parsed.experience.push(ParsedExperience {
            company: Some("Acme".to_string()),
            start_date: Some("2022-01".to_string()),
            ..Default::default()
        });
        parsed.projects = vec![ParsedProject::default(), ParsedProject::default()];

        let tmp = TempDir::new().unwrap();
        let result = write_ingest_files(tmp.path(), &parsed, false).unwrap();
        assert_eq!(
            result.warnings,
            vec![
                "Missing profile.about_me; set placeholder.",
                "Missing experience.title; set placeholder.",
                "Missing projects.name; set placeholder.",
                "Missing projects.name; set placeholder.",
            ]
        );
        assert!(tmp.path().join("experience/user_exp_acme_2022_01_2.md").exists());
        assert!(tmp.path().join("projects/proj_1.md").exists());
        assert!(tmp.path().join("projects/proj_2.md").exists());

        let data = load_canonical_data(tmp.path()).unwrap();
        assert_eq!(data.profile.about_me, PLACEHOLDER);
        assert_eq!(data.projects[0].name, PLACEHOLDER);
    }

    #[test]
    fn test_existing_files_are_not_overwritten() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("experience")).unwrap();
        fs::write(tmp.path().join("experience/user_exp_acme_2022_01.md"), "mine").unwrap();

        let err = write_ingest_files(tmp.path(), &parsed_cv(), false).unwrap_err();
        assert_eq!(err.code(), "INGEST_EXISTS");
        assert!(!tmp.path().join("profile.md").exists());
        assert_eq!(
            fs::read_to_string(tmp.path().join("experience/user_exp_acme_2022_01.md")).unwrap(),
            "mine"
        );

        let result = write_ingest_files(tmp.path(), &parsed_cv(), true).unwrap();
        assert_eq!(result.written_paths.len(), 4);
        assert_ne!(
            fs::read_to_string(tmp.path().join("experience/user_exp_acme_2022_01.md")).unwrap(),
            "mine"
        );
    }

    #[test]
    fn test_ingest_pdf_stops_on_unreadable_pdf() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cv.pdf");
        fs::write(&path, "not a pdf").unwrap();
        let err = ingest_pdf(tmp.path(), &path, &NoopProvider, false).unwrap_err();
        assert_eq!(err.code(), "INGEST_PDF");
        assert!(!tmp.path().join("profile.md").exists());
    }

    #[test]
    fn test_import_needs_provider_output() {
        let tmp = TempDir::new().unwrap();
        let err = import_cv_text(tmp.path(), "Jane Doe", &NoopProvider, false).unwrap_err();
        assert_eq!(err.code(), "INGEST_NO_RESPONSE");
    }

    #[test]
    fn test_import_through_manual_exchange() {
        let tmp = TempDir::new().unwrap();
        let exchange = tmp.path().join("llm");
        fs::create_dir_all(&exchange).unwrap();
        fs::write(
            exchange.join("ingest_response.json"),
            r#"{"content": "```json\n{\"profile\": {\"name\": \"Jane Doe\", \"headline\": \"Engineer\", \"location\": \"Remote\", \"about_me\": \"Builds systems.\"}, \"projects\": [{\"name\": \"Ledger\", \"company\": \"Acme\"}]}\n```"}"#,
        )
        .unwrap();

        let data_dir = tmp.path().join("data");
        let provider = ManualProvider::new(&exchange);
        let result = import_cv_text(&data_dir, "Jane Doe\nEngineer", &provider, false).unwrap();
        assert!(result.warnings.is_empty());
        assert!(data_dir.join("projects/proj_ledger.md").exists());
        assert!(exchange.join("ingest_request.json").exists());

        let data = load_canonical_data(&data_dir).unwrap();
        assert_eq!(data.projects[0].company.as_deref(), Some("Acme"));
    }
}
