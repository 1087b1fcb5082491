use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::grounding::GroundingPolicy;
use crate::selection::SelectionPolicy;
use crate::skills::MAX_SKILLS_PER_CATEGORY;

/// Build configuration loaded from environment variables (and `.env` if present).
/// Every variable is optional; command-line flags override what is read here.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub jobs_dir: PathBuf,
    /// `None` keeps the store default of `<data_dir>/../tmp`.
    pub backup_dir: Option<PathBuf>,
    pub rust_log: String,
    pub selection: SelectionPolicy,
    pub grounding: GroundingPolicy,
    pub max_skills_per_category: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let selection_defaults = SelectionPolicy::default();
        let grounding_defaults = GroundingPolicy::default();

        Ok(Config {
            data_dir: var("CV_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            out_dir: var("CV_OUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("out")),
            jobs_dir: var("CV_JOBS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("jobs")),
            backup_dir: var("CV_BACKUP_DIR").map(PathBuf::from),
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            selection: SelectionPolicy {
                max_experience: parse_or(
                    &var,
                    "CV_MAX_EXPERIENCE",
                    selection_defaults.max_experience,
                )?,
                max_projects: parse_or(
                    &var,
                    "CV_MAX_PROJECTS",
                    selection_defaults.max_projects,
                )?,
                ..selection_defaults
            },
            grounding: GroundingPolicy {
                max_drafts: parse_or(&var, "CV_MAX_DRAFTS", grounding_defaults.max_drafts)?,
                max_bullets: parse_or(
                    &var,
                    "CV_MAX_DRAFT_BULLETS",
                    grounding_defaults.max_bullets,
                )?,
                max_keywords: parse_or(
                    &var,
                    "CV_MAX_DRAFT_KEYWORDS",
                    grounding_defaults.max_keywords,
                )?,
            },
            max_skills_per_category: parse_or(
                &var,
                "CV_MAX_SKILLS_PER_CATEGORY",
                MAX_SKILLS_PER_CATEGORY,
            )?,
        })
    }
}

fn parse_or<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.jobs_dir, PathBuf::from("jobs"));
        assert!(config.backup_dir.is_none());
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.selection, SelectionPolicy::default());
        assert_eq!(config.grounding, GroundingPolicy::default());
        assert_eq!(config.max_skills_per_category, 5);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("CV_DATA_DIR", "/srv/cv/data"),
            ("CV_BACKUP_DIR", "/srv/cv/tmp"),
            ("CV_MAX_EXPERIENCE", "4"),
            ("CV_MAX_DRAFT_KEYWORDS", " 6 "),
            ("CV_OUT_DIR", "  "),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/cv/data"));
        assert_eq!(config.backup_dir, Some(PathBuf::from("/srv/cv/tmp")));
        assert_eq!(config.selection.max_experience, 4);
        assert_eq!(config.selection.max_projects, 2);
        assert_eq!(config.grounding.max_keywords, 6);
        assert_eq!(config.out_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_malformed_number_is_error() {
        let err = Config::from_lookup(lookup(&[("CV_MAX_PROJECTS", "two")])).unwrap_err();
        assert!(err.to_string().contains("CV_MAX_PROJECTS"));
    }
}
