//! Skill narrowing for job builds and validation of model-picked highlights.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::drafting::extract_payload;
use crate::grounding::DraftError;
use crate::keywords::tokenize;
use crate::models::Skills;

/// Upper bound on highlighted skills.
pub const MAX_HIGHLIGHTS: usize = 5;

/// Default per-category cap for the job filter.
pub const MAX_SKILLS_PER_CATEGORY: usize = 5;

const HIGHLIGHTS_KEY: &str = "highlighted_skills";

/// Items that mention the job, at most `max_per_category` per category, in category order.
///
/// An item matches when its lower-cased name is a job keyword or every one of its tokens is.
/// Returns `None` when nothing matches anywhere, meaning "do not filter".
pub fn filter_skills(
    skills: &Skills,
    job_keywords: &BTreeSet<String>,
    max_per_category: usize,
) -> Option<Vec<String>> {
    let mut kept = Vec::new();
    for category in &skills.categories {
        let matching = category
            .items
            .iter()
            .filter(|item| skill_matches(item, job_keywords))
            .take(max_per_category);
        kept.extend(matching.cloned());
    }

    debug!(kept = kept.len(), "Filtered skills against job keywords");
    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

fn skill_matches(item: &str, job_keywords: &BTreeSet<String>) -> bool {
    let lowered = item.trim().to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    if job_keywords.contains(&lowered) {
        return true;
    }
    let tokens = tokenize(&lowered);
    !tokens.is_empty() && tokens.iter().all(|t| job_keywords.contains(t))
}

/// Parses a `highlighted_skills` list (YAML or JSON) against the known skills.
///
/// Matching is case-insensitive and returns the canonical spelling. An unknown skill is a hard
/// error; duplicates are dropped and the result is capped at [`MAX_HIGHLIGHTS`].
pub fn parse_skill_highlights(text: &str, allowed: &[String]) -> Result<Vec<String>, DraftError> {
    let payload = extract_payload(text, HIGHLIGHTS_KEY);
    let data: Value = serde_yaml::from_str(&payload)?;
    let raw = data
        .as_object()
        .and_then(|obj| obj.get(HIGHLIGHTS_KEY))
        .and_then(Value::as_array)
        .ok_or_else(|| DraftError::Malformed(format!("`{HIGHLIGHTS_KEY}` must be a list")))?;

    let mut highlights: Vec<String> = Vec::new();
    for item in raw {
        let name = item.as_str().ok_or_else(|| {
            DraftError::Malformed(format!("`{HIGHLIGHTS_KEY}` items must be strings"))
        })?;
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        let canonical = allowed
            .iter()
            .find(|s| s.trim().to_lowercase() == key)
            .ok_or_else(|| DraftError::UnknownSkill(name.to_string()))?;
        if !highlights.contains(canonical) {
            highlights.push(canonical.clone());
        }
        if highlights.len() >= MAX_HIGHLIGHTS {
            break;
        }
    }
    Ok(highlights)
}
