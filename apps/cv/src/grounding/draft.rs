//! Model-draft exchange format. YAML, or JSON as its flow subset:
//!
//! ```yaml
//! experiences:
//!   - id: exp_acme_2023
//!     role: Software Engineer
//!     source_project_ids: [proj_a]
//!     bullets: ["..."]
//!     keywords: ["..."]
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::drafting::extract_payload;
use crate::grounding::DraftError;

static UNSAFE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_]+").expect("id pattern is valid"));

const EXPERIENCES_KEY: &str = "experiences";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperienceDraft {
    pub id: String,
    pub role: Option<String>,
    pub source_project_ids: Vec<String>,
    pub bullets: Vec<String>,
    pub keywords: Vec<String>,
}

/// Lower-cases `text` and collapses every run outside `[a-z0-9_]` to `_`.
///
/// Returns an empty string when nothing survives.
pub fn sanitize_id(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    UNSAFE_ID_RE
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// Parses a model response into drafts.
///
/// Reasoning blocks and code fences around the payload are tolerated. Any shape problem is a
/// hard error; blank bullets, ids and keywords are dropped silently.
pub fn parse_experience_drafts(text: &str) -> Result<Vec<ExperienceDraft>, DraftError> {
    let payload = extract_payload(text, EXPERIENCES_KEY);
    let data: Value = serde_yaml::from_str(&payload)?;

    let raw_experiences = data
        .as_object()
        .and_then(|obj| obj.get(EXPERIENCES_KEY))
        .ok_or_else(|| {
            DraftError::Malformed("response must be an object with an `experiences` list".into())
        })?
        .as_array()
        .ok_or_else(|| DraftError::Malformed("`experiences` must be a list".into()))?;

    raw_experiences.iter().map(parse_one).collect()
}

fn parse_one(raw: &Value) -> Result<ExperienceDraft, DraftError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| DraftError::Malformed("each experience must be an object".into()))?;

    let raw_id = obj
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| DraftError::Malformed("experience id must be a non-empty string".into()))?;
    let id = sanitize_id(raw_id);
    if id.is_empty() {
        return Err(DraftError::Malformed(format!(
            "experience id `{raw_id}` is empty after sanitization"
        )));
    }

    let role = match obj.get("role") {
        None | Some(Value::Null) => None,
        Some(Value::String(role)) => Some(role.trim().to_string()).filter(|r| !r.is_empty()),
        Some(_) => {
            return Err(DraftError::Malformed(format!(
                "experience `{id}`: role must be a string or null"
            )))
        }
    };

    Ok(ExperienceDraft {
        role,
        source_project_ids: string_list(obj.get("source_project_ids"), &id, "source_project_ids")?,
        bullets: string_list(obj.get("bullets"), &id, "bullets")?,
        keywords: match obj.get("keywords") {
            None | Some(Value::Null) => Vec::new(),
            value => string_list(value, &id, "keywords")?,
        },
        id,
    })
}

/// A required list of strings, trimmed, blanks removed.
fn string_list(value: Option<&Value>, id: &str, field: &str) -> Result<Vec<String>, DraftError> {
    let malformed =
        || DraftError::Malformed(format!("experience `{id}`: {field} must be a list of strings"));
    let items = value.and_then(Value::as_array).ok_or_else(malformed)?;

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let text = item.as_str().ok_or_else(malformed)?.trim();
        if !text.is_empty() {
            out.push(text.to_string());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_payload() {
        let text = r#"{"experiences": [{"id": "Exp-One", "role": " Engineer ",
            "source_project_ids": ["proj_a", " "], "bullets": ["Built it.", ""],
            "keywords": ["Python"]}]}"#;
        let drafts = parse_experience_drafts(text).unwrap();
        assert_eq!(drafts.len(), 1);
        let d = &drafts[0];
        assert_eq!(d.id, "exp_one");
        assert_eq!(d.role.as_deref(), Some("Engineer"));
        assert_eq!(d.source_project_ids, vec!["proj_a"]);
        assert_eq!(d.bullets, vec!["Built it."]);
        assert_eq!(d.keywords, vec!["Python"]);
    }

    #[test]
    fn test_parse_strips_think_and_fences() {
        let text = "<think>maybe {\"x\": 1}</think>\nHere you go:\n```json\n\
            {\"experiences\": [{\"id\": \"a\", \"source_project_ids\": [\"p\"], \"bullets\": []}]}\n```\n";
        let drafts = parse_experience_drafts(text).unwrap();
        assert_eq!(drafts[0].id, "a");
        assert!(drafts[0].role.is_none());
        assert!(drafts[0].keywords.is_empty());
    }

    #[test]
    fn test_parse_missing_experiences_is_malformed() {
        let err = parse_experience_drafts(r#"{"items": []}"#).unwrap_err();
        assert_eq!(err.code(), "DRAFT_MALFORMED");
    }

    #[test]
    fn test_parse_bullets_not_list_is_malformed() {
        let text = r#"{"experiences": [{"id": "a", "source_project_ids": ["p"], "bullets": "x"}]}"#;
        let err = parse_experience_drafts(text).unwrap_err();
        assert_eq!(err.code(), "DRAFT_MALFORMED");
        assert!(err.to_string().contains("bullets"));
    }

    #[test]
    fn test_parse_numeric_role_is_malformed() {
        let text = r#"{"experiences": [{"id": "a", "role": 3, "source_project_ids": [], "bullets": []}]}"#;
        assert_eq!(
            parse_experience_drafts(text).unwrap_err().code(),
            "DRAFT_MALFORMED"
        );
    }

    #[test]
    fn test_parse_yaml_after_reasoning() {
        let text = "<think>\nReasoning that should be ignored.\n</think>\n\n\
            experiences:\n\
            \x20 - id: exp_example_corp_2023-02\n\
            \x20   role: Software Engineer\n\
            \x20   source_project_ids: [proj_cv_compiler]\n\
            \x20   bullets:\n\
            \x20     - \"Improved throughput by 20%.\"\n";
        let drafts = parse_experience_drafts(text).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].id, "exp_example_corp_2023_02");
        assert_eq!(drafts[0].role.as_deref(), Some("Software Engineer"));
        assert_eq!(drafts[0].source_project_ids, vec!["proj_cv_compiler"]);
        assert_eq!(drafts[0].bullets, vec!["Improved throughput by 20%."]);
    }

    #[test]
    fn test_parse_yaml_fence() {
        let text = "```yaml\nexperiences:\n  - id: a\n    source_project_ids: [p]\n    bullets: []\n```";
        let drafts = parse_experience_drafts(text).unwrap();
        assert_eq!(drafts[0].id, "a");
    }

    #[test]
    fn test_parse_invalid_syntax() {
        let err = parse_experience_drafts("experiences: [oops").unwrap_err();
        assert_eq!(err.code(), "DRAFT_PARSE_FAILED");
    }

    #[test]
    fn test_parse_prose_is_malformed() {
        let err = parse_experience_drafts("no payload here").unwrap_err();
        assert_eq!(err.code(), "DRAFT_MALFORMED");
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("  Exp: Acme / 2024-01 "), "exp_acme_2024_01");
        assert_eq!(sanitize_id("---"), "");
    }
}
