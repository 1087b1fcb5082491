//! Grounds drafts against the projects they cite, then turns them into experience entries.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use crate::errors::Issue;
use crate::grounding::{
    parse_experience_drafts, sanitize_id, DraftError, ExperienceDraft, GeneratedExperience,
};
use crate::keywords::tokenize;
use crate::models::{ExperienceEntry, ProjectEntry};

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?%?").expect("number pattern is valid"));

/// Batch and per-entry caps for drafted experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundingPolicy {
    pub max_drafts: usize,
    pub max_bullets: usize,
    pub max_keywords: usize,
}

impl Default for GroundingPolicy {
    fn default() -> Self {
        Self {
            max_drafts: 5,
            max_bullets: 3,
            max_keywords: 8,
        }
    }
}

/// Bullets and keywords of one draft that survived grounding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedDraft {
    pub draft_id: String,
    pub bullets: Vec<String>,
    pub keywords: Vec<String>,
}

/// Output of [`materialize_drafts`]: the entries to write plus every finding.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub entries: Vec<GeneratedExperience>,
    pub issues: Vec<Issue>,
}

// ────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// Everything a set of cited projects actually says.
struct Vocabulary {
    numbers: BTreeSet<String>,
    phrases: BTreeSet<String>,
    tokens: BTreeSet<String>,
}

impl Vocabulary {
    fn of(projects: &[&ProjectEntry]) -> Self {
        let mut numbers = BTreeSet::new();
        let mut phrases = BTreeSet::new();
        let mut tokens = BTreeSet::new();

        for field in projects.iter().flat_map(|p| p.text_fields()) {
            numbers.extend(NUMBER_RE.find_iter(field).map(|m| m.as_str().to_string()));
            let phrase = field.trim().to_lowercase();
            if !phrase.is_empty() {
                phrases.insert(phrase);
            }
            tokens.extend(tokenize(field));
        }

        Self {
            numbers,
            phrases,
            tokens,
        }
    }

    /// Numeric tokens in `bullet` that no cited project contains verbatim.
    fn ungrounded_numbers<'a>(&self, bullet: &'a str) -> Vec<&'a str> {
        NUMBER_RE
            .find_iter(bullet)
            .map(|m| m.as_str())
            .filter(|n| !self.numbers.contains(*n))
            .collect()
    }

    /// A keyword is grounded when it equals a cited field as a phrase, or when every word in
    /// it appears somewhere in the cited text.
    fn keyword_grounded(&self, keyword: &str) -> bool {
        let lowered = keyword.trim().to_lowercase();
        if self.phrases.contains(&lowered) {
            return true;
        }
        let words = tokenize(&lowered);
        !words.is_empty() && words.iter().all(|w| self.tokens.contains(w))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Grounding
// ────────────────────────────────────────────────────────────────────────────

fn cited_projects<'a>(
    draft: &ExperienceDraft,
    by_id: &BTreeMap<&str, &'a ProjectEntry>,
) -> Vec<&'a ProjectEntry> {
    draft
        .source_project_ids
        .iter()
        .filter_map(|id| by_id.get(id.as_str()).copied())
        .collect()
}

fn index_projects(projects: &[ProjectEntry]) -> BTreeMap<&str, &ProjectEntry> {
    projects.iter().map(|p| (p.id.as_str(), p)).collect()
}

fn ground_one(
    draft: &ExperienceDraft,
    cited: &[&ProjectEntry],
    policy: &GroundingPolicy,
    issues: &mut Vec<Issue>,
) -> AcceptedDraft {
    let vocabulary = Vocabulary::of(cited);

    if draft.bullets.len() > policy.max_bullets {
        issues.push(
            Issue::warning(
                "DRAFT_BULLETS_TRUNCATED",
                format!(
                    "{} bullets drafted, keeping the first {}",
                    draft.bullets.len(),
                    policy.max_bullets
                ),
            )
            .with_source(&draft.id),
        );
    }
    let bullets: Vec<String> = draft
        .bullets
        .iter()
        .take(policy.max_bullets)
        .cloned()
        .collect();
    for bullet in &bullets {
        for number in vocabulary.ungrounded_numbers(bullet) {
            issues.push(
                Issue::warning(
                    "UNGROUNDED_NUMBER",
                    format!("Numeric token `{number}` not found in cited projects: {bullet}"),
                )
                .with_source(&draft.id),
            );
        }
    }

    let mut seen = HashSet::new();
    let mut keywords = Vec::new();
    for keyword in &draft.keywords {
        if !vocabulary.keyword_grounded(keyword) {
            issues.push(
                Issue::warning(
                    "UNGROUNDED_KEYWORD",
                    format!("Keyword `{keyword}` not found in cited projects; dropped"),
                )
                .with_source(&draft.id),
            );
            continue;
        }
        if seen.insert(keyword.to_lowercase()) {
            keywords.push(keyword.clone());
        }
    }
    if keywords.len() > policy.max_keywords {
        issues.push(
            Issue::warning(
                "DRAFT_KEYWORDS_TRUNCATED",
                format!(
                    "{} keywords accepted, keeping the first {}",
                    keywords.len(),
                    policy.max_keywords
                ),
            )
            .with_source(&draft.id),
        );
        keywords.truncate(policy.max_keywords);
    }

    AcceptedDraft {
        draft_id: draft.id.clone(),
        bullets,
        keywords,
    }
}

/// Grounds every draft against its own cited projects.
///
/// Ungrounded numbers are flagged and the bullet is kept; ungrounded keywords are flagged and
/// dropped. Unknown project ids are ignored here; [`materialize_drafts`] rejects them.
pub fn validate(
    drafts: &[ExperienceDraft],
    projects: &[ProjectEntry],
    policy: &GroundingPolicy,
) -> (Vec<AcceptedDraft>, Vec<Issue>) {
    let by_id = index_projects(projects);
    let mut issues = Vec::new();
    let accepted = drafts
        .iter()
        .map(|draft| ground_one(draft, &cited_projects(draft, &by_id), policy, &mut issues))
        .collect();
    (accepted, issues)
}

// ────────────────────────────────────────────────────────────────────────────
// Structure
// ────────────────────────────────────────────────────────────────────────────

/// Facts derived from the cited projects.
struct Resolution {
    company: String,
    title: String,
    start_date: String,
    end_date: Option<String>,
    tags: Vec<String>,
}

/// Derives company, role and dates. Pushes every structural error found; `None` if any.
fn resolve_entry(
    draft: &ExperienceDraft,
    cited: &[&ProjectEntry],
    issues: &mut Vec<Issue>,
) -> Option<Resolution> {
    let before = issues.iter().filter(|i| i.is_error()).count();

    let companies: BTreeSet<&str> = cited
        .iter()
        .filter_map(|p| p.company.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect();
    if companies.len() != 1 {
        let message = if companies.is_empty() {
            "Cited projects carry no company".to_string()
        } else {
            format!(
                "Cited projects span several companies: {}",
                companies.iter().copied().collect::<Vec<_>>().join(", ")
            )
        };
        issues.push(Issue::error("COMPANY_MISMATCH", message).with_source(&draft.id));
    }

    let start_date = cited
        .iter()
        .filter_map(|p| p.start_date.as_deref())
        .filter(|d| !d.trim().is_empty())
        .min();
    if start_date.is_none() {
        issues.push(
            Issue::error("MISSING_START_DATE", "No cited project has a start_date")
                .with_source(&draft.id),
        );
    }
    let end_date = cited
        .iter()
        .filter_map(|p| p.end_date.as_deref())
        .filter(|d| !d.trim().is_empty())
        .max();

    let roles: BTreeSet<&str> = cited
        .iter()
        .filter_map(|p| p.role.as_deref())
        .filter(|r| !r.trim().is_empty())
        .collect();
    let title = match (draft.role.as_deref(), roles.iter().next()) {
        (Some(role), _) => {
            if !roles.contains(role) {
                issues.push(
                    Issue::warning(
                        "ROLE_NOT_IN_PROJECTS",
                        format!("Drafted role `{role}` does not match any cited project role"),
                    )
                    .with_source(&draft.id),
                );
            }
            if roles.len() > 1 {
                issues.push(
                    Issue::warning(
                        "ROLE_CONFLICT",
                        format!("Cited projects disagree on role; using drafted `{role}`"),
                    )
                    .with_source(&draft.id),
                );
            }
            Some(role.to_string())
        }
        (None, Some(first)) => {
            if roles.len() > 1 {
                issues.push(
                    Issue::warning(
                        "ROLE_CONFLICT",
                        format!("Cited projects disagree on role; using `{first}`"),
                    )
                    .with_source(&draft.id),
                );
            }
            Some(first.to_string())
        }
        (None, None) => {
            issues.push(
                Issue::error(
                    "MISSING_ROLE",
                    "No role available in cited projects or the draft",
                )
                .with_source(&draft.id),
            );
            None
        }
    };

    if issues.iter().filter(|i| i.is_error()).count() > before {
        return None;
    }

    let tags: BTreeSet<&str> = cited
        .iter()
        .flat_map(|p| p.tags.iter().map(String::as_str))
        .collect();

    Some(Resolution {
        company: companies.into_iter().next()?.to_string(),
        title: title?,
        start_date: start_date?.to_string(),
        end_date: end_date.map(str::to_string),
        tags: tags.into_iter().map(str::to_string).collect(),
    })
}

/// `exp_<company>_<start_date>`, sanitized, with `_2`, `_3`... on collision.
fn derive_experience_id(company: &str, start_date: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_id(&format!("exp_{company}_{start_date}"));
    let mut candidate = base.clone();
    let mut counter = 2;
    while used.contains(&candidate) {
        candidate = format!("{base}_{counter}");
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

fn check_batch(
    drafts: &[ExperienceDraft],
    by_id: &BTreeMap<&str, &ProjectEntry>,
    policy: &GroundingPolicy,
) -> Result<(), DraftError> {
    if drafts.len() > policy.max_drafts {
        return Err(DraftError::TooMany {
            count: drafts.len(),
            max: policy.max_drafts,
        });
    }
    for draft in drafts {
        if draft.source_project_ids.is_empty() {
            return Err(DraftError::MissingSources {
                id: draft.id.clone(),
            });
        }
        if let Some(unknown) = draft
            .source_project_ids
            .iter()
            .find(|id| !by_id.contains_key(id.as_str()))
        {
            return Err(DraftError::UnknownProject {
                id: draft.id.clone(),
                project_id: unknown.clone(),
            });
        }
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────────────

/// Turns a draft batch into experience entries.
///
/// Batch size, missing sources and unknown project ids abort the whole batch. An entry whose
/// company, start date or role cannot be derived is skipped with an error issue; the rest of
/// the batch still materializes.
pub fn materialize_drafts(
    drafts: &[ExperienceDraft],
    projects: &[ProjectEntry],
    policy: &GroundingPolicy,
) -> Result<Materialized, DraftError> {
    let by_id = index_projects(projects);
    check_batch(drafts, &by_id, policy)?;

    let mut out = Materialized::default();
    let mut used_ids = HashSet::new();

    for draft in drafts {
        let cited = cited_projects(draft, &by_id);
        let Some(resolved) = resolve_entry(draft, &cited, &mut out.issues) else {
            warn!(draft = %draft.id, "Rejected drafted experience");
            continue;
        };
        let accepted = ground_one(draft, &cited, policy, &mut out.issues);
        let id = derive_experience_id(&resolved.company, &resolved.start_date, &mut used_ids);

        out.entries.push(GeneratedExperience {
            entry: ExperienceEntry {
                id,
                company: resolved.company,
                title: resolved.title,
                location: None,
                start_date: resolved.start_date,
                end_date: resolved.end_date,
                tags: resolved.tags,
                keywords: accepted.keywords,
                bullets: accepted.bullets,
                source_path: None,
            },
            source_project_ids: draft.source_project_ids.clone(),
        });
    }

    info!(
        drafts = drafts.len(),
        accepted = out.entries.len(),
        issues = out.issues.len(),
        "Materialized drafted experience"
    );
    Ok(out)
}

/// Dry run over a raw model response: every issue materialization would raise, nothing written.
///
/// Unlike [`materialize_drafts`] this never stops at the first batch-level problem.
pub fn check_draft(text: &str, projects: &[ProjectEntry], policy: &GroundingPolicy) -> Vec<Issue> {
    let drafts = match parse_experience_drafts(text) {
        Ok(drafts) => drafts,
        Err(e) => return vec![Issue::error(e.code(), e.to_string())],
    };

    let mut issues = Vec::new();
    if drafts.len() > policy.max_drafts {
        let e = DraftError::TooMany {
            count: drafts.len(),
            max: policy.max_drafts,
        };
        issues.push(Issue::error(e.code(), e.to_string()));
    }

    let by_id = index_projects(projects);
    for draft in &drafts {
        if draft.source_project_ids.is_empty() {
            let e = DraftError::MissingSources {
                id: draft.id.clone(),
            };
            issues.push(Issue::error(e.code(), e.to_string()).with_source(&draft.id));
            continue;
        }
        for project_id in &draft.source_project_ids {
            if !by_id.contains_key(project_id.as_str()) {
                let e = DraftError::UnknownProject {
                    id: draft.id.clone(),
                    project_id: project_id.clone(),
                };
                issues.push(Issue::error(e.code(), e.to_string()).with_source(&draft.id));
            }
        }

        let cited = cited_projects(draft, &by_id);
        if cited.is_empty() {
            continue;
        }
        resolve_entry(draft, &cited, &mut issues);
        ground_one(draft, &cited, policy, &mut issues);
    }
    issues
}
