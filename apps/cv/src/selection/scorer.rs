//! Keyword scorer and ranker.
//!
//! Algorithm (job build):
//! 1. `tag_matches`  = |job keywords ∩ lower-cased tags|
//! 2. `text_matches` = |job keywords ∩ tokens(text fields)|
//! 3. `score = tag_weight·tag_matches + text_weight·text_matches (+ recency_weight·recency)`
//! 4. Rank experience by `(-score, -recency, id)`, projects by `(-score, id)`
//! 5. Keep up to the section cap among entries with at least one keyword match; if none match,
//!    keep the single top-ranked entry so a section never goes empty.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::keywords::{job_keywords, token_set};
use crate::models::{CanonicalData, ExperienceEntry, JobSpec, ProjectEntry};
use crate::selection::{SelectionDecision, SelectionPolicy, SelectionResult};

const GENERIC_REASON: &str = "generic build";

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

/// Selects content with the default policy.
pub fn select_content(data: &CanonicalData, job: Option<&JobSpec>) -> SelectionResult {
    select_with_policy(data, job, &SelectionPolicy::default())
}

/// Selects content. Pure: identical inputs always yield an identical result.
pub fn select_with_policy(
    data: &CanonicalData,
    job: Option<&JobSpec>,
    policy: &SelectionPolicy,
) -> SelectionResult {
    match job {
        None => select_generic(data),
        Some(job) => select_for_job(data, job, policy),
    }
}

/// Parses a `YYYY-MM` (or `YYYY-MM-DD`) date into `year * 12 + month`. Unparseable → 0.
pub fn parse_recency(date: &str) -> i64 {
    let date = date.trim();
    let parsed = NaiveDate::parse_from_str(&format!("{date}-01"), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date, "%Y-%m-%d"));
    match parsed {
        Ok(d) => d.year() as i64 * 12 + d.month() as i64,
        Err(_) => 0,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Generic build
// ────────────────────────────────────────────────────────────────────────────

fn select_generic(data: &CanonicalData) -> SelectionResult {
    let mut experience: Vec<&ExperienceEntry> = data.experience.iter().collect();
    experience.sort_by(|a, b| {
        parse_recency(&b.start_date)
            .cmp(&parse_recency(&a.start_date))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut projects: Vec<&ProjectEntry> = data.projects.iter().collect();
    projects.sort_by(|a, b| a.id.cmp(&b.id));

    let generic = |id: &str| SelectionDecision {
        item_id: id.to_string(),
        score: 0.0,
        matched_keywords: Vec::new(),
        reasons: vec![GENERIC_REASON.to_string()],
    };

    let decisions = experience
        .iter()
        .map(|e| generic(&e.id))
        .chain(projects.iter().map(|p| generic(&p.id)))
        .collect();

    SelectionResult {
        selected_experience_ids: experience.iter().map(|e| e.id.clone()).collect(),
        selected_project_ids: projects.iter().map(|p| p.id.clone()).collect(),
        decisions,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Job-targeted build
// ────────────────────────────────────────────────────────────────────────────

/// A candidate after scoring, before the section cap is applied.
#[derive(Debug, Clone)]
struct ScoredItem {
    id: String,
    score: f64,
    recency: i64,
    tag_matches: usize,
    text_matches: usize,
    matched: Vec<String>,
}

impl ScoredItem {
    fn has_match(&self) -> bool {
        self.tag_matches + self.text_matches > 0
    }

    fn into_decision(self) -> SelectionDecision {
        SelectionDecision {
            reasons: vec![
                format!("tag_matches={}", self.tag_matches),
                format!("text_matches={}", self.text_matches),
            ],
            item_id: self.id,
            score: self.score,
            matched_keywords: self.matched,
        }
    }
}

fn select_for_job(data: &CanonicalData, job: &JobSpec, policy: &SelectionPolicy) -> SelectionResult {
    let keywords = job_keywords(job);
    debug!(job = %job.id, keywords = keywords.len(), "Scoring candidates");

    let mut experience: Vec<ScoredItem> = data
        .experience
        .iter()
        .map(|e| {
            let text = e
                .bullets
                .iter()
                .map(String::as_str)
                .chain([e.company.as_str(), e.title.as_str()]);
            let recency = parse_recency(&e.start_date);
            score_item(&e.id, &e.tags, text, recency, &keywords, policy)
        })
        .collect();
    experience.sort_by(|a, b| {
        cmp_score_desc(a.score, b.score)
            .then_with(|| b.recency.cmp(&a.recency))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut projects: Vec<ScoredItem> = data
        .projects
        .iter()
        .map(|p| {
            let text = p
                .bullets
                .iter()
                .map(String::as_str)
                .chain([p.name.as_str()])
                .chain(p.company.as_deref())
                .chain(p.role.as_deref());
            score_item(&p.id, &p.tags, text, 0, &keywords, policy)
        })
        .collect();
    projects.sort_by(|a, b| cmp_score_desc(a.score, b.score).then_with(|| a.id.cmp(&b.id)));

    let selected_experience_ids = apply_cap(&experience, policy.max_experience);
    let selected_project_ids = apply_cap(&projects, policy.max_projects);

    let decisions = experience
        .into_iter()
        .chain(projects)
        .map(ScoredItem::into_decision)
        .collect();

    SelectionResult {
        selected_experience_ids,
        selected_project_ids,
        decisions,
    }
}

fn score_item<'a, I>(
    id: &str,
    tags: &[String],
    text: I,
    recency: i64,
    keywords: &BTreeSet<String>,
    policy: &SelectionPolicy,
) -> ScoredItem
where
    I: IntoIterator<Item = &'a str>,
{
    let tag_set: BTreeSet<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
    let text_tokens = token_set(text);

    let tag_matches = tag_set.intersection(keywords).count();
    let text_matches = text_tokens.intersection(keywords).count();

    // BTreeSet iteration is sorted, so `matched` comes out sorted and unique.
    let matched: Vec<String> = keywords
        .iter()
        .filter(|k| tag_set.contains(*k) || text_tokens.contains(*k))
        .cloned()
        .collect();

    let score = policy.tag_weight * tag_matches as f64
        + policy.text_weight * text_matches as f64
        + policy.recency_weight * recency as f64;

    ScoredItem {
        id: id.to_string(),
        score,
        recency,
        tag_matches,
        text_matches,
        matched,
    }
}

fn cmp_score_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Takes up to `cap` matching entries in rank order, falling back to the top-ranked entry.
fn apply_cap(ranked: &[ScoredItem], cap: usize) -> Vec<String> {
    let selected: Vec<String> = ranked
        .iter()
        .filter(|s| s.has_match())
        .take(cap)
        .map(|s| s.id.clone())
        .collect();

    if selected.is_empty() {
        return ranked.first().map(|s| vec![s.id.clone()]).unwrap_or_default();
    }
    selected
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profile, Skills};

    fn exp(id: &str, start: &str, tags: &[&str], bullets: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            id: id.to_string(),
            company: "Acme".to_string(),
            title: "Engineer".to_string(),
            location: None,
            start_date: start.to_string(),
            end_date: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            keywords: vec![],
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
            source_path: None,
        }
    }

    fn proj(id: &str, tags: &[&str], bullets: &[&str]) -> ProjectEntry {
        ProjectEntry {
            id: id.to_string(),
            name: format!("Project {id}"),
            company: None,
            role: None,
            start_date: None,
            end_date: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
            source_path: None,
        }
    }

    fn data(experience: Vec<ExperienceEntry>, projects: Vec<ProjectEntry>) -> CanonicalData {
        CanonicalData {
            profile: Profile {
                id: "profile".to_string(),
                name: "Test User".to_string(),
                headline: String::new(),
                location: String::new(),
                email: None,
                links: vec![],
                about_me: String::new(),
                source_path: None,
            },
            experience,
            projects,
            skills: Skills {
                id: "skills".to_string(),
                categories: vec![],
                source_path: None,
            },
            education: None,
        }
    }

    fn job(keywords: &[&str]) -> JobSpec {
        JobSpec {
            id: "job".to_string(),
            title: None,
            raw_text: String::new(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            source_path: None,
        }
    }

    fn decision<'a>(result: &'a SelectionResult, id: &str) -> &'a SelectionDecision {
        result.decisions.iter().find(|d| d.item_id == id).unwrap()
    }

    #[test]
    fn test_parse_recency_year_month() {
        assert_eq!(parse_recency("2023-01"), 2023 * 12 + 1);
        assert_eq!(parse_recency("2023-12-05"), 2023 * 12 + 12);
    }

    #[test]
    fn test_parse_recency_unparseable_is_zero() {
        assert_eq!(parse_recency("sometime"), 0);
        assert_eq!(parse_recency("2023-13"), 0);
        assert_eq!(parse_recency(""), 0);
    }

    #[test]
    fn test_generic_build_orders_by_recency_then_id() {
        let d = data(
            vec![
                exp("b_old", "2019-01", &[], &[]),
                exp("z_new", "2023-05", &[], &[]),
                exp("a_new", "2023-05", &[], &[]),
            ],
            vec![proj("p2", &[], &[]), proj("p1", &[], &[])],
        );
        let result = select_content(&d, None);
        assert_eq!(result.selected_experience_ids, vec!["a_new", "z_new", "b_old"]);
        assert_eq!(result.selected_project_ids, vec!["p1", "p2"]);
        assert_eq!(result.decisions.len(), 5);
        for d in &result.decisions {
            assert_eq!(d.score, 0.0);
            assert_eq!(d.reasons, vec!["generic build"]);
        }
    }

    #[test]
    fn test_keyword_scoring_tag_beats_text() {
        let d = data(
            vec![
                exp("a", "2020-01", &["python"], &["Wrote python tooling"]),
                exp("b", "2020-01", &[], &["Ran a kafka pipeline"]),
            ],
            vec![],
        );
        let result = select_content(&d, Some(&job(&["python", "kafka"])));
        let recency_term = 0.001 * (2020.0 * 12.0 + 1.0);

        let a = decision(&result, "a");
        assert!((a.score - (2.0 + 1.0 + recency_term)).abs() < 1e-9);
        assert_eq!(a.matched_keywords, vec!["python"]);
        assert_eq!(a.reasons, vec!["tag_matches=1", "text_matches=1"]);

        let b = decision(&result, "b");
        assert!((b.score - (1.0 + recency_term)).abs() < 1e-9);
        assert_eq!(b.matched_keywords, vec!["kafka"]);

        assert_eq!(result.selected_experience_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_experience_capped_at_three_matching() {
        let d = data(
            (0..5)
                .map(|i| exp(&format!("e{i}"), "2021-01", &["rust"], &[]))
                .collect(),
            vec![],
        );
        let result = select_content(&d, Some(&job(&["rust"])));
        assert_eq!(result.selected_experience_ids, vec!["e0", "e1", "e2"]);
        assert_eq!(result.decisions.len(), 5, "every candidate keeps a decision");
    }

    #[test]
    fn test_non_matching_entries_are_not_selected_when_others_match() {
        let d = data(
            vec![
                exp("match", "2018-01", &["rust"], &[]),
                exp("newer", "2024-01", &[], &["Unrelated work"]),
            ],
            vec![],
        );
        let result = select_content(&d, Some(&job(&["rust"])));
        assert_eq!(result.selected_experience_ids, vec!["match"]);
    }

    #[test]
    fn test_fallback_keeps_most_recent_experience() {
        let d = data(
            vec![
                exp("old", "2015-03", &[], &["Did work"]),
                exp("recent", "2022-07", &[], &["Did other work"]),
                exp("mid", "2019-01", &[], &[]),
            ],
            vec![proj("p_b", &[], &[]), proj("p_a", &[], &[])],
        );
        let result = select_content(&d, Some(&job(&["haskell"])));
        assert_eq!(result.selected_experience_ids, vec!["recent"]);
        assert_eq!(result.selected_project_ids, vec!["p_a"]);
    }

    #[test]
    fn test_empty_keyword_set_degenerates_to_fallback() {
        let d = data(vec![exp("only", "2020-01", &["go"], &[])], vec![]);
        let result = select_content(&d, Some(&job(&[])));
        assert_eq!(result.selected_experience_ids, vec!["only"]);
        let only = decision(&result, "only");
        assert!(only.matched_keywords.is_empty());
    }

    #[test]
    fn test_projects_capped_at_two_and_ranked_by_id_on_tie() {
        let d = data(
            vec![],
            vec![
                proj("p3", &["sql"], &[]),
                proj("p1", &["sql"], &[]),
                proj("p2", &["sql"], &[]),
            ],
        );
        let result = select_content(&d, Some(&job(&["sql"])));
        assert_eq!(result.selected_project_ids, vec!["p1", "p2"]);
        assert!(result.selected_experience_ids.is_empty());
    }

    #[test]
    fn test_project_text_includes_name() {
        let d = data(vec![], vec![proj("ledger", &[], &[])]);
        let result = select_content(&d, Some(&job(&["ledger"])));
        assert_eq!(decision(&result, "ledger").matched_keywords, vec!["ledger"]);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let d = data(
            vec![
                exp("a", "2020-01", &["python"], &["kafka"]),
                exp("b", "2021-01", &["kafka"], &[]),
                exp("c", "bad-date", &[], &["python"]),
            ],
            vec![proj("x", &["python"], &[]), proj("y", &[], &["kafka"])],
        );
        let j = job(&["python", "kafka"]);
        assert_eq!(select_content(&d, Some(&j)), select_content(&d, Some(&j)));
        assert_eq!(select_content(&d, None), select_content(&d, None));
    }

    #[test]
    fn test_custom_policy_caps() {
        let d = data(
            (0..4)
                .map(|i| exp(&format!("e{i}"), "2021-01", &["rust"], &[]))
                .collect(),
            vec![],
        );
        let policy = SelectionPolicy {
            max_experience: 1,
            ..SelectionPolicy::default()
        };
        let result = select_with_policy(&d, Some(&job(&["rust"])), &policy);
        assert_eq!(result.selected_experience_ids, vec!["e0"]);
    }
}
