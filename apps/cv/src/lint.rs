//! ATS lint over canonical inputs and rendered artifacts.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::Issue;
use crate::models::CanonicalData;

static YEAR_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("date pattern is valid"));

/// Schema-adjacent checks the loader does not enforce.
pub fn lint_build_inputs(data: &CanonicalData) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut seen: HashMap<&str, Option<&str>> = HashMap::new();
    for (id, source) in data.ids() {
        match seen.get(id) {
            Some(first) => issues.push(with_source(
                Issue::error(
                    "ID_DUPLICATE",
                    format!(
                        "Duplicate id `{id}` (also seen in {})",
                        first.unwrap_or("<unknown>")
                    ),
                ),
                source,
            )),
            None => {
                seen.insert(id, source);
            }
        }
    }

    let profile_source = data.profile.source_path.as_deref();
    lint_text(&mut issues, &data.profile.about_me, "profile.about_me", profile_source);
    for link in &data.profile.links {
        if link.url.trim().is_empty() {
            issues.push(with_source(
                Issue::warning(
                    "PROFILE_LINK_URL_MISSING",
                    format!("Profile link `{}` is missing a URL; it will be skipped", link.label),
                ),
                profile_source,
            ));
        }
    }

    for e in &data.experience {
        let source = e.source_path.as_deref();
        let field = format!("experience[{}]", e.id);
        for bullet in &e.bullets {
            lint_text(&mut issues, bullet, &format!("{field}.bullets"), source);
        }
        let dates = [
            ("start_date", Some(e.start_date.as_str())),
            ("end_date", e.end_date.as_deref()),
        ];
        for (name, value) in dates {
            lint_date(&mut issues, value, &format!("{field}.{name}"), source);
        }
    }

    for p in &data.projects {
        let source = p.source_path.as_deref();
        let field = format!("projects[{}]", p.id);
        for bullet in &p.bullets {
            lint_text(&mut issues, bullet, &format!("{field}.bullets"), source);
        }
        let dates = [
            ("start_date", p.start_date.as_deref()),
            ("end_date", p.end_date.as_deref()),
        ];
        for (name, value) in dates {
            lint_date(&mut issues, value, &format!("{field}.{name}"), source);
        }
    }

    issues
}

fn with_source(issue: Issue, source: Option<&str>) -> Issue {
    match source {
        Some(source) => issue.with_source(source),
        None => issue,
    }
}

fn lint_text(issues: &mut Vec<Issue>, text: &str, field: &str, source: Option<&str>) {
    if text.contains('\n') || text.contains('\r') {
        issues.push(with_source(
            Issue::error("TEXT_NEWLINE", format!("Newline not allowed in {field}")),
            source,
        ));
    }
    if text.contains('\t') {
        issues.push(with_source(
            Issue::error("TEXT_TAB", format!("Tab not allowed in {field}")),
            source,
        ));
    }
    // One finding per field is enough to point at the problem.
    if let Some(ch) = text.chars().find(|c| !c.is_ascii()) {
        issues.push(with_source(
            Issue::warning(
                "UNICODE_NON_ASCII",
                format!("Non-ASCII character {ch:?} in {field} (ATS risk)"),
            ),
            source,
        ));
    }
}

fn lint_date(issues: &mut Vec<Issue>, value: Option<&str>, field: &str, source: Option<&str>) {
    let Some(value) = value else {
        return;
    };
    if !YEAR_MONTH_RE.is_match(value.trim()) {
        issues.push(with_source(
            Issue::warning(
                "DATE_FORMAT",
                format!("{field} should be YYYY-MM, got `{value}`"),
            ),
            source,
        ));
    }
}

/// Checks a written artifact: present, non-empty, and ASCII-only for markdown.
pub fn lint_rendered_output(path: &Path) -> Vec<Issue> {
    let source = path.display().to_string();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => {
            return vec![Issue::error(
                "OUTPUT_MISSING",
                format!("Missing output file: {source}"),
            )
            .with_source(source)]
        }
    };

    let mut issues = Vec::new();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext != "md" && ext != "pdf" {
        issues.push(
            Issue::warning("OUTPUT_EXT", format!("Unexpected output extension `{ext}`"))
                .with_source(&source),
        );
    }
    if bytes.is_empty() {
        issues.push(Issue::error("OUTPUT_EMPTY", "Output file is empty").with_source(&source));
    }
    if ext == "md" {
        if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
            issues.push(
                Issue::error(
                    "OUTPUT_NON_ASCII",
                    format!("Non-ASCII byte at offset {pos}"),
                )
                .with_source(&source),
            );
        }
    }
    issues
}
