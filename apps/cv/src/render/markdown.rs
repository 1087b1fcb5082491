//! Assembles the markdown artifact from canonical facts and a selection.

use std::collections::BTreeSet;

use crate::models::{CanonicalData, EducationEntry, ExperienceEntry, ProjectEntry};
use crate::render::emphasis::emphasize_bullet;
use crate::render::normalize::normalize_text;
use crate::selection::{parse_recency, SelectionResult};

/// Skill presentation for one build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkillsView {
    /// Items rendered in bold.
    pub highlighted: Vec<String>,
    /// When present, only these items are rendered.
    pub filter: Option<Vec<String>>,
}

struct Lines {
    lines: Vec<String>,
}

impl Lines {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn section(&mut self, title: &str) {
        self.blank();
        self.push("---");
        self.push("");
        self.push(format!("## {title}"));
    }

    fn finish(mut self) -> String {
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        let mut out = self
            .lines
            .iter()
            .map(|l| normalize_text(l))
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }
}

/// Renders the full markdown document. Every line goes through [`normalize_text`].
pub fn build_markdown(
    data: &CanonicalData,
    selection: &SelectionResult,
    skills: &SkillsView,
) -> String {
    let mut out = Lines { lines: Vec::new() };
    let profile = &data.profile;

    out.push(format!("# {}", profile.name.trim()));
    let mut contact: Vec<&str> = vec![profile.headline.trim(), profile.location.trim()];
    if let Some(email) = &profile.email {
        contact.push(email.trim());
    }
    contact.extend(profile.links.iter().map(|l| l.url.trim()));
    contact.retain(|part| !part.is_empty());
    if !contact.is_empty() {
        out.push(contact.join(" - "));
    }

    if !profile.about_me.trim().is_empty() {
        out.section("About Me");
        out.push(profile.about_me.trim());
    }

    let mut experience: Vec<&ExperienceEntry> = data
        .experience
        .iter()
        .filter(|e| selection.selected_experience_ids.contains(&e.id))
        .collect();
    experience.sort_by(|a, b| {
        parse_recency(&b.start_date)
            .cmp(&parse_recency(&a.start_date))
            .then_with(|| b.start_date.cmp(&a.start_date))
            .then_with(|| b.id.cmp(&a.id))
    });
    if !experience.is_empty() {
        out.section("Experience");
        for entry in experience {
            out.blank();
            out.push(experience_heading(entry));
            for bullet in entry.bullets.iter().filter(|b| !b.trim().is_empty()) {
                out.push(format!("- {}", emphasize_bullet(bullet.trim())));
            }
        }
    }

    let mut projects: Vec<&ProjectEntry> = data
        .projects
        .iter()
        .filter(|p| selection.selected_project_ids.contains(&p.id))
        .collect();
    projects.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    if !projects.is_empty() {
        out.section("Projects");
        for project in projects {
            out.blank();
            out.push(format!("### {}", project.name.trim()));
            for bullet in project.bullets.iter().filter(|b| !b.trim().is_empty()) {
                out.push(format!("- {}", bullet.trim()));
            }
        }
    }

    let skill_lines = skill_lines(data, skills);
    if !skill_lines.is_empty() {
        out.section("Skills");
        for line in skill_lines {
            out.push(line);
        }
    }

    if let Some(education) = &data.education {
        if !education.entries.is_empty() || !education.languages.is_empty() {
            out.section("Education and Languages");
            for entry in &education.entries {
                out.push(education_line(entry));
            }
            if !education.languages.is_empty() {
                out.blank();
                out.push(format!("**Languages**: {}", education.languages.join(", ")));
            }
        }
    }

    out.finish()
}

fn experience_heading(entry: &ExperienceEntry) -> String {
    let location = match entry.location.as_deref().map(str::trim) {
        Some(loc) if !loc.is_empty() => format!(" ({loc})"),
        _ => String::new(),
    };
    let end = match entry.end_date.as_deref().map(str::trim) {
        Some(end) if !end.is_empty() => end,
        _ => "Present",
    };
    format!(
        "### {} - {}{location} | {} - {end}",
        entry.title.trim(),
        entry.company.trim(),
        entry.start_date.trim()
    )
}

fn education_line(entry: &EducationEntry) -> String {
    let mut line = format!("- {} - {}", entry.degree.trim(), entry.institution.trim());
    if let Some(loc) = entry.location.as_deref().map(str::trim) {
        if !loc.is_empty() {
            line.push_str(&format!(" ({loc})"));
        }
    }
    let dates: Vec<&str> = [entry.start_date.as_deref(), entry.end_date.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();
    if !dates.is_empty() {
        line.push_str(&format!(" | {}", dates.join(" - ")));
    }
    line
}

fn skill_lines(data: &CanonicalData, view: &SkillsView) -> Vec<String> {
    let highlighted: BTreeSet<&str> = view.highlighted.iter().map(|s| s.trim()).collect();
    let filter: Option<BTreeSet<&str>> = view
        .filter
        .as_ref()
        .map(|items| items.iter().map(|s| s.trim()).collect());

    let mut lines = Vec::new();
    for category in &data.skills.categories {
        let items: Vec<String> = category
            .items
            .iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .filter(|item| filter.as_ref().map_or(true, |f| f.contains(item)))
            .map(|item| {
                if highlighted.contains(item) {
                    format!("**{item}**")
                } else {
                    item.to_string()
                }
            })
            .collect();
        if !items.is_empty() {
            lines.push(format!("**{}**: {}", category.name.trim(), items.join(", ")));
        }
    }
    lines
}
