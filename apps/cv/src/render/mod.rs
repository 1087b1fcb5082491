//! Renderer: one normalized markdown text, and the paginated document laid out from it.
//!
//! Both artifacts come from the same normalized lines, so they never disagree on characters.

pub mod emphasis;
pub mod markdown;
pub mod normalize;

pub use markdown::{build_markdown, SkillsView};
pub use normalize::{normalize_document, normalize_text};

use tracing::info;

use crate::layout::{paginate, write_pdf, PageConfig, PaginatedDocument};
use crate::models::CanonicalData;
use crate::selection::SelectionResult;

/// Everything that determines the rendered output of one build.
#[derive(Debug, Clone, Copy)]
pub struct DocumentModel<'a> {
    pub data: &'a CanonicalData,
    pub selection: &'a SelectionResult,
    pub skills: &'a SkillsView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCv {
    pub markdown: String,
    pub document: PaginatedDocument,
}

impl RenderedCv {
    pub fn pdf_bytes(&self) -> Vec<u8> {
        write_pdf(&self.document)
    }
}

/// Renders a document model. Deterministic: same model, same bytes.
pub fn render(model: DocumentModel<'_>, page: &PageConfig) -> RenderedCv {
    let markdown = build_markdown(model.data, model.selection, model.skills);
    let document = paginate(&markdown, page);
    info!(
        lines = markdown.lines().count(),
        pages = document.pages.len(),
        "Rendered CV"
    );
    RenderedCv { markdown, document }
}

/// Re-renders hand-edited markdown through the same normalization and layout path.
pub fn render_markdown_source(source: &str, page: &PageConfig) -> RenderedCv {
    let markdown = normalize_document(source);
    let document = paginate(&markdown, page);
    RenderedCv { markdown, document }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{default_page_config, PageItem};
    use crate::models::{ExperienceEntry, Profile, Skills, SkillsCategory};

    fn data() -> CanonicalData {
        CanonicalData {
            profile: Profile {
                id: "profile".to_string(),
                name: "Ren\u{e9}e Smith".to_string(),
                headline: "Engineer".to_string(),
                location: "Remote".to_string(),
                email: None,
                links: vec![],
                about_me: "Ships \u{201C}boring\u{201D} software\u{2026}".to_string(),
                source_path: None,
            },
            experience: vec![ExperienceEntry {
                id: "exp_acme".to_string(),
                company: "Acme".to_string(),
                title: "Engineer".to_string(),
                location: None,
                start_date: "2021-02".to_string(),
                end_date: None,
                tags: vec![],
                keywords: vec![],
                bullets: vec!["Reduced build time by 35% \u{2022} twice".to_string()],
                source_path: None,
            }],
            projects: vec![],
            skills: Skills {
                id: "skills".to_string(),
                categories: vec![SkillsCategory {
                    name: "Languages".to_string(),
                    items: vec!["Rust".to_string()],
                }],
                source_path: None,
            },
            education: None,
        }
    }

    fn selection() -> SelectionResult {
        SelectionResult {
            selected_experience_ids: vec!["exp_acme".to_string()],
            selected_project_ids: vec![],
            decisions: vec![],
        }
    }

    fn pdf_text(doc: &PaginatedDocument) -> String {
        let mut out = Vec::new();
        for page in &doc.pages {
            for item in &page.items {
                if let PageItem::Text { runs, .. } = item {
                    out.extend(runs.iter().map(|r| r.text.clone()));
                }
            }
        }
        out.join(" ")
    }

    #[test]
    fn test_render_is_deterministic() {
        let data = data();
        let selection = selection();
        let skills = SkillsView::default();
        let model = DocumentModel {
            data: &data,
            selection: &selection,
            skills: &skills,
        };
        let page = default_page_config();
        let first = render(model, &page);
        let second = render(model, &page);
        assert_eq!(first, second);
        assert_eq!(first.pdf_bytes(), second.pdf_bytes());
    }

    #[test]
    fn test_artifacts_agree_and_are_ascii() {
        let data = data();
        let selection = selection();
        let skills = SkillsView::default();
        let rendered = render(
            DocumentModel {
                data: &data,
                selection: &selection,
                skills: &skills,
            },
            &default_page_config(),
        );
        assert!(rendered.markdown.is_ascii());
        assert!(rendered.markdown.contains("Ships \"boring\" software..."));
        assert!(rendered.markdown.contains("- Reduced build time by **35%** - twice"));

        let text = pdf_text(&rendered.document);
        assert!(text.is_ascii());
        assert!(text.contains("Renee Smith"));
        assert!(text.contains("Ships \"boring\" software..."));
        assert!(text.contains("35%"));
    }

    #[test]
    fn test_markdown_source_round_trip_matches_render() {
        let data = data();
        let selection = selection();
        let skills = SkillsView::default();
        let page = default_page_config();
        let rendered = render(
            DocumentModel {
                data: &data,
                selection: &selection,
                skills: &skills,
            },
            &page,
        );
        let again = render_markdown_source(&rendered.markdown, &page);
        assert_eq!(again, rendered);
    }

    #[test]
    fn test_markdown_source_is_normalized() {
        let rendered = render_markdown_source("# Zo\u{eb}\n- caf\u{e9}\u{2014}bar\n", &default_page_config());
        assert_eq!(rendered.markdown, "# Zoe\n- cafe-bar\n");
        assert_eq!(pdf_text(&rendered.document), "Zoe - cafe-bar");
    }
}
