//! Walks a normalized markdown document and places its lines on fixed-size pages.
//!
//! Line kinds are recognised by their leading marker only:
//! `# ` name, `## ` section, `### ` sub-heading, `- ` bullet, `---` rule, blank, and the first
//! plain line after the name is the contact line. Everything else is a body paragraph.
//! Coordinates are PDF points with the origin at the bottom-left of the page.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::font_metrics::{FontFace, PageConfig};
use crate::layout::wrap::{split_emphasis, wrap_segments, Segment};

const BULLET_GLYPH: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedRun {
    pub x: f32,
    pub text: String,
    pub face: FontFace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageItem {
    /// One output line; `y` is the text baseline.
    Text {
        y: f32,
        size: f32,
        runs: Vec<PlacedRun>,
    },
    Rule {
        y: f32,
        x1: f32,
        x2: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<PageItem>,
}

/// Fixed-page rendering of a document. Always has at least one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginatedDocument {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Name,
    Contact,
    Section,
    Subheading,
    Bullet,
    Rule,
    Blank,
    Paragraph,
}

/// Classifies a line. `awaiting_contact` is true between the name and the first plain line.
pub fn classify_line(line: &str, awaiting_contact: bool) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed == "---" {
        LineKind::Rule
    } else if line.starts_with("### ") {
        LineKind::Subheading
    } else if line.starts_with("## ") {
        LineKind::Section
    } else if line.starts_with("# ") {
        LineKind::Name
    } else if line.starts_with("- ") {
        LineKind::Bullet
    } else if awaiting_contact {
        LineKind::Contact
    } else {
        LineKind::Paragraph
    }
}

struct Paginator<'a> {
    config: &'a PageConfig,
    pages: Vec<Page>,
    current: Page,
    /// Top of the next line box.
    cursor: f32,
}

impl<'a> Paginator<'a> {
    fn new(config: &'a PageConfig) -> Self {
        Self {
            config,
            pages: Vec::new(),
            current: Page::default(),
            cursor: config.page_height - config.margin_top,
        }
    }

    fn page_top(&self) -> f32 {
        self.config.page_height - self.config.margin_top
    }

    fn break_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor = self.page_top();
    }

    /// Reserves `height` below the cursor, breaking to a new page when it would cross the bottom
    /// margin. Returns the top of the reserved box.
    fn reserve(&mut self, height: f32) -> f32 {
        if self.cursor - height < self.config.margin_bottom && !self.current.items.is_empty() {
            self.break_page();
        }
        let top = self.cursor;
        self.cursor -= height;
        top
    }

    fn gap(&mut self, height: f32) {
        // Vertical space never carries over to the top of a fresh page.
        if self.current.items.is_empty() {
            return;
        }
        self.cursor -= height;
    }

    fn text(&mut self, segments: &[Segment], size: f32, left: f32, width: f32) {
        let height = self.config.line_height(size);
        for line in wrap_segments(segments, size, width) {
            let top = self.reserve(height);
            let runs = line
                .runs
                .into_iter()
                .map(|run| PlacedRun {
                    x: left + run.x,
                    text: run.text,
                    face: run.face,
                })
                .collect();
            self.current.items.push(PageItem::Text {
                y: top - size,
                size,
                runs,
            });
        }
    }

    fn bullet(&mut self, body: &str) {
        let size = self.config.sizes.body;
        let height = self.config.line_height(size);
        let left = self.config.margin_left;
        let indent = self.config.bullet_indent;
        let lines = wrap_segments(
            &split_emphasis(body),
            size,
            self.config.text_width() - indent,
        );
        for (i, line) in lines.into_iter().enumerate() {
            let top = self.reserve(height);
            let mut runs = Vec::with_capacity(line.runs.len() + 1);
            if i == 0 {
                runs.push(PlacedRun {
                    x: left,
                    text: BULLET_GLYPH.to_string(),
                    face: FontFace::Regular,
                });
            }
            runs.extend(line.runs.into_iter().map(|run| PlacedRun {
                x: left + indent + run.x,
                text: run.text,
                face: run.face,
            }));
            self.current.items.push(PageItem::Text {
                y: top - size,
                size,
                runs,
            });
        }
    }

    fn rule(&mut self) {
        let height = self.config.line_height(self.config.sizes.body) * 0.6;
        let top = self.reserve(height);
        self.current.items.push(PageItem::Rule {
            y: top - height / 2.0,
            x1: self.config.margin_left,
            x2: self.config.page_width - self.config.margin_right,
        });
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.items.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

fn all_bold(text: &str) -> Vec<Segment> {
    split_emphasis(text)
        .into_iter()
        .map(|s| Segment { bold: true, ..s })
        .collect()
}

/// Lays out `markdown` line by line. Input is expected to be normalized already.
pub fn paginate(markdown: &str, config: &PageConfig) -> PaginatedDocument {
    let sizes = config.sizes;
    let left = config.margin_left;
    let width = config.text_width();
    let mut paginator = Paginator::new(config);
    let mut awaiting_contact = false;

    for line in markdown.lines() {
        let kind = classify_line(line, awaiting_contact);
        match kind {
            LineKind::Name => {
                awaiting_contact = true;
                paginator.text(&all_bold(&line[2..]), sizes.name, left, width);
            }
            LineKind::Contact => {
                awaiting_contact = false;
                paginator.text(&split_emphasis(line), sizes.contact, left, width);
            }
            LineKind::Section => {
                awaiting_contact = false;
                paginator.text(&all_bold(&line[3..]), sizes.section, left, width);
            }
            LineKind::Subheading => {
                awaiting_contact = false;
                paginator.text(&all_bold(&line[4..]), sizes.subheading, left, width);
            }
            LineKind::Bullet => paginator.bullet(&line[2..]),
            LineKind::Rule => paginator.rule(),
            LineKind::Blank => paginator.gap(config.line_height(sizes.body) * 0.5),
            LineKind::Paragraph => {
                paginator.text(&split_emphasis(line), sizes.body, left, width);
            }
        }
    }

    let pages = paginator.finish();
    debug!(pages = pages.len(), "Paginated document");
    PaginatedDocument {
        page_width: config.page_width,
        page_height: config.page_height,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::font_metrics::default_page_config;

    fn text_items(page: &Page) -> Vec<(f32, String)> {
        page.items
            .iter()
            .filter_map(|item| match item {
                PageItem::Text { size, runs, .. } => Some((
                    *size,
                    runs.iter().map(|r| r.text.as_str()).collect::<Vec<_>>().join("|"),
                )),
                PageItem::Rule { .. } => None,
            })
            .collect()
    }

    #[test]
    fn test_classify_line_markers() {
        assert_eq!(classify_line("# Name", false), LineKind::Name);
        assert_eq!(classify_line("## Skills", false), LineKind::Section);
        assert_eq!(classify_line("### Role - Co", false), LineKind::Subheading);
        assert_eq!(classify_line("- bullet", false), LineKind::Bullet);
        assert_eq!(classify_line("---", false), LineKind::Rule);
        assert_eq!(classify_line("  ", false), LineKind::Blank);
        assert_eq!(classify_line("Engineer - Berlin", true), LineKind::Contact);
        assert_eq!(classify_line("Engineer - Berlin", false), LineKind::Paragraph);
    }

    #[test]
    fn test_sizes_and_faces_by_kind() {
        let config = default_page_config();
        let doc = paginate(
            "# Jane Doe\nEngineer - Berlin\n\n---\n\n## Experience\n### Eng - Acme | 2022-01 - Present\n- Cut cost **40%**\nPlain paragraph\n",
            &config,
        );
        assert_eq!(doc.pages.len(), 1);
        let items = text_items(&doc.pages[0]);
        assert_eq!(
            items,
            vec![
                (18.0, "Jane Doe".to_string()),
                (10.0, "Engineer - Berlin".to_string()),
                (13.0, "Experience".to_string()),
                (11.0, "Eng - Acme | 2022-01 - Present".to_string()),
                (10.0, "-|Cut cost|40%".to_string()),
                (10.0, "Plain paragraph".to_string()),
            ]
        );
        assert!(doc.pages[0]
            .items
            .iter()
            .any(|item| matches!(item, PageItem::Rule { .. })));

        let PageItem::Text { runs, .. } = &doc.pages[0].items[0] else {
            panic!("name line should be text");
        };
        assert_eq!(runs[0].face, FontFace::Bold);
        assert!((runs[0].x - config.margin_left).abs() < 1e-4);
    }

    #[test]
    fn test_bullet_continuation_is_indented() {
        let config = default_page_config();
        let long = "word ".repeat(200);
        let doc = paginate(&format!("- {long}\n"), &config);
        let items = &doc.pages[0].items;
        assert!(items.len() > 1);
        for (i, item) in items.iter().enumerate() {
            let PageItem::Text { runs, .. } = item else {
                panic!("expected text");
            };
            let text_run = if i == 0 { &runs[1] } else { &runs[0] };
            assert!((text_run.x - (config.margin_left + config.bullet_indent)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_long_document_breaks_pages_within_margins() {
        let config = default_page_config();
        let body: String = (0..150).map(|i| format!("- Bullet number {i}\n")).collect();
        let doc = paginate(&body, &config);
        assert!(doc.pages.len() >= 2, "expected a page break");
        for page in &doc.pages {
            for item in &page.items {
                if let PageItem::Text { y, .. } = item {
                    assert!(*y >= config.margin_bottom - 1e-3, "baseline {y} below margin");
                    assert!(*y <= config.page_height - config.margin_top);
                }
            }
        }
    }

    #[test]
    fn test_empty_document_has_one_blank_page() {
        let doc = paginate("", &default_page_config());
        assert_eq!(doc.pages.len(), 1);
        assert!(doc.pages[0].items.is_empty());
    }

    #[test]
    fn test_paginate_is_deterministic() {
        let config = default_page_config();
        let md = "# A\nB\n\n## C\n- **Led** 3 teams\n";
        assert_eq!(paginate(md, &config), paginate(md, &config));
    }
}
