//! Minimal PDF 1.4 writer for a [`PaginatedDocument`].
//!
//! Uses only the standard Helvetica faces (no embedding), uncompressed content streams, a pinned
//! creation date and no document ID. The output bytes are a pure function of the document.

use std::fmt::Write as _;

use crate::layout::font_metrics::FontFace;
use crate::layout::paginate::{PageItem, PaginatedDocument};

/// Creation and modification date written into every file.
pub const FIXED_PDF_DATE: &str = "D:20000101000000Z";

const PRODUCER: &str = "cv";
const RULE_WIDTH: f32 = 0.5;

// Fixed object numbers; pages start after these.
const CATALOG_OBJ: usize = 1;
const PAGES_OBJ: usize = 2;
const FONT_REGULAR_OBJ: usize = 3;
const FONT_BOLD_OBJ: usize = 4;
const INFO_OBJ: usize = 5;
const FIRST_PAGE_OBJ: usize = 6;

/// Formats a coordinate with at most two decimals and no trailing zeros.
fn num(value: f32) -> String {
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Escapes a PDF literal string. Non-ASCII characters become `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn content_stream(items: &[PageItem]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            PageItem::Text { y, size, runs } => {
                for run in runs {
                    let _ = writeln!(
                        out,
                        "BT /{} {} Tf {} {} Td ({}) Tj ET",
                        run.face.resource_name(),
                        num(*size),
                        num(run.x),
                        num(*y),
                        escape_text(&run.text)
                    );
                }
            }
            PageItem::Rule { y, x1, x2 } => {
                let _ = writeln!(
                    out,
                    "{} w {} {} m {} {} l S",
                    num(RULE_WIDTH),
                    num(*x1),
                    num(*y),
                    num(*x2),
                    num(*y)
                );
            }
        }
    }
    out
}

fn font_object(face: FontFace) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        face.base_font()
    )
}

struct PdfBuffer {
    bytes: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuffer {
    fn object(&mut self, number: usize, body: &str) {
        // Objects are written in number order, so index = number - 1.
        debug_assert_eq!(self.offsets.len() + 1, number);
        self.offsets.push(self.bytes.len());
        self.bytes
            .extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }
}

/// Serializes the document to PDF bytes.
pub fn write_pdf(doc: &PaginatedDocument) -> Vec<u8> {
    let mut pdf = PdfBuffer {
        bytes: Vec::new(),
        offsets: Vec::new(),
    };
    pdf.bytes.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let page_count = doc.pages.len();
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", FIRST_PAGE_OBJ + 2 * i))
        .collect();

    pdf.object(
        CATALOG_OBJ,
        &format!("<< /Type /Catalog /Pages {PAGES_OBJ} 0 R >>"),
    );
    pdf.object(
        PAGES_OBJ,
        &format!(
            "<< /Type /Pages /Kids [{}] /Count {page_count} >>",
            kids.join(" ")
        ),
    );
    pdf.object(FONT_REGULAR_OBJ, &font_object(FontFace::Regular));
    pdf.object(FONT_BOLD_OBJ, &font_object(FontFace::Bold));
    pdf.object(
        INFO_OBJ,
        &format!(
            "<< /Producer ({PRODUCER}) /CreationDate ({FIXED_PDF_DATE}) /ModDate ({FIXED_PDF_DATE}) >>"
        ),
    );

    let media_box = format!("[0 0 {} {}]", num(doc.page_width), num(doc.page_height));
    for (i, page) in doc.pages.iter().enumerate() {
        let page_obj = FIRST_PAGE_OBJ + 2 * i;
        let content_obj = page_obj + 1;
        pdf.object(
            page_obj,
            &format!(
                "<< /Type /Page /Parent {PAGES_OBJ} 0 R /MediaBox {media_box} \
                 /Resources << /Font << /F1 {FONT_REGULAR_OBJ} 0 R /F2 {FONT_BOLD_OBJ} 0 R >> >> \
                 /Contents {content_obj} 0 R >>"
            ),
        );
        let stream = content_stream(&page.items);
        pdf.object(
            content_obj,
            &format!(
                "<< /Length {} >>\nstream\n{stream}endstream",
                stream.len()
            ),
        );
    }

    let xref_offset = pdf.bytes.len();
    let size = pdf.offsets.len() + 1;
    let mut xref = format!("xref\n0 {size}\n0000000000 65535 f \n");
    for offset in &pdf.offsets {
        let _ = writeln!(xref, "{offset:010} 00000 n ");
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {size} /Root {CATALOG_OBJ} 0 R /Info {INFO_OBJ} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n"
    );
    pdf.bytes.extend_from_slice(xref.as_bytes());
    pdf.bytes
}
