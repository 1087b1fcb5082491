// Fixed-page layout: font metrics, run-aware wrapping, pagination and the PDF writer.
// Input is normalized markdown; output is a PaginatedDocument and its PDF bytes.

pub mod font_metrics;
pub mod paginate;
pub mod pdf;
pub mod wrap;

pub use font_metrics::{default_page_config, FontFace, PageConfig};
pub use paginate::{paginate, PageItem, PaginatedDocument};
pub use pdf::write_pdf;
