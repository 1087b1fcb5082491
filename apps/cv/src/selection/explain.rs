//! Human-readable report of a selection, one line per candidate.

use crate::selection::{SelectionDecision, SelectionResult};

/// Formats every decision as
/// `<+|-> <id> score=<0.000> matched=<a,b|-> reasons=<r1; r2>`,
/// sorted by descending score then ascending id. `+` marks an included item.
pub fn format_selection_explanation(selection: &SelectionResult) -> String {
    let mut decisions: Vec<&SelectionDecision> = selection.decisions.iter().collect();
    decisions.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.item_id.cmp(&b.item_id))
    });

    let mut out = String::new();
    for d in decisions {
        let marker = if selection.is_selected(&d.item_id) {
            '+'
        } else {
            '-'
        };
        let matched = if d.matched_keywords.is_empty() {
            "-".to_string()
        } else {
            d.matched_keywords.join(",")
        };
        out.push_str(&format!(
            "{marker} {} score={:.3} matched={matched} reasons={}\n",
            d.item_id,
            d.score,
            d.reasons.join("; ")
        ));
    }
    out
}
