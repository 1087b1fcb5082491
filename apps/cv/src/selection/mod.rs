//! Deterministic content selection.
//!
//! Decides which experience and project entries appear in a build and records an explainable
//! decision for every candidate. No I/O, no randomness, no reliance on hash iteration order.

pub mod explain;
pub mod scorer;

pub use explain::format_selection_explanation;
pub use scorer::{parse_recency, select_content, select_with_policy};

use serde::{Deserialize, Serialize};

/// Scoring record attached to every candidate, selected or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub item_id: String,
    pub score: f64,
    /// Sorted, deduplicated.
    pub matched_keywords: Vec<String>,
    pub reasons: Vec<String>,
}

/// Outcome of selection. Order of the id lists is the rendering order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub selected_experience_ids: Vec<String>,
    pub selected_project_ids: Vec<String>,
    pub decisions: Vec<SelectionDecision>,
}

impl SelectionResult {
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_experience_ids.iter().any(|s| s == id)
            || self.selected_project_ids.iter().any(|s| s == id)
    }
}

/// Product policy knobs. Defaults reproduce the shipped behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPolicy {
    pub max_experience: usize,
    pub max_projects: usize,
    pub tag_weight: f64,
    pub text_weight: f64,
    pub recency_weight: f64,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            max_experience: 3,
            max_projects: 2,
            tag_weight: 2.0,
            text_weight: 1.0,
            recency_weight: 0.001,
        }
    }
}
