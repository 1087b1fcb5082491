//! Tokenizer and job keyword universe.
//!
//! Shared by selection scoring and draft grounding so both agree on what a "word" is.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::JobSpec;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9][a-z0-9+.#-]*").expect("token pattern is valid"));

/// Lower-cases `text` and returns its alphanumeric-plus-symbol tokens in order of appearance.
///
/// Symbols `+ . # -` are kept inside a token so `c++`, `c#`, `node.js` survive intact. Trailing
/// `.` and `-` are trimmed from each match so sentence punctuation is not glued on.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().trim_end_matches(['.', '-']).to_string())
        .collect()
}

/// Token set over several text fields.
pub fn token_set<'a, I>(texts: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts.into_iter().flat_map(tokenize).collect()
}

/// Keyword universe of a job: explicit keywords ∪ tokens(raw_text) ∪ tokens(title).
///
/// Explicit keywords are lower-cased and trimmed but otherwise kept whole, so multi-word
/// phrases can still match a tag verbatim.
pub fn job_keywords(job: &JobSpec) -> BTreeSet<String> {
    let mut keywords: BTreeSet<String> = job
        .keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    keywords.extend(tokenize(&job.raw_text));
    if let Some(title) = &job.title {
        keywords.extend(tokenize(title));
    }
    keywords
}
