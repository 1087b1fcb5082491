//! ASCII-safe text normalization shared by the markdown and PDF artifacts.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static LETTER_DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z])(\d)").expect("letter-digit pattern is valid"));

static HSPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("whitespace pattern is valid"));

/// Typographic punctuation and its ASCII stand-in. Applied before decomposition.
const SUBSTITUTIONS: &[(char, &str)] = &[
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201A}', "'"),
    ('\u{2032}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{201E}', "\""),
    ('\u{2033}', "\""),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2012}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2015}', "-"),
    ('\u{2212}', "-"),
    ('\u{2026}', "..."),
    ('\u{2022}', "-"),
    ('\u{25CF}', "-"),
    ('\u{00A0}', " "),
    ('\u{2007}', " "),
    ('\u{2009}', " "),
    ('\u{202F}', " "),
];

fn substitute(c: char) -> Option<&'static str> {
    SUBSTITUTIONS
        .iter()
        .find_map(|(from, to)| (*from == c).then_some(*to))
}

/// Normalizes one line of output text to the ATS-safe ASCII subset.
///
/// Order matters: punctuation substitution, NFKD with non-ASCII stripped, a space between a
/// letter and a digit that follows it, then horizontal whitespace collapsed. Trailing whitespace
/// is trimmed.
pub fn normalize_text(text: &str) -> String {
    let mut substituted = String::with_capacity(text.len());
    for c in text.chars() {
        match substitute(c) {
            Some(replacement) => substituted.push_str(replacement),
            None => substituted.push(c),
        }
    }

    let ascii: String = substituted.nfkd().filter(char::is_ascii).collect();
    let spaced = LETTER_DIGIT_RE.replace_all(&ascii, "$1 $2");
    let collapsed = HSPACE_RE.replace_all(&spaced, " ");
    collapsed.trim_end().to_string()
}

/// Applies [`normalize_text`] to every line of a document. Output always ends with `\n`
/// unless empty.
pub fn normalize_document(text: &str) -> String {
    let mut out: String = text
        .lines()
        .map(normalize_text)
        .collect::<Vec<_>>()
        .join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
