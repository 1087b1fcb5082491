//! Run-aware greedy word wrap.
//!
//! A markdown line is split on `**` into plain/bold segments, segments into words, and words are
//! packed onto lines while the measured width fits. Punctuation glued to an emphasized span
//! (`**40%**,`) stays attached to the same word, so no space is invented between them.

use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::{get_metrics, FontFace};

const EMPHASIS_MARKER: &str = "**";

/// A span of text with uniform emphasis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
}

/// A run positioned relative to the start of its line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub x: f32,
    pub text: String,
    pub face: FontFace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrappedLine {
    pub runs: Vec<Run>,
    pub width: f32,
}

/// Splits a line on the emphasis marker. An unmatched trailing marker is kept as literal text.
pub fn split_emphasis(line: &str) -> Vec<Segment> {
    let parts: Vec<&str> = line.split(EMPHASIS_MARKER).collect();
    let balanced = parts.len() % 2 == 1;
    let mut segments: Vec<Segment> = Vec::new();
    for (i, part) in parts.iter().enumerate() {
        let last = i == parts.len() - 1;
        if !balanced && last {
            segments.push(Segment {
                text: format!("{EMPHASIS_MARKER}{part}"),
                bold: false,
            });
            continue;
        }
        if part.is_empty() {
            continue;
        }
        segments.push(Segment {
            text: part.to_string(),
            bold: i % 2 == 1,
        });
    }
    segments
}

/// A whitespace-delimited word, possibly spanning an emphasis boundary.
#[derive(Debug, Clone)]
struct Word {
    pieces: Vec<(String, FontFace)>,
}

impl Word {
    fn width(&self, size: f32) -> f32 {
        self.pieces
            .iter()
            .map(|(text, face)| get_metrics(*face).measure(text, size))
            .sum()
    }
}

fn words_of(segments: &[Segment]) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut after_space = true;
    for segment in segments {
        if segment.text.is_empty() {
            continue;
        }
        let face = FontFace::for_emphasis(segment.bold);
        let glue = !after_space && !segment.text.starts_with(char::is_whitespace);
        for (i, token) in segment.text.split_whitespace().enumerate() {
            match words.last_mut() {
                Some(word) if i == 0 && glue => word.pieces.push((token.to_string(), face)),
                _ => words.push(Word {
                    pieces: vec![(token.to_string(), face)],
                }),
            }
        }
        after_space = segment.text.ends_with(char::is_whitespace);
    }
    words
}

/// Greedy wrap of `segments` at `size` points into lines no wider than `max_width`.
///
/// A word wider than `max_width` gets a line to itself. Empty input yields no lines.
pub fn wrap_segments(segments: &[Segment], size: f32, max_width: f32) -> Vec<WrappedLine> {
    let words = words_of(segments);
    let space_w = get_metrics(FontFace::Regular).space_width(size);

    let mut lines: Vec<Vec<Word>> = Vec::new();
    let mut current: Vec<Word> = Vec::new();
    let mut current_width = 0.0_f32;

    for word in words {
        let word_w = word.width(size);
        if !current.is_empty() && current_width + space_w + word_w > max_width {
            lines.push(std::mem::take(&mut current));
            current_width = word_w;
        } else if current.is_empty() {
            current_width = word_w;
        } else {
            current_width += space_w + word_w;
        }
        current.push(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines
        .into_iter()
        .map(|line| place_runs(&line, size, space_w))
        .collect()
}

fn place_runs(words: &[Word], size: f32, space_w: f32) -> WrappedLine {
    let mut runs: Vec<Run> = Vec::new();
    let mut x = 0.0_f32;
    for (wi, word) in words.iter().enumerate() {
        for (pi, (text, face)) in word.pieces.iter().enumerate() {
            let leading_space = wi > 0 && pi == 0;
            match runs.last_mut() {
                Some(run) if run.face == *face => {
                    if leading_space {
                        run.text.push(' ');
                    }
                    run.text.push_str(text);
                }
                _ => {
                    let start = if leading_space { x + space_w } else { x };
                    runs.push(Run {
                        x: start,
                        text: text.clone(),
                        face: *face,
                    });
                }
            }
            if leading_space {
                x += space_w;
            }
            x += get_metrics(*face).measure(text, size);
        }
    }
    WrappedLine { runs, width: x }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> Vec<Segment> {
        vec![Segment {
            text: text.to_string(),
            bold: false,
        }]
    }

    fn texts(line: &WrappedLine) -> Vec<(&str, FontFace)> {
        line.runs.iter().map(|r| (r.text.as_str(), r.face)).collect()
    }

    #[test]
    fn test_split_emphasis_alternates() {
        let segments = split_emphasis("Cut cost **40%** in **2023**");
        let bold: Vec<(&str, bool)> = segments.iter().map(|s| (s.text.as_str(), s.bold)).collect();
        assert_eq!(
            bold,
            vec![
                ("Cut cost ", false),
                ("40%", true),
                (" in ", false),
                ("2023", true)
            ]
        );
    }

    #[test]
    fn test_split_emphasis_unmatched_marker_is_literal() {
        let segments = split_emphasis("a **b");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].text, "**b");
        assert!(!segments[1].bold);
    }

    #[test]
    fn test_empty_input_produces_no_lines() {
        assert!(wrap_segments(&plain("   "), 10.0, 100.0).is_empty());
        assert!(wrap_segments(&[], 10.0, 100.0).is_empty());
    }

    #[test]
    fn test_short_text_fits_one_line() {
        let lines = wrap_segments(&plain("Built the ledger"), 10.0, 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(texts(&lines[0]), vec![("Built the ledger", FontFace::Regular)]);
    }

    #[test]
    fn test_wraps_when_width_exceeded() {
        // "aaaa" at 10pt = 4 * 5.56 = 22.24pt; two words plus a space = 47.26pt
        let lines = wrap_segments(&plain("aaaa aaaa aaaa"), 10.0, 48.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[0]), vec![("aaaa aaaa", FontFace::Regular)]);
        assert_eq!(texts(&lines[1]), vec![("aaaa", FontFace::Regular)]);
        assert!(lines.iter().all(|l| l.width <= 48.0));
    }

    #[test]
    fn test_overlong_word_gets_own_line() {
        let lines = wrap_segments(&plain("a supercalifragilistic b"), 10.0, 30.0);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].runs[0].text, "supercalifragilistic");
    }

    #[test]
    fn test_runs_switch_faces_with_offsets() {
        let lines = wrap_segments(&split_emphasis("by **40%** now"), 10.0, 500.0);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(
            texts(line),
            vec![
                ("by", FontFace::Regular),
                ("40%", FontFace::Bold),
                ("now", FontFace::Regular)
            ]
        );
        let space = get_metrics(FontFace::Regular).space_width(10.0);
        let by = get_metrics(FontFace::Regular).measure("by", 10.0);
        assert!((line.runs[1].x - (by + space)).abs() < 1e-4);
    }

    #[test]
    fn test_punctuation_stays_glued_to_emphasis() {
        let lines = wrap_segments(&split_emphasis("**Improved**, then"), 10.0, 500.0);
        let line = &lines[0];
        assert_eq!(
            texts(line),
            vec![("Improved", FontFace::Bold), (", then", FontFace::Regular)]
        );
        let bold_w = get_metrics(FontFace::Bold).measure("Improved", 10.0);
        assert!((line.runs[1].x - bold_w).abs() < 1e-4);
    }
}
