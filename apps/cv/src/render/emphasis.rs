//! Bold emphasis heuristic for experience bullets.

use std::sync::LazyLock;

use regex::Regex;

/// Verbs bolded when a bullet has no numbers. Order is irrelevant; the first occurrence in the
/// bullet wins.
pub const ACTION_VERBS: &[&str] = &[
    "led",
    "built",
    "reduced",
    "shipped",
    "improved",
    "increased",
    "designed",
    "developed",
    "implemented",
    "launched",
    "created",
    "automated",
    "optimized",
    "migrated",
    "delivered",
    "architected",
    "scaled",
    "drove",
    "owned",
    "managed",
    "mentored",
    "established",
    "introduced",
    "accelerated",
    "streamlined",
    "refactored",
    "deployed",
];

// Integer or decimal, optional magnitude suffix or percent, optional range.
static NUMERIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d+(?:\.\d+)?(?:[kKmMbB]\b|%)?(?:-\d+(?:\.\d+)?(?:[kKmMbB]\b|%)?)?",
    )
    .expect("numeric pattern is valid")
});

static VERB_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", ACTION_VERBS.join("|")))
        .expect("verb pattern is valid")
});

/// Emphasizes numbers, or failing that the first action verb. Bullets that already carry
/// `**` markup are returned unchanged.
pub fn emphasize_bullet(bullet: &str) -> String {
    if bullet.contains("**") {
        return bullet.to_string();
    }
    if NUMERIC_RE.is_match(bullet) {
        return NUMERIC_RE.replace_all(bullet, "**${0}**").into_owned();
    }
    match VERB_RE.find(bullet) {
        Some(m) => format!(
            "{}**{}**{}",
            &bullet[..m.start()],
            m.as_str(),
            &bullet[m.end()..]
        ),
        None => bullet.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_win_over_verbs() {
        assert_eq!(
            emphasize_bullet("Increased coverage by 3-5% through new tests."),
            "Increased coverage by **3-5%** through new tests."
        );
        assert_eq!(
            emphasize_bullet("Cut cost 40% and served 1.5M users in 2023"),
            "Cut cost **40%** and served **1.5M** users in **2023**"
        );
    }

    #[test]
    fn test_first_verb_keeps_case() {
        assert_eq!(
            emphasize_bullet("Improved uptime and led the on-call rotation."),
            "**Improved** uptime and led the on-call rotation."
        );
        assert_eq!(
            emphasize_bullet("Team members were MENTORED weekly"),
            "Team members were **MENTORED** weekly"
        );
    }

    #[test]
    fn test_verb_needs_word_boundary() {
        assert_eq!(
            emphasize_bullet("Misled nobody about ownership"),
            "Misled nobody about ownership"
        );
    }

    #[test]
    fn test_existing_markup_is_left_alone() {
        let bullet = "Built **fast** pipelines in 2 weeks";
        assert_eq!(emphasize_bullet(bullet), bullet);
    }

    #[test]
    fn test_digits_inside_words_are_not_numbers() {
        assert_eq!(emphasize_bullet("Tuned p99 latency"), "Tuned p99 latency");
    }

    #[test]
    fn test_deterministic() {
        let bullet = "Shipped 3 releases";
        assert_eq!(emphasize_bullet(bullet), emphasize_bullet(bullet));
    }
}
