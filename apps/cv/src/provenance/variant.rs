//! Filename convention for experience files, resolved once into an explicit variant.
//!
//! | file name                       | variant                      | priority |
//! |---------------------------------|------------------------------|----------|
//! | `user_<slug>.md`                | `Active { Authored }`        | 2        |
//! | `llm_<slug>.md`                 | `Active { Generated }`       | 1        |
//! | `user_<slug>.<epoch>[_<n>].md`  | `Archived`                   | 0        |
//! | anything else                   | `Inert`                      | 0        |

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const USER_PREFIX: &str = "user_";
pub const LLM_PREFIX: &str = "llm_";
pub const EXTENSION: &str = ".md";

static ACTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(user|llm)_([a-z0-9_]+)$").expect("active pattern is valid")
});
static ARCHIVED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^user_([a-z0-9_]+)\.([0-9]+)(?:_([0-9]+))?$").expect("archive pattern is valid")
});

/// Who wrote an active experience file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Authorship {
    /// Hand-written by the user. Always wins.
    Authored,
    /// Materialized from a validated model draft.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileVariant {
    Active {
        authorship: Authorship,
        slug: String,
    },
    Archived {
        slug: String,
        epoch: u64,
        counter: Option<u32>,
    },
    Inert,
}

impl FileVariant {
    /// Classifies a bare file name (no directory component).
    pub fn classify(file_name: &str) -> Self {
        let Some(stem) = file_name.strip_suffix(EXTENSION) else {
            return FileVariant::Inert;
        };

        if let Some(caps) = ACTIVE_RE.captures(stem) {
            let authorship = if &caps[1] == "user" {
                Authorship::Authored
            } else {
                Authorship::Generated
            };
            return FileVariant::Active {
                authorship,
                slug: caps[2].to_string(),
            };
        }

        if let Some(caps) = ARCHIVED_RE.captures(stem) {
            let Ok(epoch) = caps[2].parse::<u64>() else {
                return FileVariant::Inert;
            };
            return FileVariant::Archived {
                slug: caps[1].to_string(),
                epoch,
                counter: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            };
        }

        FileVariant::Inert
    }

    /// Precedence tier. Only tiers above zero take part in a build.
    pub fn priority(&self) -> u8 {
        match self {
            FileVariant::Active {
                authorship: Authorship::Authored,
                ..
            } => 2,
            FileVariant::Active {
                authorship: Authorship::Generated,
                ..
            } => 1,
            FileVariant::Archived { .. } | FileVariant::Inert => 0,
        }
    }

    pub fn is_authored(&self) -> bool {
        matches!(
            self,
            FileVariant::Active {
                authorship: Authorship::Authored,
                ..
            }
        )
    }

    pub fn is_generated(&self) -> bool {
        matches!(
            self,
            FileVariant::Active {
                authorship: Authorship::Generated,
                ..
            }
        )
    }
}

/// File name of the hand-authored variant for `slug`.
pub fn user_file_name(slug: &str) -> String {
    format!("{USER_PREFIX}{slug}{EXTENSION}")
}

/// File name of the model-authored variant for `slug`.
pub fn generated_file_name(slug: &str) -> String {
    format!("{LLM_PREFIX}{slug}{EXTENSION}")
}

/// File name of an archived copy of `user_<slug>.md`.
pub fn archived_file_name(slug: &str, epoch: u64, counter: Option<u32>) -> String {
    match counter {
        Some(n) => format!("{USER_PREFIX}{slug}.{epoch}_{n}{EXTENSION}"),
        None => format!("{USER_PREFIX}{slug}.{epoch}{EXTENSION}"),
    }
}
