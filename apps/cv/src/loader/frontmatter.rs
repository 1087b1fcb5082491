//! Frontmatter documents: a `---` line, a YAML mapping, a closing `---` line, then a body.
//!
//! The mapping is held as a JSON value so typed decoding goes through one serde path. Flow-style
//! (JSON) frontmatter is valid YAML and parses the same way.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

const DELIMITER: &str = "---";

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("missing closing frontmatter delimiter")]
    Unterminated,

    #[error("frontmatter must be a mapping")]
    NotAMapping,

    #[error("invalid frontmatter: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("frontmatter fields do not match: {0}")]
    Fields(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontmatterDocument {
    pub frontmatter: Map<String, Value>,
    pub body: String,
}

impl FrontmatterDocument {
    /// Deserializes the frontmatter mapping into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, FrontmatterError> {
        Ok(serde_json::from_value(Value::Object(self.frontmatter.clone()))?)
    }
}

/// Splits `text` into frontmatter and body. Text without a leading delimiter is all body.
pub fn parse_frontmatter(text: &str) -> Result<FrontmatterDocument, FrontmatterError> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let starts_with_delimiter = lines
        .first()
        .map(|l| l.trim() == DELIMITER)
        .unwrap_or(false);
    if !starts_with_delimiter {
        return Ok(FrontmatterDocument {
            frontmatter: Map::new(),
            body: text.to_string(),
        });
    }

    let end = lines
        .iter()
        .skip(1)
        .position(|l| l.trim() == DELIMITER)
        .map(|i| i + 1)
        .ok_or(FrontmatterError::Unterminated)?;

    let raw = lines[1..end].concat();
    let body = lines[end + 1..].concat();

    let frontmatter = if raw.trim().is_empty() {
        Map::new()
    } else {
        match serde_yaml::from_str::<Value>(&raw)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(FrontmatterError::NotAMapping),
        }
    };

    Ok(FrontmatterDocument { frontmatter, body })
}

/// Renders `value` as a YAML frontmatter block followed by `body`.
pub fn render_frontmatter<T: Serialize>(value: &T, body: &str) -> Result<String, FrontmatterError> {
    let yaml = serde_yaml::to_string(value)?;
    let mut out = format!("{DELIMITER}\n{}\n{DELIMITER}\n", yaml.trim_end());
    out.push_str(body);
    Ok(out)
}
