//! Frontmatter splitting, parsing, and serialization.
//!
//! A frontmatter block is a YAML mapping at the very start of a document,
//! opened and closed by `---` lines.

use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::error::{Result, VaultpressError};
use crate::host::Frontmatter;

static FRONTMATTER_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^---\r?\n([\s\S]*?)\r?\n---\r?\n?").expect("frontmatter pattern is valid")
});

/// A document split into frontmatter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Parsed frontmatter, `None` when the document has no block
    pub frontmatter: Option<Frontmatter>,
    /// Everything after the frontmatter block
    pub body: String,
}

/// Byte offset at which the body starts (0 when there is no frontmatter).
pub fn body_start(content: &str) -> usize {
    FRONTMATTER_BLOCK
        .find(content)
        .map(|block| block.end())
        .unwrap_or(0)
}

/// Remove the leading frontmatter block, if any.
///
/// ```
/// use vaultpress_core::frontmatter::strip_frontmatter;
///
/// assert_eq!(strip_frontmatter("---\nslug: x\n---\nBody text"), "Body text");
/// assert_eq!(strip_frontmatter("Just a body"), "Just a body");
/// ```
pub fn strip_frontmatter(content: &str) -> &str {
    &content[body_start(content)..]
}

/// Split `content` into raw YAML and body without parsing the YAML.
pub fn split(content: &str) -> (Option<&str>, &str) {
    match FRONTMATTER_BLOCK.captures(content) {
        Some(caps) => {
            let yaml = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
            (Some(yaml), &content[end..])
        }
        None => (None, content),
    }
}

/// Parse the frontmatter YAML of a document.
pub fn parse(content: &str) -> Result<ParsedDocument> {
    let (yaml, body) = split(content);
    let frontmatter = yaml.map(parse_yaml).transpose()?;
    Ok(ParsedDocument {
        frontmatter,
        body: body.to_string(),
    })
}

fn parse_yaml(yaml: &str) -> Result<Frontmatter> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(mapping) => {
            let mut frontmatter = Frontmatter::with_capacity(mapping.len());
            for (key, value) in mapping {
                let key = match key {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(VaultpressError::InvalidFrontmatter(format!(
                            "unsupported key {:?}",
                            other
                        )));
                    }
                };
                frontmatter.insert(key, value);
            }
            Ok(frontmatter)
        }
        Value::Null => Ok(Frontmatter::new()),
        _ => Err(VaultpressError::InvalidFrontmatter(
            "frontmatter must be a mapping".to_string(),
        )),
    }
}

/// Render frontmatter and body back into a document.
pub fn serialize(frontmatter: &Frontmatter, body: &str) -> Result<String> {
    let yaml = if frontmatter.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(frontmatter)?
    };
    Ok(format!("---\n{}---\n{}", yaml, body))
}

/// Render a scalar frontmatter value as plain text.
///
/// Returns `None` for null, sequences, and mappings.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}
