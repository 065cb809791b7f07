//! Post frontmatter validation and the payload sent to the CMS.

use serde::Serialize;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::error::{Result, VaultpressError};
use crate::frontmatter::scalar_to_string;
use crate::host::Frontmatter;

/// Frontmatter keys that must be present and non-null to publish.
pub const REQUIRED_FIELDS: [&str; 5] = ["slug", "title", "description", "author", "published"];

/// Required fields that are absent or null, in [`REQUIRED_FIELDS`] order.
///
/// Only presence is checked; values are not type-checked.
pub fn missing_required_fields(frontmatter: &Frontmatter) -> Vec<&'static str> {
    REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| matches!(frontmatter.get(*field), None | Some(YamlValue::Null)))
        .collect()
}

/// Post metadata read from a document's frontmatter.
///
/// Values are carried verbatim (converted to JSON) so that whatever the
/// author wrote is what the CMS receives.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFrontmatter {
    /// URL slug identifying the post
    pub slug: String,
    /// Post title
    pub title: JsonValue,
    /// Short description
    pub description: JsonValue,
    /// Author name
    pub author: JsonValue,
    /// Publication flag
    pub published: JsonValue,
    /// Tags, when present and non-null
    pub tags: Option<JsonValue>,
    /// Publication timestamp, when present and non-null
    pub published_at: Option<JsonValue>,
}

impl PostFrontmatter {
    /// Extract post metadata from frontmatter.
    ///
    /// Callers check [`missing_required_fields`] first; a missing field here
    /// is reported as invalid frontmatter.
    pub fn from_frontmatter(frontmatter: &Frontmatter) -> Result<Self> {
        let slug_value = required(frontmatter, "slug")?;
        let slug = scalar_to_string(slug_value).ok_or_else(|| {
            VaultpressError::InvalidFrontmatter("slug must be a plain value".to_string())
        })?;

        Ok(Self {
            slug,
            title: to_json(required(frontmatter, "title")?)?,
            description: to_json(required(frontmatter, "description")?)?,
            author: to_json(required(frontmatter, "author")?)?,
            published: to_json(required(frontmatter, "published")?)?,
            tags: optional(frontmatter, "tags")?,
            published_at: optional(frontmatter, "published_at")?,
        })
    }
}

fn required<'a>(frontmatter: &'a Frontmatter, field: &str) -> Result<&'a YamlValue> {
    match frontmatter.get(field) {
        None | Some(YamlValue::Null) => Err(VaultpressError::InvalidFrontmatter(format!(
            "missing required field '{}'",
            field
        ))),
        Some(value) => Ok(value),
    }
}

fn optional(frontmatter: &Frontmatter, field: &str) -> Result<Option<JsonValue>> {
    match frontmatter.get(field) {
        None | Some(YamlValue::Null) => Ok(None),
        Some(value) => to_json(value).map(Some),
    }
}

fn to_json(value: &YamlValue) -> Result<JsonValue> {
    Ok(serde_json::to_value(value)?)
}

/// Body of the create and update requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostPayload {
    /// URL slug identifying the post
    pub slug: String,
    /// Post title
    pub title: JsonValue,
    /// Short description
    pub description: JsonValue,
    /// Author name
    pub author: JsonValue,
    /// Tags, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<JsonValue>,
    /// Publication flag
    pub published: JsonValue,
    /// Publication timestamp, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<JsonValue>,
    /// Markdown body with frontmatter removed and images rewritten
    pub content_markdown: String,
    /// Hosted URL of the representative image, omitted when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

impl PostPayload {
    /// Assemble the payload. Optional fields are kept only when truthy.
    pub fn new(
        post: PostFrontmatter,
        content_markdown: String,
        thumbnail_url: Option<String>,
    ) -> Self {
        Self {
            slug: post.slug,
            title: post.title,
            description: post.description,
            author: post.author,
            tags: post.tags.filter(is_truthy),
            published: post.published,
            published_at: post.published_at.filter(is_truthy),
            content_markdown,
            thumbnail_url: thumbnail_url.filter(|url| !url.is_empty()),
        }
    }
}

/// Truthiness of a loosely typed field: empty strings, `false`, zero, and
/// null count as absent. Sequences and mappings are always present.
fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Human-readable message from an error response body.
///
/// Looks at `message`, `error`, and `detail` string fields in that order and
/// falls back to the whole body.
pub fn error_message(body: &JsonValue) -> String {
    if let Some(obj) = body.as_object() {
        for key in ["message", "error", "detail"] {
            if let Some(JsonValue::String(message)) = obj.get(key) {
                return message.clone();
            }
        }
    }
    match body {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::frontmatter;

    fn fm(yaml: &str) -> Frontmatter {
        frontmatter::parse(&format!("---\n{}\n---\n", yaml))
            .unwrap()
            .frontmatter
            .unwrap()
    }

    const COMPLETE: &str = "slug: my-post\ntitle: My Post\ndescription: About things\nauthor: Ada\npublished: true";

    #[test]
    fn complete_frontmatter_has_nothing_missing() {
        assert!(missing_required_fields(&fm(COMPLETE)).is_empty());
    }

    #[test]
    fn reports_missing_and_null_fields_in_order() {
        let missing = missing_required_fields(&fm("slug: x\ntitle: ~\nauthor: Ada"));
        assert_eq!(missing, vec!["title", "description", "published"]);
    }

    #[test]
    fn false_published_counts_as_present() {
        let fields = fm("slug: x\ntitle: t\ndescription: d\nauthor: a\npublished: false");
        assert!(missing_required_fields(&fields).is_empty());
    }

    #[test]
    fn payload_omits_absent_optionals() {
        let post = PostFrontmatter::from_frontmatter(&fm(COMPLETE)).unwrap();
        let payload = PostPayload::new(post, "Body".into(), None);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "slug": "my-post",
                "title": "My Post",
                "description": "About things",
                "author": "Ada",
                "published": true,
                "content_markdown": "Body",
            })
        );
    }

    #[test]
    fn payload_includes_present_optionals() {
        let yaml = format!("{}\ntags:\n  - rust\n  - cms\npublished_at: '2024-05-01T10:00:00Z'", COMPLETE);
        let post = PostFrontmatter::from_frontmatter(&fm(&yaml)).unwrap();
        let payload = PostPayload::new(post, "Body".into(), Some("https://cdn/x.png".into()));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["tags"], json!(["rust", "cms"]));
        assert_eq!(value["published_at"], json!("2024-05-01T10:00:00Z"));
        assert_eq!(value["thumbnail_url"], json!("https://cdn/x.png"));
    }

    #[test]
    fn empty_published_at_is_dropped() {
        let yaml = format!("{}\npublished_at: ''", COMPLETE);
        let post = PostFrontmatter::from_frontmatter(&fm(&yaml)).unwrap();
        let payload = PostPayload::new(post, String::new(), None);
        assert!(payload.published_at.is_none());
    }

    #[test]
    fn numeric_slug_is_stringified() {
        let yaml = COMPLETE.replace("slug: my-post", "slug: 2024");
        let post = PostFrontmatter::from_frontmatter(&fm(&yaml)).unwrap();
        assert_eq!(post.slug, "2024");
    }

    #[test]
    fn error_message_prefers_known_fields() {
        assert_eq!(error_message(&json!({"message": "bad", "error": "worse"})), "bad");
        assert_eq!(error_message(&json!({"error": "db down"})), "db down");
        assert_eq!(error_message(&json!({"detail": "nope"})), "nope");
        assert_eq!(error_message(&json!({"code": 7})), r#"{"code":7}"#);
        assert_eq!(error_message(&json!("plain text")), "plain text");
        assert_eq!(error_message(&JsonValue::Null), "null");
    }

    #[test]
    fn non_string_message_falls_through() {
        assert_eq!(error_message(&json!({"message": 5, "detail": "d"})), "d");
    }
}
