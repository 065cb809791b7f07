//! Pull post metadata from the CMS into a document's frontmatter.
//!
//! Runs when a document is opened. Only the fields in [`SYNCED_FIELDS`] are
//! written; `slug` and the body are never touched.

use crate::api::{CmsApi, PostRecord};
use crate::config::{Credentials, Settings};
use crate::error::Result;
use crate::frontmatter::scalar_to_string;
use crate::host::{DocumentRef, Host};

/// Fields copied from the remote post into local frontmatter.
pub const SYNCED_FIELDS: [&str; 6] = [
    "title",
    "description",
    "author",
    "tags",
    "published",
    "published_at",
];

/// What a sync attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Preconditions not met (not markdown, not configured, or no slug)
    Skipped,
    /// The CMS has no post with this slug
    NotFound,
    /// Frontmatter was updated with these fields
    Updated(Vec<String>),
    /// Fetching or writing failed; a notice was emitted
    Failed(String),
}

/// Sync the synced fields of `doc` from the CMS.
///
/// `connect` builds the API client from resolved credentials and is only
/// called once every precondition holds.
pub fn sync_metadata_on_open<A, F>(
    host: &Host<'_>,
    doc: &DocumentRef,
    settings: &Settings,
    connect: F,
) -> SyncOutcome
where
    A: CmsApi,
    F: FnOnce(&Credentials) -> A,
{
    if !doc.is_markdown() {
        return SyncOutcome::Skipped;
    }
    let Some(credentials) = settings.credentials(host.secrets) else {
        log::debug!("sync skipped: CMS not configured");
        return SyncOutcome::Skipped;
    };
    let Some(slug) = slug_of(host, doc) else {
        log::debug!("sync skipped: {} has no slug", doc.path().display());
        return SyncOutcome::Skipped;
    };

    let api = connect(&credentials);
    match fetch_and_merge(host, doc, &slug, &api) {
        Ok(Some(fields)) => {
            log::debug!("synced {:?} into {}", fields, doc.path().display());
            SyncOutcome::Updated(fields)
        }
        Ok(None) => SyncOutcome::NotFound,
        Err(e) => {
            log::warn!("metadata sync for {} failed: {}", doc.path().display(), e);
            host.notify(format!(
                "Failed to sync metadata for \"{}\": {}",
                doc.basename(),
                e
            ));
            SyncOutcome::Failed(e.to_string())
        }
    }
}

fn slug_of(host: &Host<'_>, doc: &DocumentRef) -> Option<String> {
    let frontmatter = match host.index.frontmatter(doc) {
        Ok(frontmatter) => frontmatter?,
        Err(e) => {
            log::warn!("could not read frontmatter of {}: {}", doc.path().display(), e);
            return None;
        }
    };
    frontmatter
        .get("slug")
        .and_then(scalar_to_string)
        .filter(|slug| !slug.is_empty())
}

fn fetch_and_merge<A: CmsApi>(
    host: &Host<'_>,
    doc: &DocumentRef,
    slug: &str,
    api: &A,
) -> Result<Option<Vec<String>>> {
    let Some(post) = api.get_post(slug)? else {
        return Ok(None);
    };

    let updates = synced_values(&post)?;
    let fields: Vec<String> = updates.iter().map(|(field, _)| field.to_string()).collect();

    host.store.update_frontmatter(doc, &mut |frontmatter| {
        for (field, value) in &updates {
            frontmatter.insert(field.to_string(), value.clone());
        }
    })?;

    Ok(Some(fields))
}

fn synced_values(post: &PostRecord) -> Result<Vec<(&'static str, serde_yaml::Value)>> {
    let mut values = Vec::new();
    for field in SYNCED_FIELDS {
        if let Some(value) = post.get(field) {
            values.push((field, serde_yaml::to_value(value)?));
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use serde_yaml::Value;

    use super::*;
    use crate::test_utils::{ApiCall, MockCmsApi, MockVault, RecordingNotifier, StaticSecrets};

    fn settings() -> Settings {
        Settings {
            cms_url: "https://cms.test".into(),
            api_key_secret_id: "cms".into(),
            ..Settings::default()
        }
    }

    fn secrets() -> StaticSecrets {
        StaticSecrets::new().with("cms", "key")
    }

    const DOC: &str = "---\nslug: hello\ntitle: Old\nextra: keep\n---\nBody stays.\n";

    #[test]
    fn merges_only_fields_present_remotely() {
        let vault = MockVault::new().with_document("hello.md", DOC);
        let api = MockCmsApi::new().with_post(
            "hello",
            json!({"slug": "other", "title": "New", "tags": ["a", "b"], "views": 10, "content_markdown": "remote"}),
        );
        let secrets = secrets();
        let notifier = RecordingNotifier::new();
        let host = Host::new(&vault, &secrets, &notifier);

        let outcome = sync_metadata_on_open(&host, &DocumentRef::new("hello.md"), &settings(), |_| &api);

        assert_eq!(outcome, SyncOutcome::Updated(vec!["title".into(), "tags".into()]));
        let fm = vault.frontmatter_of("hello.md").unwrap();
        assert_eq!(fm["slug"], Value::String("hello".into()));
        assert_eq!(fm["title"], Value::String("New".into()));
        assert_eq!(fm["extra"], Value::String("keep".into()));
        assert!(fm.get("views").is_none());
        assert_eq!(
            fm["tags"],
            Value::Sequence(vec![Value::String("a".into()), Value::String("b".into())])
        );
        assert!(vault.document("hello.md").unwrap().ends_with("---\nBody stays.\n"));
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn remote_null_is_written() {
        let vault = MockVault::new().with_document("hello.md", DOC);
        let api = MockCmsApi::new().with_post("hello", json!({"published_at": null}));
        let secrets = secrets();
        let notifier = RecordingNotifier::new();
        let host = Host::new(&vault, &secrets, &notifier);

        sync_metadata_on_open(&host, &DocumentRef::new("hello.md"), &settings(), |_| &api);

        let fm = vault.frontmatter_of("hello.md").unwrap();
        assert_eq!(fm.get("published_at"), Some(&Value::Null));
    }

    #[test]
    fn missing_remote_post_is_a_no_op() {
        let vault = MockVault::new().with_document("hello.md", DOC);
        let api = MockCmsApi::new();
        let secrets = secrets();
        let notifier = RecordingNotifier::new();
        let host = Host::new(&vault, &secrets, &notifier);

        let outcome = sync_metadata_on_open(&host, &DocumentRef::new("hello.md"), &settings(), |_| &api);

        assert_eq!(outcome, SyncOutcome::NotFound);
        assert_eq!(vault.document("hello.md").unwrap(), DOC);
        assert_eq!(api.calls(), vec![ApiCall::GetPost("hello".into())]);
    }

    #[test]
    fn silent_when_preconditions_fail() {
        let vault = MockVault::new()
            .with_document("hello.md", DOC)
            .with_document("noslug.md", "---\ntitle: x\n---\n")
            .with_document("plain.txt", DOC);
        let api = MockCmsApi::new().with_post("hello", json!({"title": "New"}));
        let secrets = secrets();
        let notifier = RecordingNotifier::new();
        let host = Host::new(&vault, &secrets, &notifier);

        let cases = [
            (DocumentRef::new("plain.txt"), settings()),
            (DocumentRef::new("noslug.md"), settings()),
            (DocumentRef::new("hello.md"), Settings::default()),
            (
                DocumentRef::new("hello.md"),
                Settings {
                    api_key_secret_id: "unknown".into(),
                    ..settings()
                },
            ),
        ];
        for (doc, settings) in cases {
            let outcome = sync_metadata_on_open(&host, &doc, &settings, |_| &api);
            assert_eq!(outcome, SyncOutcome::Skipped);
        }

        assert!(api.calls().is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[test]
    fn fetch_failure_warns_with_file_name() {
        let vault = MockVault::new().with_document("notes/hello.md", DOC);
        let api = MockCmsApi::new().failing_get(503);
        let secrets = secrets();
        let notifier = RecordingNotifier::new();
        let host = Host::new(&vault, &secrets, &notifier);

        let outcome = sync_metadata_on_open(
            &host,
            &DocumentRef::new("notes/hello.md"),
            &settings(),
            |_| &api,
        );

        assert!(matches!(outcome, SyncOutcome::Failed(_)));
        assert_eq!(
            notifier.messages(),
            vec!["Failed to sync metadata for \"hello\": Fetch post failed with status 503".to_string()]
        );
        assert_eq!(vault.document("notes/hello.md").unwrap(), DOC);
    }

    #[test]
    fn connect_receives_resolved_credentials() {
        let vault = MockVault::new().with_document("hello.md", DOC);
        let api = MockCmsApi::new();
        let secrets = secrets();
        let notifier = RecordingNotifier::new();
        let host = Host::new(&vault, &secrets, &notifier);
        let settings = Settings {
            cms_url: "https://cms.test/".into(),
            ..settings()
        };

        let mut seen = None;
        sync_metadata_on_open(&host, &DocumentRef::new("hello.md"), &settings, |creds| {
            seen = Some(creds.clone());
            &api
        });

        let creds = seen.unwrap();
        assert_eq!(creds.base_url, "https://cms.test");
        assert_eq!(creds.api_key, "key");
    }
}
