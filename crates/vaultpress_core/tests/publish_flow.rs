mod common;

use std::fs;
use std::time::Duration;

use common::MockCms;
use serde_json::json;
use vaultpress_core::api::HttpCmsApi;
use vaultpress_core::test_utils::{RecordingNotifier, StaticSecrets};
use vaultpress_core::vault::FsVault;
use vaultpress_core::{
    DocumentRef, Host, PublishOutcome, Publisher, Settings, SyncOutcome, sync_metadata_on_open,
};

fn secrets() -> StaticSecrets {
    StaticSecrets::new().with("cms", "test-key")
}

const POST: &str = "---\nslug: field-notes\ntitle: Field Notes\ndescription: Notes from the field\nauthor: Ada\npublished: true\n---\n# Field Notes\n\n![[photo.jpg|A photo]]\n\n```\n![[not-an-embed.png]]\n```\n";

fn settings(cms: &MockCms) -> Settings {
    Settings {
        cms_url: format!("{}/", cms.base_url),
        api_key_secret_id: "cms".into(),
        ..Settings::default()
    }
}

fn connect(creds: &vaultpress_core::Credentials) -> HttpCmsApi {
    HttpCmsApi::with_proxy(creds, Duration::from_secs(5), None)
}

#[test]
fn publishes_new_post_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("attachments")).unwrap();
    fs::write(dir.path().join("post.md"), POST).unwrap();
    fs::write(dir.path().join("attachments/photo.jpg"), b"JPEG").unwrap();

    let cms = MockCms::start(vec![
        (200, r#"{"url":"https://cdn.example/photo.jpg"}"#),
        (404, r#"{"error":"not found"}"#),
        (201, r#"{"slug":"field-notes"}"#),
    ]);

    let vault = FsVault::new(dir.path());
    let secrets = secrets();
    let notices = RecordingNotifier::new();
    let host = Host::new(&vault, &secrets, &notices);
    let doc = DocumentRef::new("post.md");

    let outcome = Publisher::new(host).publish_post(Some(&doc), &settings(&cms), connect);

    assert_eq!(outcome, PublishOutcome::Created);
    assert_eq!(notices.messages(), vec!["Post published successfully".to_string()]);

    let requests = cms.finish();
    let routes: Vec<_> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url))
        .collect();
    assert_eq!(routes, vec!["POST /media", "PUT /posts/field-notes", "POST /posts"]);

    assert_eq!(
        requests[0].json(),
        json!({"image_base64": "data:image/jpeg;base64,SlBFRw==", "purpose": "thumbnail"})
    );
    let created = requests[2].json();
    assert_eq!(requests[1].json(), created);
    assert_eq!(
        created["content_markdown"],
        json!("# Field Notes\n\n![A photo](https://cdn.example/photo.jpg)\n\n```\n![[not-an-embed.png]]\n```\n")
    );
    assert_eq!(created["thumbnail_url"], json!("https://cdn.example/photo.jpg"));

    assert_eq!(fs::read_to_string(dir.path().join("post.md")).unwrap(), POST);
}

#[test]
fn opening_a_note_pulls_remote_metadata() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("post.md"), POST).unwrap();

    let cms = MockCms::start(vec![(
        200,
        r#"{"slug":"field-notes","title":"Renamed","tags":["travel"],"content_markdown":"ignored"}"#,
    )]);

    let vault = FsVault::new(dir.path());
    let secrets = secrets();
    let notices = RecordingNotifier::new();
    let host = Host::new(&vault, &secrets, &notices);

    let outcome = sync_metadata_on_open(&host, &DocumentRef::new("post.md"), &settings(&cms), connect);

    assert_eq!(outcome, SyncOutcome::Updated(vec!["title".into(), "tags".into()]));
    assert!(notices.messages().is_empty());
    assert_eq!(cms.finish()[0].url, "/posts/field-notes");

    let written = fs::read_to_string(dir.path().join("post.md")).unwrap();
    assert!(written.contains("title: Renamed\n"));
    assert!(written.contains("slug: field-notes\n"));
    assert!(written.contains("- travel\n"));
    assert!(written.ends_with(
        "---\n# Field Notes\n\n![[photo.jpg|A photo]]\n\n```\n![[not-an-embed.png]]\n```\n"
    ));
}

#[test]
fn frontmatter_embed_is_not_uploaded_as_thumbnail() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("hero.png"), b"PNG").unwrap();
    fs::write(
        dir.path().join("post.md"),
        "---\nslug: cover-test\ntitle: Cover\ndescription: d\nauthor: Ada\npublished: false\ncover: \"![[hero.png]]\"\n---\n![inline](https://img.example/first.jpg)\n",
    )
    .unwrap();

    let cms = MockCms::start(vec![(200, r#"{"slug":"cover-test"}"#)]);

    let vault = FsVault::new(dir.path());
    let secrets = secrets();
    let notices = RecordingNotifier::new();
    let host = Host::new(&vault, &secrets, &notices);
    let doc = DocumentRef::new("post.md");

    let outcome = Publisher::new(host).publish_post(Some(&doc), &settings(&cms), connect);

    assert_eq!(outcome, PublishOutcome::Updated);
    let requests = cms.finish();
    let routes: Vec<_> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url))
        .collect();
    assert_eq!(routes, vec!["PUT /posts/cover-test"]);
    let sent = requests[0].json();
    assert_eq!(sent["thumbnail_url"], json!("https://img.example/first.jpg"));
    assert_eq!(
        sent["content_markdown"],
        json!("![inline](https://img.example/first.jpg)\n")
    );
}
