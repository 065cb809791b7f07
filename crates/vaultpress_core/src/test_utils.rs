//! Test utilities for vaultpress_core
//!
//! In-memory doubles for every host capability and for the CMS, so the
//! pipelines can be exercised without a filesystem or a network.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use crate::api::{ApiResponse, CmsApi, MediaPurpose, MediaUploadResponse, PostRecord};
use crate::error::{Result, VaultpressError};
use crate::frontmatter;
use crate::host::{
    DocumentRef, DocumentStore, EmbedRef, Frontmatter, MetadataIndex, Notifier, SecretResolver,
    VaultFile,
};
use crate::post::PostPayload;
use crate::vault::scan_embeds;

/// An in-memory vault.
///
/// Uses `Arc<Mutex<..>>` so clones share the same files. Embeds are scanned
/// from document text unless overridden with [`MockVault::with_embeds`].
#[derive(Clone, Default)]
pub struct MockVault {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
    unreadable: Arc<Mutex<HashSet<PathBuf>>>,
    embeds: Arc<Mutex<HashMap<PathBuf, Vec<EmbedRef>>>>,
}

impl MockVault {
    /// Create an empty vault.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text document (builder pattern).
    pub fn with_document(self, path: &str, content: &str) -> Self {
        self.with_file(path, content.as_bytes())
    }

    /// Add a file with arbitrary bytes (builder pattern).
    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), bytes.to_vec());
        self
    }

    /// Add a file that links resolve to but that fails to read.
    pub fn with_unreadable_file(self, path: &str) -> Self {
        self.unreadable.lock().unwrap().insert(PathBuf::from(path));
        self
    }

    /// Report `embeds` for `path` instead of scanning its text.
    pub fn with_embeds(self, path: &str, embeds: Vec<EmbedRef>) -> Self {
        self.embeds
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), embeds);
        self
    }

    /// Current text of a document (for test assertions).
    pub fn document(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(Path::new(path))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// Current frontmatter of a document (for test assertions).
    pub fn frontmatter_of(&self, path: &str) -> Option<Frontmatter> {
        frontmatter::parse(&self.document(path)?).ok()?.frontmatter
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        if self.unreadable.lock().unwrap().contains(path) {
            return Err(VaultpressError::FileRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"),
            });
        }
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| VaultpressError::FileRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "File not found"),
            })
    }

    fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.lock().unwrap().keys().cloned().collect();
        paths.extend(self.unreadable.lock().unwrap().iter().cloned());
        paths.sort();
        paths
    }
}

impl DocumentStore for MockVault {
    fn read_to_string(&self, doc: &DocumentRef) -> Result<String> {
        let bytes = self.read(doc.path())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_binary(&self, file: &VaultFile) -> Result<Vec<u8>> {
        self.read(file.path())
    }

    fn update_frontmatter(
        &self,
        doc: &DocumentRef,
        edit: &mut dyn FnMut(&mut Frontmatter),
    ) -> Result<()> {
        let content = self.read_to_string(doc)?;
        let parsed = frontmatter::parse(&content)?;
        let mut fields = parsed.frontmatter.unwrap_or_default();
        edit(&mut fields);
        let updated = frontmatter::serialize(&fields, &parsed.body)?;
        self.files
            .lock()
            .unwrap()
            .insert(doc.path().to_path_buf(), updated.into_bytes());
        Ok(())
    }
}

impl MetadataIndex for MockVault {
    fn frontmatter(&self, doc: &DocumentRef) -> Result<Option<Frontmatter>> {
        Ok(frontmatter::parse(&self.read_to_string(doc)?)?.frontmatter)
    }

    fn embeds(&self, doc: &DocumentRef) -> Result<Vec<EmbedRef>> {
        if let Some(embeds) = self.embeds.lock().unwrap().get(doc.path()) {
            return Ok(embeds.clone());
        }
        Ok(scan_embeds(&self.read_to_string(doc)?))
    }

    /// Exact path, then beside `from`, then the first file with that name.
    fn resolve_link(&self, link: &str, from: &DocumentRef) -> Option<VaultFile> {
        let mut names = vec![link.to_string()];
        if Path::new(link).extension().is_none() {
            names.push(format!("{}.md", link));
        }
        let paths = self.paths();
        let from_dir = from.path().parent().unwrap_or(Path::new(""));

        for name in &names {
            for candidate in [PathBuf::from(name), from_dir.join(name)] {
                if paths.contains(&candidate) {
                    return Some(VaultFile::new(candidate));
                }
            }
        }
        names.iter().find_map(|name| {
            paths
                .iter()
                .find(|path| path.file_name().and_then(|n| n.to_str()) == Some(name.as_str()))
                .map(|path| VaultFile::new(path.clone()))
        })
    }
}

/// A call recorded by [`MockCmsApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// `POST /media`
    UploadMedia(MediaPurpose),
    /// `GET /posts/{slug}`
    GetPost(String),
    /// `POST /posts`
    CreatePost(PostPayload),
    /// `PUT /posts/{slug}`
    UpdatePost(String, PostPayload),
}

#[derive(Default)]
struct CmsState {
    calls: Vec<ApiCall>,
    data_urls: Vec<String>,
    uploads: usize,
    failing_uploads: HashSet<usize>,
    posts: HashMap<String, PostRecord>,
    get_failure: Option<u16>,
    update_responses: VecDeque<ApiResponse>,
    create_responses: VecDeque<ApiResponse>,
    update_unreachable: bool,
}

/// A scripted CMS that records every call.
///
/// Uploads succeed with `https://cdn.test/media/{n}`, `n` counting every
/// upload attempt from 1. Updates answer 200 and creates 201 unless
/// responses were queued.
#[derive(Clone, Default)]
pub struct MockCmsApi {
    state: Arc<Mutex<CmsState>>,
}

impl MockCmsApi {
    /// A CMS with no posts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `post` (a JSON object) for `slug`.
    pub fn with_post(self, slug: &str, post: Value) -> Self {
        let Value::Object(record) = post else {
            panic!("post must be a JSON object");
        };
        self.state
            .lock()
            .unwrap()
            .posts
            .insert(slug.to_string(), record);
        self
    }

    /// Make the `n`th upload attempt (1-based) fail.
    pub fn failing_upload(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_uploads.insert(n);
        self
    }

    /// Answer every `get_post` with `status`.
    pub fn failing_get(self, status: u16) -> Self {
        self.state.lock().unwrap().get_failure = Some(status);
        self
    }

    /// Queue the response of the next `update_post`.
    pub fn with_update_response(self, response: ApiResponse) -> Self {
        self.state
            .lock()
            .unwrap()
            .update_responses
            .push_back(response);
        self
    }

    /// Queue the response of the next `create_post`.
    pub fn with_create_response(self, response: ApiResponse) -> Self {
        self.state
            .lock()
            .unwrap()
            .create_responses
            .push_back(response);
        self
    }

    /// Make `update_post` fail at the transport level.
    pub fn failing_update(self) -> Self {
        self.state.lock().unwrap().update_unreachable = true;
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Purposes of every upload attempt, in order.
    pub fn upload_purposes(&self) -> Vec<MediaPurpose> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::UploadMedia(purpose) => Some(purpose),
                _ => None,
            })
            .collect()
    }

    /// Data URLs of every upload attempt, in order.
    pub fn uploaded_data_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().data_urls.clone()
    }
}

impl CmsApi for MockCmsApi {
    fn upload_media(&self, data_url: &str, purpose: MediaPurpose) -> Result<MediaUploadResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::UploadMedia(purpose));
        state.data_urls.push(data_url.to_string());
        state.uploads += 1;
        let n = state.uploads;
        if state.failing_uploads.contains(&n) {
            return Err(VaultpressError::HttpStatus {
                operation: "Media upload",
                status: 500,
            });
        }
        Ok(MediaUploadResponse {
            url: format!("https://cdn.test/media/{}", n),
        })
    }

    fn get_post(&self, slug: &str) -> Result<Option<PostRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::GetPost(slug.to_string()));
        if let Some(status) = state.get_failure {
            return Err(VaultpressError::HttpStatus {
                operation: "Fetch post",
                status,
            });
        }
        Ok(state.posts.get(slug).cloned())
    }

    fn create_post(&self, payload: &PostPayload) -> Result<ApiResponse> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(ApiCall::CreatePost(payload.clone()));
        Ok(state.create_responses.pop_front().unwrap_or(ApiResponse {
            status: 201,
            body: json!({"slug": payload.slug}),
        }))
    }

    fn update_post(&self, slug: &str, payload: &PostPayload) -> Result<ApiResponse> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(ApiCall::UpdatePost(slug.to_string(), payload.clone()));
        if state.update_unreachable {
            return Err(VaultpressError::Http(ureq::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "Connection refused",
            ))));
        }
        Ok(state.update_responses.pop_front().unwrap_or(ApiResponse {
            status: 200,
            body: json!({"slug": slug}),
        }))
    }
}

/// A notifier that remembers every message.
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Create a notifier with no messages.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages received so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Fixed secrets.
#[derive(Debug, Clone, Default)]
pub struct StaticSecrets {
    secrets: HashMap<String, String>,
}

impl StaticSecrets {
    /// No secrets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret (builder pattern).
    pub fn with(mut self, id: &str, value: &str) -> Self {
        self.secrets.insert(id.to_string(), value.to_string());
        self
    }
}

impl SecretResolver for StaticSecrets {
    fn get_secret(&self, id: &str) -> Option<String> {
        self.secrets.get(id).cloned()
    }
}
