//! Capabilities vaultpress needs from the note-taking host.
//!
//! The publisher, image transform, and metadata sync never touch the
//! filesystem, a secret store, or a UI directly. They go through the narrow
//! traits in this module, so the same pipeline runs against the native
//! [`FsVault`](crate::vault::FsVault) and against the in-memory doubles used
//! in tests.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_yaml::Value;

use crate::error::Result;

/// Parsed frontmatter, in the order the keys appear in the document.
pub type Frontmatter = IndexMap<String, Value>;

/// A markdown document inside the vault, addressed by its vault-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRef {
    path: PathBuf,
}

impl DocumentRef {
    /// Create a reference from a vault-relative path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Vault-relative path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the document is a markdown file (`.md`).
    pub fn is_markdown(&self) -> bool {
        self.path.extension().is_some_and(|ext| ext == "md")
    }

    /// File name without extension, used in user-facing messages.
    pub fn basename(&self) -> String {
        file_stem(&self.path)
    }
}

/// A file a link or embed resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VaultFile {
    path: PathBuf,
}

impl VaultFile {
    /// Create a reference from a vault-relative path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Vault-relative path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extension as written on disk (not lowercased). Empty when absent.
    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
    }

    /// File name without extension.
    pub fn basename(&self) -> String {
        file_stem(&self.path)
    }

    /// Full file name including extension.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// An embed (`![[target|display]]`) found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRef {
    /// Link target with any `#heading` or `^block` suffix removed
    pub link: String,
    /// Display text given after `|`, if any
    pub display_text: Option<String>,
    /// The embed exactly as written in the document
    pub original: String,
    /// Byte offset of `original` in the full document (frontmatter included)
    pub offset: usize,
}

/// Read and write access to document contents.
pub trait DocumentStore {
    /// Read a document as text.
    fn read_to_string(&self, doc: &DocumentRef) -> Result<String>;

    /// Read the raw bytes of a vault file.
    fn read_binary(&self, file: &VaultFile) -> Result<Vec<u8>>;

    /// Edit the document's frontmatter in place, leaving the body untouched.
    ///
    /// A document without frontmatter gets a new block.
    fn update_frontmatter(
        &self,
        doc: &DocumentRef,
        edit: &mut dyn FnMut(&mut Frontmatter),
    ) -> Result<()>;
}

/// The host's parsed view of documents: frontmatter, embeds, link targets.
pub trait MetadataIndex {
    /// Parsed frontmatter, or `None` when the document has none.
    fn frontmatter(&self, doc: &DocumentRef) -> Result<Option<Frontmatter>>;

    /// Embeds in the order the index reports them.
    fn embeds(&self, doc: &DocumentRef) -> Result<Vec<EmbedRef>>;

    /// Resolve a link written in `from` to a file, if it exists.
    fn resolve_link(&self, link: &str, from: &DocumentRef) -> Option<VaultFile>;
}

/// Looks up secret values by id.
pub trait SecretResolver {
    /// The secret stored under `id`, if any.
    fn get_secret(&self, id: &str) -> Option<String>;
}

/// Shows short transient messages to the user.
pub trait Notifier {
    /// Display a message.
    fn notify(&self, message: &str);
}

/// Bundle of host capabilities handed to the pipelines.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    /// Document contents
    pub store: &'a dyn DocumentStore,
    /// Frontmatter, embeds, and link resolution
    pub index: &'a dyn MetadataIndex,
    /// Secret lookup for the API key
    pub secrets: &'a dyn SecretResolver,
    /// User-visible notices
    pub notifier: &'a dyn Notifier,
}

impl<'a> Host<'a> {
    /// Build a host from a vault that serves as both store and index.
    pub fn new<V>(vault: &'a V, secrets: &'a dyn SecretResolver, notifier: &'a dyn Notifier) -> Self
    where
        V: DocumentStore + MetadataIndex,
    {
        Self {
            store: vault,
            index: vault,
            secrets,
            notifier,
        }
    }

    pub(crate) fn notify(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        log::debug!("notice: {}", message);
        self.notifier.notify(message);
    }
}
