//! A vault backed by a directory on disk.
//!
//! [`FsVault`] is the native implementation of [`DocumentStore`] and
//! [`MetadataIndex`]. Documents and files are addressed by paths relative to
//! the vault root; nothing outside the root can be read or written.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::{DirEntry, WalkDir};

use crate::error::{Result, VaultpressError};
use crate::frontmatter;
use crate::host::{DocumentRef, DocumentStore, EmbedRef, Frontmatter, MetadataIndex, VaultFile};

/// Directory marking the root of an Obsidian vault.
pub const VAULT_MARKER: &str = ".obsidian";

static EMBED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\[\]\n]+)\]\]").expect("embed pattern is valid"));

// `|300` or `|300x200` sizes an image; it is not display text.
static IMAGE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(x\d+)?$").expect("size pattern is valid"));

/// Directory-backed vault.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    /// Open the vault rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The vault root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the vault containing `file`: the nearest ancestor holding a
    /// `.obsidian` directory, else the file's own directory.
    pub fn discover(file: &Path) -> Result<Self> {
        let file = absolute(file)?;
        let start = file.parent().unwrap_or(file.as_path());
        let root = start
            .ancestors()
            .find(|dir| dir.join(VAULT_MARKER).is_dir())
            .unwrap_or(start);
        log::debug!("vault root for {}: {}", file.display(), root.display());
        Ok(Self::new(root))
    }

    /// Reference to the document at `path` (absolute or relative to the
    /// current directory).
    pub fn document_for(&self, path: &Path) -> Result<DocumentRef> {
        let path = absolute(path)?;
        let root = absolute(&self.root)?;
        let relative = path
            .strip_prefix(&root)
            .map_err(|_| VaultpressError::OutsideVault(path.clone()))?;
        let relative =
            normalize(relative).ok_or_else(|| VaultpressError::OutsideVault(path.clone()))?;
        Ok(DocumentRef::new(relative))
    }

    fn full_path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }

    fn read_text(&self, relative: &Path) -> Result<String> {
        let path = self.full_path(relative);
        fs::read_to_string(&path).map_err(|source| VaultpressError::FileRead { path, source })
    }

    fn existing_file(&self, relative: PathBuf) -> Option<VaultFile> {
        self.full_path(&relative)
            .is_file()
            .then(|| VaultFile::new(relative))
    }

    fn find_by_name(&self, name: &str) -> Option<VaultFile> {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .find(|entry| entry.file_name().to_str() == Some(name))
            .and_then(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|relative| VaultFile::new(relative.to_path_buf()))
            })
    }
}

impl DocumentStore for FsVault {
    fn read_to_string(&self, doc: &DocumentRef) -> Result<String> {
        self.read_text(doc.path())
    }

    fn read_binary(&self, file: &VaultFile) -> Result<Vec<u8>> {
        let path = self.full_path(file.path());
        fs::read(&path).map_err(|source| VaultpressError::FileRead { path, source })
    }

    fn update_frontmatter(
        &self,
        doc: &DocumentRef,
        edit: &mut dyn FnMut(&mut Frontmatter),
    ) -> Result<()> {
        let content = self.read_text(doc.path())?;
        let parsed = frontmatter::parse(&content)?;
        let mut fields = parsed.frontmatter.unwrap_or_default();
        edit(&mut fields);
        let updated = frontmatter::serialize(&fields, &parsed.body)?;
        if updated == content {
            return Ok(());
        }
        write_replacing(&self.full_path(doc.path()), &updated)
    }
}

impl MetadataIndex for FsVault {
    fn frontmatter(&self, doc: &DocumentRef) -> Result<Option<Frontmatter>> {
        let content = self.read_text(doc.path())?;
        match frontmatter::parse(&content) {
            Ok(parsed) => Ok(parsed.frontmatter),
            Err(e) => {
                log::warn!("ignoring frontmatter of {}: {}", doc.path().display(), e);
                Ok(None)
            }
        }
    }

    fn embeds(&self, doc: &DocumentRef) -> Result<Vec<EmbedRef>> {
        Ok(scan_embeds(&self.read_text(doc.path())?))
    }

    fn resolve_link(&self, link: &str, from: &DocumentRef) -> Option<VaultFile> {
        let link = link.trim();
        if link.is_empty() {
            return None;
        }

        let mut candidates = vec![PathBuf::from(link)];
        if Path::new(link).extension().is_none() {
            candidates.push(PathBuf::from(format!("{}.md", link)));
        }

        let from_dir = from.path().parent().unwrap_or(Path::new(""));
        for candidate in &candidates {
            let in_root = normalize(candidate).and_then(|p| self.existing_file(p));
            let beside = || normalize(&from_dir.join(candidate)).and_then(|p| self.existing_file(p));
            if let Some(file) = in_root.or_else(beside) {
                return Some(file);
            }
        }

        candidates
            .iter()
            .filter_map(|candidate| candidate.file_name()?.to_str())
            .find_map(|name| self.find_by_name(name))
    }
}

/// Embeds in the body of `content`, in document order, skipping fenced code
/// blocks. Frontmatter values are not embeds. Offsets are against the full
/// document.
pub fn scan_embeds(content: &str) -> Vec<EmbedRef> {
    let body_start = frontmatter::body_start(content);
    let fences = fenced_ranges(content);
    EMBED
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if whole.start() < body_start || in_fence(&fences, whole.start()) {
                return None;
            }
            let inner = caps.get(1)?.as_str();
            let (target, display) = match inner.split_once('|') {
                Some((target, display)) => (target, Some(display.trim())),
                None => (inner, None),
            };
            let link = match target.find(['#', '^']) {
                Some(idx) => &target[..idx],
                None => target,
            }
            .trim();
            if link.is_empty() {
                return None;
            }
            let display_text = display
                .filter(|text| !text.is_empty() && !IMAGE_SIZE.is_match(text))
                .map(str::to_string);
            Some(EmbedRef {
                link: link.to_string(),
                display_text,
                original: whole.as_str().to_string(),
                offset: whole.start(),
            })
        })
        .collect()
}

/// Byte ranges covered by ``` or ~~~ fenced blocks. An unclosed fence runs
/// to the end of the document.
pub(crate) fn fenced_ranges(content: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut open: Option<(usize, &str)> = None;
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let fence = ["```", "~~~"]
            .into_iter()
            .find(|marker| trimmed.starts_with(marker));
        match (open, fence) {
            (None, Some(marker)) => open = Some((offset, marker)),
            (Some((start, marker)), Some(closing)) if closing == marker => {
                ranges.push((start, offset + line.len()));
                open = None;
            }
            _ => {}
        }
        offset += line.len();
    }

    if let Some((start, _)) = open {
        ranges.push((start, content.len()));
    }
    ranges
}

pub(crate) fn in_fence(fences: &[(usize, usize)], offset: usize) -> bool {
    fences.iter().any(|(start, end)| (*start..*end).contains(&offset))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|source| VaultpressError::FileRead {
            path: path.to_path_buf(),
            source,
        })
}

/// Resolve `.` and `..` lexically. `None` if the path climbs above its start.
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}

fn temp_path_for(path: &Path) -> PathBuf {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => path.with_file_name(format!(".{}.tmp", name)),
        None => path.with_extension("tmp"),
    }
}

/// Write `content` next to `path` and rename it over the original.
fn write_replacing(path: &Path, content: &str) -> Result<()> {
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, content).map_err(|source| VaultpressError::FileWrite {
        path: temp_path.clone(),
        source,
    })?;
    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(VaultpressError::FileWrite {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
