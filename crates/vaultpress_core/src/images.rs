//! Image embed upload and markdown rewriting.
//!
//! Plain markdown images (`![alt](url)`) are left alone; the first one's URL
//! can serve as the thumbnail. Vault embeds that resolve to image files are
//! uploaded to the CMS and rewritten as plain markdown images pointing at the
//! hosted copy. The rewrite works on a copy of the content: the document on
//! disk is never modified.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;

use crate::api::{CmsApi, MediaPurpose};
use crate::error::Result;
use crate::host::{DocumentRef, EmbedRef, Host, VaultFile};
use crate::vault::{fenced_ranges, in_fence};

/// File extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp"];

static MARKDOWN_IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("image pattern is valid"));

/// Rewritten content plus the chosen thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUploadResult {
    /// Markdown with uploaded embeds replaced by hosted image links
    pub content_markdown: String,
    /// URL of the first image in the document, if there is one
    pub thumbnail_url: Option<String>,
}

/// Whether `extension` names an image format.
pub fn is_image_extension(extension: &str) -> bool {
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| ext.eq_ignore_ascii_case(extension))
}

/// MIME type for an image extension; unknown extensions map to
/// `application/octet-stream`.
pub fn mime_type(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Encode bytes as a base64 `data:` URL.
pub fn data_url(bytes: &[u8], extension: &str) -> String {
    format!("data:{};base64,{}", mime_type(extension), BASE64.encode(bytes))
}

/// Offset and URL of the first plain markdown image in `content`, skipping
/// fenced code blocks the same way embed scanning does.
pub fn first_markdown_image(content: &str) -> Option<(usize, &str)> {
    let fences = fenced_ranges(content);
    MARKDOWN_IMAGE.captures_iter(content).find_map(|caps| {
        let whole = caps.get(0)?;
        if in_fence(&fences, whole.start()) {
            return None;
        }
        Some((whole.start(), caps.get(2)?.as_str()))
    })
}

/// Upload the image embeds of `doc` and rewrite them in `content`.
///
/// `content` is the document body with frontmatter removed and
/// `content_offset` is where that body starts in the full document, so
/// plain-image positions can be compared with embed positions (which the
/// index reports against the full document).
///
/// Unresolvable links and failed uploads produce a notice and leave the
/// embed as written. Only a failure to list the embeds is returned as an
/// error.
pub fn process_images<A: CmsApi>(
    host: &Host<'_>,
    doc: &DocumentRef,
    content: &str,
    content_offset: usize,
    api: &A,
) -> Result<ImageUploadResult> {
    let embeds = host.index.embeds(doc)?;
    log::debug!("{} embeds in {}", embeds.len(), doc.path().display());

    let mut thumbnail_url: Option<String> = None;
    let mut thumbnail_pending = true;

    // First-image detection scans by position, independently of the upload
    // loop below, which follows the index's enumeration order.
    let first_inline = first_markdown_image(content);
    let first_embed_offset = embeds
        .iter()
        .find(|embed| {
            host.index
                .resolve_link(&embed.link, doc)
                .is_some_and(|file| is_image_extension(file.extension()))
        })
        .map(|embed| embed.offset);

    if let Some((offset, url)) = first_inline {
        let inline_offset = content_offset + offset;
        if first_embed_offset.is_none_or(|embed_offset| inline_offset < embed_offset) {
            log::debug!("thumbnail from inline image {}", url);
            thumbnail_url = Some(url.to_string());
            thumbnail_pending = false;
        }
    }

    let mut replacements: Vec<(&str, String)> = Vec::new();

    for embed in &embeds {
        let Some(file) = host.index.resolve_link(&embed.link, doc) else {
            host.notify(format!(
                "Warning: Could not resolve embedded file \"{}\"",
                embed.link
            ));
            continue;
        };

        if !is_image_extension(file.extension()) {
            continue;
        }

        let purpose = if thumbnail_pending {
            MediaPurpose::Thumbnail
        } else {
            MediaPurpose::Post
        };
        thumbnail_pending = false;

        match upload_embed(host, api, &file, purpose) {
            Ok(hosted_url) => {
                if thumbnail_url.is_none() {
                    thumbnail_url = Some(hosted_url.clone());
                }
                replacements.push((embed.original.as_str(), image_link(embed, &file, &hosted_url)));
            }
            Err(e) => {
                log::warn!("upload of {} failed: {}", file.path().display(), e);
                host.notify(format!(
                    "Warning: Failed to upload image \"{}\": {}",
                    file.name(),
                    e
                ));
            }
        }
    }

    let mut content_markdown = content.to_string();
    for (original, replacement) in replacements {
        content_markdown = content_markdown.replacen(original, &replacement, 1);
    }

    Ok(ImageUploadResult {
        content_markdown,
        thumbnail_url,
    })
}

fn upload_embed<A: CmsApi>(
    host: &Host<'_>,
    api: &A,
    file: &VaultFile,
    purpose: MediaPurpose,
) -> Result<String> {
    let bytes = host.store.read_binary(file)?;
    let url = data_url(&bytes, file.extension());
    let response = api.upload_media(&url, purpose)?;
    log::debug!("uploaded {} as {:?} -> {}", file.name(), purpose, response.url);
    Ok(response.url)
}

fn image_link(embed: &EmbedRef, file: &VaultFile, hosted_url: &str) -> String {
    let alt = embed
        .display_text
        .clone()
        .unwrap_or_else(|| file.basename());
    format!("![{}]({})", alt, hosted_url)
}
