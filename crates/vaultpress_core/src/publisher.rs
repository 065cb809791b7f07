//! The publish pipeline: validate, upload images, upsert the post.
//!
//! Every step that can fail reports a notice and stops; nothing is rolled
//! back, so images uploaded before a later failure stay on the CMS. The
//! document itself is never written.

use crate::api::CmsApi;
use crate::config::{Credentials, Settings};
use crate::error::Result;
use crate::frontmatter;
use crate::host::{DocumentRef, Host};
use crate::images::process_images;
use crate::post::{PostFrontmatter, PostPayload, REQUIRED_FIELDS, error_message, missing_required_fields};

/// How a publish attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No document was given, or it is not markdown
    NoActiveDocument,
    /// The document has no frontmatter block
    NoFrontmatter,
    /// Required frontmatter fields are absent or null
    MissingFields(Vec<&'static str>),
    /// Base URL or API key is not configured
    NotConfigured,
    /// The image step failed as a whole
    ImageProcessingFailed(String),
    /// The CMS rejected the post
    Rejected {
        /// HTTP status of the rejecting response
        status: u16,
        /// Message extracted from the response body
        message: String,
    },
    /// A transport or IO error interrupted the upsert
    Failed(String),
    /// An existing post was replaced
    Updated,
    /// The post did not exist and was created
    Created,
}

impl PublishOutcome {
    /// Whether the post reached the CMS.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Updated | Self::Created)
    }
}

/// Publishes vault documents to the CMS.
pub struct Publisher<'a> {
    host: Host<'a>,
}

impl<'a> Publisher<'a> {
    /// Create a publisher over the given host capabilities.
    pub fn new(host: Host<'a>) -> Self {
        Self { host }
    }

    /// Publish `active` as a post.
    ///
    /// `connect` builds the API client once configuration has been checked;
    /// nothing touches the network before that.
    pub fn publish_post<A, F>(
        &self,
        active: Option<&DocumentRef>,
        settings: &Settings,
        connect: F,
    ) -> PublishOutcome
    where
        A: CmsApi,
        F: FnOnce(&Credentials) -> A,
    {
        let host = &self.host;

        let Some(doc) = active.filter(|doc| doc.is_markdown()) else {
            host.notify("No active Markdown file to publish.");
            return PublishOutcome::NoActiveDocument;
        };

        let fields = match host.index.frontmatter(doc) {
            Ok(Some(fields)) => fields,
            Ok(None) => {
                host.notify(format!(
                    "No frontmatter found. Add required fields: {}.",
                    REQUIRED_FIELDS.join(", ")
                ));
                return PublishOutcome::NoFrontmatter;
            }
            Err(e) => {
                log::warn!("frontmatter of {} unreadable: {}", doc.path().display(), e);
                host.notify(format!(
                    "No frontmatter found. Add required fields: {}.",
                    REQUIRED_FIELDS.join(", ")
                ));
                return PublishOutcome::NoFrontmatter;
            }
        };

        let missing = missing_required_fields(&fields);
        if !missing.is_empty() {
            host.notify(format!("Missing required frontmatter: {}", missing.join(", ")));
            return PublishOutcome::MissingFields(missing);
        }

        let Some(credentials) = settings.credentials(host.secrets) else {
            host.notify("CMS URL and API key must be configured in settings.");
            return PublishOutcome::NotConfigured;
        };

        let post = match PostFrontmatter::from_frontmatter(&fields) {
            Ok(post) => post,
            Err(e) => return self.failed(e),
        };

        let api = connect(&credentials);
        log::debug!("publishing {} as '{}'", doc.path().display(), post.slug);

        let raw = match host.store.read_to_string(doc) {
            Ok(raw) => raw,
            Err(e) => return self.failed(e),
        };
        let body_start = frontmatter::body_start(&raw);

        let images = match process_images(host, doc, &raw[body_start..], body_start, &api) {
            Ok(images) => images,
            Err(e) => {
                host.notify(format!("Failed to process images: {}", e));
                return PublishOutcome::ImageProcessingFailed(e.to_string());
            }
        };

        let payload = PostPayload::new(post, images.content_markdown, images.thumbnail_url);

        match upsert(&api, &payload) {
            Ok(outcome @ (PublishOutcome::Updated | PublishOutcome::Created)) => {
                log::debug!("{:?} '{}'", outcome, payload.slug);
                host.notify("Post published successfully");
                outcome
            }
            Ok(PublishOutcome::Rejected { status, message }) => {
                host.notify(format!("Failed to publish: {}", message));
                PublishOutcome::Rejected { status, message }
            }
            Ok(other) => other,
            Err(e) => self.failed(e),
        }
    }

    fn failed(&self, e: impl std::fmt::Display) -> PublishOutcome {
        log::warn!("publish failed: {}", e);
        self.host.notify(format!("Failed to publish post: {}", e));
        PublishOutcome::Failed(e.to_string())
    }
}

/// Update first; a 404 means the post is new and falls back to create.
fn upsert<A: CmsApi>(api: &A, payload: &PostPayload) -> Result<PublishOutcome> {
    let update = api.update_post(&payload.slug, payload)?;
    if update.status == 404 {
        log::debug!("'{}' not found, creating", payload.slug);
        let create = api.create_post(payload)?;
        if create.is_error() {
            return Ok(PublishOutcome::Rejected {
                status: create.status,
                message: error_message(&create.body),
            });
        }
        return Ok(PublishOutcome::Created);
    }
    if update.is_error() {
        return Ok(PublishOutcome::Rejected {
            status: update.status,
            message: error_message(&update.body),
        });
    }
    Ok(PublishOutcome::Updated)
}
