//! # `vaultpress_core`
//!
//! Publish markdown notes from a vault to a headless CMS.
//!
//! A note's YAML frontmatter describes the post (slug, title, description,
//! author, published flag). Publishing uploads the note's embedded images,
//! rewrites those embeds as plain markdown images, and upserts the post.
//! Opening a note pulls the post's metadata back into its frontmatter.
//!
//! The pipelines talk to the outside world only through the traits in
//! [`host`] and [`api::CmsApi`]. [`vault::FsVault`] and
//! [`api::HttpCmsApi`] are the native implementations used by the
//! `vaultpress` command-line tool.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod host;
pub mod images;
pub mod metadata_sync;
pub mod post;
pub mod publisher;
pub mod secrets;
pub mod vault;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{Credentials, Settings};
pub use error::{Result, VaultpressError};
pub use host::{DocumentRef, Host};
pub use metadata_sync::{SyncOutcome, sync_metadata_on_open};
pub use publisher::{PublishOutcome, Publisher};
