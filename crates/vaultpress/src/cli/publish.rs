//! `vaultpress publish`

use std::path::Path;

use vaultpress_core::api::HttpCmsApi;
use vaultpress_core::{Host, PublishOutcome, Publisher};

use crate::cli::CliContext;
use crate::cli::host::{StderrNotifier, open_document};

/// Publish `file`. Notices describe each failure; returns whether the post
/// reached the CMS.
pub fn handle_publish(ctx: &CliContext, file: &Path, vault_root: Option<&Path>) -> bool {
    let (vault, doc) = match open_document(file, vault_root) {
        Ok(opened) => opened,
        Err(e) => {
            eprintln!("✗ {}", e);
            return false;
        }
    };
    let secrets = match ctx.secrets() {
        Ok(secrets) => secrets,
        Err(e) => {
            eprintln!("✗ Error loading secrets: {}", e);
            return false;
        }
    };

    let notifier = StderrNotifier;
    let host = Host::new(&vault, &secrets, &notifier);
    let timeout = ctx.settings.timeout();

    let outcome = Publisher::new(host).publish_post(Some(&doc), &ctx.settings, |credentials| {
        HttpCmsApi::new(credentials, timeout)
    });

    match outcome {
        PublishOutcome::Created => println!("✓ Created {}", doc.path().display()),
        PublishOutcome::Updated => println!("✓ Updated {}", doc.path().display()),
        _ => {}
    }
    outcome.is_success()
}
