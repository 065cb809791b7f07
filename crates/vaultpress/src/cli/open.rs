//! `vaultpress open` and `vaultpress sync`

use std::path::Path;

use vaultpress_core::api::HttpCmsApi;
use vaultpress_core::{DocumentRef, Host, SyncOutcome, sync_metadata_on_open};

use crate::cli::CliContext;
use crate::cli::host::{StderrNotifier, open_document};
use crate::editor::launch_editor;

/// Sync metadata into `file`, then open it in the editor unless `no_edit`.
///
/// A failed sync is reported but does not keep the note from opening.
pub fn handle_open(ctx: &CliContext, file: &Path, vault_root: Option<&Path>, no_edit: bool) -> bool {
    let synced = matches!(
        run_sync(ctx, file, vault_root),
        Some((_, outcome)) if !matches!(outcome, SyncOutcome::Failed(_))
    );
    if no_edit {
        return synced;
    }
    match launch_editor(file, &ctx.settings) {
        Ok(()) => true,
        Err(e) => {
            eprintln!("✗ {}", e);
            false
        }
    }
}

/// Sync metadata into `file` and report what changed.
pub fn handle_sync(ctx: &CliContext, file: &Path, vault_root: Option<&Path>) -> bool {
    let Some((doc, outcome)) = run_sync(ctx, file, vault_root) else {
        return false;
    };
    match outcome {
        SyncOutcome::Updated(fields) if fields.is_empty() => {
            println!("Remote post has no metadata to sync");
            true
        }
        SyncOutcome::Updated(fields) => {
            println!("✓ Synced {} into {}", fields.join(", "), doc.path().display());
            true
        }
        SyncOutcome::NotFound => {
            println!("No remote post for {}", doc.path().display());
            true
        }
        SyncOutcome::Skipped => {
            println!("Nothing to sync (not markdown, no slug, or CMS not configured)");
            true
        }
        SyncOutcome::Failed(_) => false,
    }
}

fn run_sync(ctx: &CliContext, file: &Path, vault_root: Option<&Path>) -> Option<(DocumentRef, SyncOutcome)> {
    let (vault, doc) = match open_document(file, vault_root) {
        Ok(opened) => opened,
        Err(e) => {
            eprintln!("✗ {}", e);
            return None;
        }
    };
    let secrets = match ctx.secrets() {
        Ok(secrets) => secrets,
        Err(e) => {
            eprintln!("✗ Error loading secrets: {}", e);
            return None;
        }
    };

    let notifier = StderrNotifier;
    let host = Host::new(&vault, &secrets, &notifier);
    let timeout = ctx.settings.timeout();
    let outcome = sync_metadata_on_open(&host, &doc, &ctx.settings, |credentials| {
        HttpCmsApi::new(credentials, timeout)
    });
    log::debug!("sync outcome: {:?}", outcome);
    Some((doc, outcome))
}
