//! Native host wiring: the vault on disk and notices on stderr.

use std::path::Path;

use vaultpress_core::host::Notifier;
use vaultpress_core::vault::FsVault;
use vaultpress_core::{DocumentRef, Result};

/// Prints notices to stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        log::info!("{}", message);
        eprintln!("{}", message);
    }
}

/// Open the vault holding `file` and address the file inside it.
///
/// `vault_root` overrides vault discovery.
pub fn open_document(file: &Path, vault_root: Option<&Path>) -> Result<(FsVault, DocumentRef)> {
    let vault = match vault_root {
        Some(root) => FsVault::new(root),
        None => FsVault::discover(file)?,
    };
    let doc = vault.document_for(file)?;
    log::debug!("{} in vault {}", doc.path().display(), vault.root().display());
    Ok((vault, doc))
}
