//! `vaultpress config` and `vaultpress secret`

use std::io::{self, BufRead};

use vaultpress_core::Settings;
use vaultpress_core::host::SecretResolver;

use crate::cli::CliContext;
use crate::cli::args::{ConfigCommands, SecretCommands};

/// Show or change settings. Every change is saved immediately.
pub fn handle_config(mut ctx: CliContext, command: ConfigCommands) -> bool {
    let Some(change) = apply_config(&mut ctx.settings, command) else {
        show_settings(&ctx);
        return true;
    };

    match ctx.settings.save_to(&ctx.config_path) {
        Ok(()) => {
            println!("✓ {}", change);
            true
        }
        Err(e) => {
            eprintln!("✗ Failed to save config: {}", e);
            false
        }
    }
}

/// Apply a settings change. `None` for read-only commands.
fn apply_config(settings: &mut Settings, command: ConfigCommands) -> Option<String> {
    match command {
        ConfigCommands::Show => None,
        ConfigCommands::SetUrl { url } => {
            settings.cms_url = url.trim().to_string();
            Some(format!("CMS URL: {}", settings.cms_url))
        }
        ConfigCommands::SetKey { secret_id } => {
            settings.api_key_secret_id = secret_id.trim().to_string();
            Some(format!("API key secret: {}", settings.api_key_secret_id))
        }
        ConfigCommands::SetEditor { editor } => {
            let editor = editor.trim().to_string();
            settings.editor = (!editor.is_empty()).then_some(editor);
            Some(format!(
                "Editor: {}",
                settings.editor.as_deref().unwrap_or("(default)")
            ))
        }
        ConfigCommands::SetTimeout { seconds } => {
            settings.request_timeout_secs = seconds.max(1);
            Some(format!("Request timeout: {}s", settings.request_timeout_secs))
        }
    }
}

fn show_settings(ctx: &CliContext) {
    let settings = &ctx.settings;
    let key_status = match ctx.secrets() {
        _ if settings.api_key_secret_id.is_empty() => "(not set)",
        Ok(secrets) if secrets.get_secret(&settings.api_key_secret_id).is_some() => "found",
        Ok(_) => "missing",
        Err(_) => "unreadable",
    };

    println!("Vaultpress Configuration");
    println!("========================");
    println!();
    println!("Config file: {}", ctx.config_path.display());
    println!(
        "CMS URL: {}",
        settings.base_url().as_deref().unwrap_or("(not set)")
    );
    if settings.api_key_secret_id.is_empty() {
        println!("API key secret: (not set)");
    } else {
        println!(
            "API key secret: {} ({})",
            settings.api_key_secret_id, key_status
        );
    }
    println!("Request timeout: {}s", settings.request_timeout_secs);
    println!(
        "Editor: {}",
        settings.editor.as_deref().unwrap_or("(from $EDITOR)")
    );
}

/// Manage the local secret store.
pub fn handle_secret(ctx: &CliContext, command: SecretCommands) -> bool {
    let mut store = match ctx.secret_store() {
        Ok(store) => store,
        Err(e) => {
            eprintln!("✗ Error loading secrets: {}", e);
            return false;
        }
    };

    match command {
        SecretCommands::Set { id, value } => {
            let value = match value {
                Some(value) => value,
                None => match read_secret_from(io::stdin().lock()) {
                    Ok(value) => value,
                    Err(e) => {
                        eprintln!("✗ Failed to read secret from stdin: {}", e);
                        return false;
                    }
                },
            };
            if value.is_empty() {
                eprintln!("✗ Secret value is empty");
                return false;
            }
            match store.set(&id, &value) {
                Ok(()) => {
                    println!("✓ Stored secret '{}'", id);
                    true
                }
                Err(e) => {
                    eprintln!("✗ {}", e);
                    false
                }
            }
        }
        SecretCommands::Remove { id } => match store.remove(&id) {
            Ok(true) => {
                println!("✓ Removed secret '{}'", id);
                true
            }
            Ok(false) => {
                eprintln!("✗ No secret named '{}'", id);
                false
            }
            Err(e) => {
                eprintln!("✗ {}", e);
                false
            }
        },
        SecretCommands::List => {
            let ids = store.list_ids();
            if ids.is_empty() {
                println!("No secrets stored in {}", store.path().display());
            }
            for id in ids {
                println!("{}", id);
            }
            true
        }
    }
}

/// First line of `reader`, without the line ending.
fn read_secret_from(mut reader: impl BufRead) -> io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
