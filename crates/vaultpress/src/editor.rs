use std::path::Path;
use std::process::Command;

use thiserror::Error;
use vaultpress_core::Settings;

/// Errors from launching an external editor.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("No editor found. Set $EDITOR, $VISUAL, or run `vaultpress config set-editor`")]
    NoEditorFound,

    #[error("Failed to launch editor '{0}': {1}")]
    LaunchFailed(String, #[source] std::io::Error),

    #[error("Editor exited with code {0}")]
    EditorExited(i32),
}

/// Launch an editor to open a file
pub fn launch_editor(path: &Path, settings: &Settings) -> Result<(), EditorError> {
    let editor = determine_editor(settings)?;
    log::debug!("opening {} with {}", path.display(), editor);

    let status = Command::new(&editor)
        .arg(path)
        .status()
        .map_err(|e| EditorError::LaunchFailed(editor.clone(), e))?;

    if !status.success() {
        return Err(EditorError::EditorExited(status.code().unwrap_or(-1)));
    }

    Ok(())
}

/// Determine which editor to use
fn determine_editor(settings: &Settings) -> Result<String, EditorError> {
    // 1. Settings file
    if let Some(editor) = settings.editor.as_ref().filter(|e| !e.trim().is_empty()) {
        return Ok(editor.clone());
    }

    // 2. $EDITOR, then $VISUAL
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = std::env::var(var)
            && !editor.trim().is_empty()
        {
            return Ok(editor);
        }
    }

    // 3. Platform defaults
    #[cfg(target_os = "windows")]
    {
        return Ok("notepad.exe".to_string());
    }

    #[cfg(not(target_os = "windows"))]
    {
        for editor in ["vim", "vi", "nano", "emacs"] {
            if which(editor) {
                return Ok(editor.to_string());
            }
        }
    }

    Err(EditorError::NoEditorFound)
}

/// Check if a command exists in PATH
#[cfg(not(target_os = "windows"))]
fn which(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_editor_wins() {
        let settings = Settings {
            editor: Some("hx".into()),
            ..Settings::default()
        };
        assert_eq!(determine_editor(&settings).unwrap(), "hx");
    }

    #[test]
    fn blank_configured_editor_is_ignored() {
        let settings = Settings {
            editor: Some("  ".into()),
            ..Settings::default()
        };
        assert_ne!(determine_editor(&settings).ok().as_deref(), Some("  "));
    }

    #[test]
    fn exit_code_is_reported() {
        assert_eq!(
            EditorError::EditorExited(3).to_string(),
            "Editor exited with code 3"
        );
    }
}
