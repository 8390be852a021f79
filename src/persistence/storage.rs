//! File I/O for the workspace snapshot
//!
//! The snapshot is stored as JSON in `~/.config/termweave/state.json` unless
//! `state_file` overrides it.

use super::PersistedState;
use anyhow::{Context, Result};
use std::path::Path;

/// Save state to a specific file (atomic: temp file then rename)
pub fn save_state_to(state: &PersistedState, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create state directory {:?}", parent))?;
    }

    let contents =
        serde_json::to_string_pretty(state).context("Failed to serialize workspace state")?;

    let temp_path = path.with_extension("json.tmp");
    std::fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write workspace state to {:?}", temp_path))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to move workspace state into place at {:?}", path))?;

    log::debug!(
        "Saved workspace state ({} sessions) to {:?}",
        state.sessions.len(),
        path
    );
    Ok(())
}

/// Load state from a specific file
///
/// Returns `None` if the file doesn't exist or is empty.
/// Returns an error if the file exists but is corrupt.
pub fn load_state_from(path: &Path) -> Result<Option<PersistedState>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace state from {:?}", path))?;

    if contents.trim().is_empty() {
        return Ok(None);
    }

    let state: PersistedState = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse workspace state from {:?}", path))?;

    log::info!(
        "Loaded workspace state ({} sessions) from {:?}",
        state.sessions.len(),
        path
    );
    Ok(Some(state))
}

/// Remove the state file if present
pub fn clear_state_at(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path)
            .with_context(|| format!("Failed to remove workspace state file {:?}", path))?;
        log::info!("Cleared workspace state file {:?}", path);
    }
    Ok(())
}
