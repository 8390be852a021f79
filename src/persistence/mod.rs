//! Durable snapshot of the session registry and layout.
//!
//! The snapshot is written after every mutation and read once at startup.
//! Storage failures never reach the caller: a failed save just means the
//! state does not persist, and a failed load restores nothing.

mod restore;
mod storage;

pub use restore::{RestoreReport, apply_state};
pub use storage::{clear_state_at, load_state_from, save_state_to};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use termweave_config::Config;

use crate::pane::{LayoutNode, LayoutTree, PaneId};
use crate::session::{SessionId, SessionRecord, SessionRegistry};

/// Everything needed to rebuild the visible arrangement after a restart.
///
/// No credentials, command history, or directory listings are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub layout: LayoutNode,
    #[serde(default)]
    pub focused_pane_id: Option<PaneId>,
    #[serde(default = "default_grid")]
    pub grid_cols: i64,
    #[serde(default = "default_grid")]
    pub grid_rows: i64,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
    #[serde(default)]
    pub active_session_id: Option<SessionId>,
}

fn default_grid() -> i64 {
    1
}

impl PersistedState {
    /// Snapshot the current registry and layout.
    pub fn capture(registry: &SessionRegistry, layout: &LayoutTree) -> Self {
        let (grid_cols, grid_rows) = layout.grid();
        Self {
            layout: layout.to_snapshot(),
            focused_pane_id: layout.focused(),
            grid_cols: i64::from(grid_cols),
            grid_rows: i64::from(grid_rows),
            sessions: registry.iter().map(|session| session.record()).collect(),
            active_session_id: registry.active_id(),
        }
    }
}

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct PersistenceGateway {
    path: PathBuf,
}

impl PersistenceGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.state_file_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `state`; failures are logged and swallowed.
    pub fn save(&self, state: &PersistedState) {
        if let Err(e) = save_state_to(state, &self.path) {
            log::error!("Failed to persist workspace state: {e:#}");
        }
    }

    /// Read the snapshot; a missing, empty, or unreadable file yields `None`.
    pub fn load(&self) -> Option<PersistedState> {
        match load_state_from(&self.path) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Ignoring unreadable workspace state: {e:#}");
                None
            }
        }
    }

    /// Delete the snapshot file; failures are logged and swallowed.
    pub fn clear(&self) {
        if let Err(e) = clear_state_at(&self.path) {
            log::error!("Failed to clear workspace state: {e:#}");
        }
    }
}
