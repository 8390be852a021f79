//! Shared pane types.

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Unique identifier for a pane within one layout tree
pub type PaneId = u64;

/// Direction of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitDirection {
    /// Panes are stacked vertically (split creates top/bottom panes)
    Horizontal,
    /// Panes are side by side (split creates left/right panes)
    #[default]
    Vertical,
}

/// What a pane is
#[derive(Debug, Clone, PartialEq)]
pub enum PaneKind {
    /// Leaf hosting at most one session
    Terminal { session_id: Option<SessionId> },
    /// Internal node with exactly two children
    Split {
        direction: SplitDirection,
        children: [PaneId; 2],
    },
}

/// One node of the layout arena
#[derive(Debug, Clone, PartialEq)]
pub struct PaneRecord {
    pub id: PaneId,
    /// `None` only for the root
    pub parent: Option<PaneId>,
    /// Percentage of the parent's extent, clamped to [10, 90]; `None` for the root
    pub size: Option<f64>,
    pub kind: PaneKind,
}

impl PaneRecord {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, PaneKind::Terminal { .. })
    }

    /// Session shown in this pane (always `None` for splits)
    pub fn session_id(&self) -> Option<SessionId> {
        match self.kind {
            PaneKind::Terminal { session_id } => session_id,
            PaneKind::Split { .. } => None,
        }
    }

    pub fn children(&self) -> Option<[PaneId; 2]> {
        match self.kind {
            PaneKind::Split { children, .. } => Some(children),
            PaneKind::Terminal { .. } => None,
        }
    }

    pub fn direction(&self) -> Option<SplitDirection> {
        match self.kind {
            PaneKind::Split { direction, .. } => Some(direction),
            PaneKind::Terminal { .. } => None,
        }
    }
}
