//! Split-pane layout
//!
//! This module provides the layout tree that maps screen space to sessions:
//! - `LayoutTree`: arena-backed binary tree with split/close surgery and focus
//! - `PaneRecord` / `PaneKind`: one node of the tree
//! - `LayoutNode`: nested persisted form of the tree
//! - `PaneId`: Unique identifier for each pane

mod snapshot;
mod tree;
mod types;

pub use snapshot::{LayoutNode, PaneType};
pub use tree::{
    INITIAL_SPLIT_SIZE, LayoutTree, MAX_GRID, MAX_PANE_SIZE, MIN_PANE_SIZE, ROOT_PANE_ID,
};
pub use types::{PaneId, PaneKind, PaneRecord, SplitDirection};
