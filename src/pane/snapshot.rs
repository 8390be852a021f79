//! Nested, serializable form of the layout tree.
//!
//! The arena is flattened into a recursive record for persistence and
//! rebuilt with validation on restore.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::tree::{INITIAL_SPLIT_SIZE, LayoutTree, MAX_PANE_SIZE, MIN_PANE_SIZE};
use super::types::{PaneId, PaneKind, PaneRecord, SplitDirection};
use crate::error::LayoutError;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneType {
    Terminal,
    Split,
}

/// One pane in persisted form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    pub id: PaneId,
    #[serde(rename = "type")]
    pub pane_type: PaneType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<SplitDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LayoutNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
}

impl LayoutNode {
    fn from_record(record: &PaneRecord) -> Self {
        LayoutNode {
            id: record.id,
            pane_type: if record.is_leaf() {
                PaneType::Terminal
            } else {
                PaneType::Split
            },
            session_id: record.session_id(),
            direction: record.direction(),
            children: None,
            size: record.size,
        }
    }
}

impl LayoutTree {
    /// Nested copy of the tree rooted at the root pane
    pub fn to_snapshot(&self) -> LayoutNode {
        self.node_for(self.root).unwrap_or(LayoutNode {
            id: self.root,
            pane_type: PaneType::Terminal,
            session_id: None,
            direction: None,
            children: None,
            size: None,
        })
    }

    fn node_for(&self, id: PaneId) -> Option<LayoutNode> {
        let record = self.panes.get(&id)?;
        let mut node = LayoutNode::from_record(record);
        if let Some(children) = record.children() {
            node.children = Some(
                children
                    .iter()
                    .filter_map(|child| self.node_for(*child))
                    .collect(),
            );
        }
        Some(node)
    }

    /// Rebuild a tree from its persisted form.
    ///
    /// Sizes are re-clamped and grid dimensions clamped to [1, 4]. A focus
    /// of `None` selects the first leaf.
    pub fn from_snapshot(
        layout: &LayoutNode,
        focused: Option<PaneId>,
        grid_cols: i64,
        grid_rows: i64,
    ) -> Result<Self, LayoutError> {
        let mut panes: HashMap<PaneId, PaneRecord> = HashMap::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<(&LayoutNode, Option<PaneId>)> = vec![(layout, None)];

        while let Some((node, parent)) = stack.pop() {
            if !seen.insert(node.id) {
                return Err(LayoutError::DuplicatePane(node.id));
            }
            let children = node.children.as_deref().unwrap_or(&[]);
            let kind = match node.pane_type {
                PaneType::Terminal => {
                    if !children.is_empty() {
                        return Err(LayoutError::LeafWithChildren(node.id));
                    }
                    PaneKind::Terminal {
                        session_id: node.session_id,
                    }
                }
                PaneType::Split => {
                    if node.session_id.is_some() {
                        return Err(LayoutError::SplitWithSession(node.id));
                    }
                    let direction = node
                        .direction
                        .ok_or(LayoutError::MissingDirection(node.id))?;
                    let [first, second] = children else {
                        return Err(LayoutError::SplitArity {
                            id: node.id,
                            count: children.len(),
                        });
                    };
                    stack.push((second, Some(node.id)));
                    stack.push((first, Some(node.id)));
                    PaneKind::Split {
                        direction,
                        children: [first.id, second.id],
                    }
                }
            };
            let size = match parent {
                Some(_) => Some(
                    node.size
                        .filter(|s| !s.is_nan())
                        .unwrap_or(INITIAL_SPLIT_SIZE)
                        .clamp(MIN_PANE_SIZE, MAX_PANE_SIZE),
                ),
                None => None,
            };
            panes.insert(
                node.id,
                PaneRecord {
                    id: node.id,
                    parent,
                    size,
                    kind,
                },
            );
        }

        let next_id = match panes.keys().max() {
            Some(&max) => max.checked_add(1).ok_or(LayoutError::IdOverflow(max))?,
            None => 0,
        };
        let mut tree = LayoutTree {
            next_id,
            panes,
            root: layout.id,
            focused: None,
            grid_cols: 1,
            grid_rows: 1,
        };
        tree.set_grid_size(grid_cols, grid_rows);
        tree.focused = match focused {
            Some(id) if tree.contains(id) => Some(id),
            Some(id) => return Err(LayoutError::FocusOutsideTree(id)),
            None => tree.first_leaf(tree.root),
        };
        Ok(tree)
    }
}
