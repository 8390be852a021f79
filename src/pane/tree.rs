//! The layout tree: a binary partition of screen space among sessions.
//!
//! Panes live in an arena keyed by [`PaneId`] with parent/child links stored
//! as ids. There is always a root; closing the last leaf empties it instead
//! of removing it.

use std::collections::{HashMap, HashSet};

use super::types::{PaneId, PaneKind, PaneRecord, SplitDirection};
use crate::session::SessionId;

/// Size given to both children of a fresh split
pub const INITIAL_SPLIT_SIZE: f64 = 50.0;
/// Smallest pane size percentage
pub const MIN_PANE_SIZE: f64 = 10.0;
/// Largest pane size percentage
pub const MAX_PANE_SIZE: f64 = 90.0;
/// Largest grid dimension
pub const MAX_GRID: u8 = 4;

/// Id of the root pane of a fresh tree
pub const ROOT_PANE_ID: PaneId = 0;

#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub(super) panes: HashMap<PaneId, PaneRecord>,
    pub(super) root: PaneId,
    pub(super) focused: Option<PaneId>,
    pub(super) next_id: PaneId,
    pub(super) grid_cols: u8,
    pub(super) grid_rows: u8,
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTree {
    /// A single empty, focused root leaf on a 1x1 grid
    pub fn new() -> Self {
        let mut panes = HashMap::new();
        panes.insert(
            ROOT_PANE_ID,
            PaneRecord {
                id: ROOT_PANE_ID,
                parent: None,
                size: None,
                kind: PaneKind::Terminal { session_id: None },
            },
        );
        Self {
            panes,
            root: ROOT_PANE_ID,
            focused: Some(ROOT_PANE_ID),
            next_id: ROOT_PANE_ID + 1,
            grid_cols: 1,
            grid_rows: 1,
        }
    }

    fn alloc_leaf(&mut self, parent: PaneId, session_id: Option<SessionId>) -> Option<PaneId> {
        let id = self.next_id;
        self.next_id = id.checked_add(1)?;
        self.panes.insert(
            id,
            PaneRecord {
                id,
                parent: Some(parent),
                size: Some(INITIAL_SPLIT_SIZE),
                kind: PaneKind::Terminal { session_id },
            },
        );
        Some(id)
    }

    // Both children of a split must fit before anything is inserted.
    fn has_ids_for_split(&self) -> bool {
        self.next_id.checked_add(2).is_some()
    }

    /// Whether [`split`](Self::split) would succeed on `pane_id`.
    pub fn can_split(&self, pane_id: PaneId) -> bool {
        self.get(pane_id).is_some_and(PaneRecord::is_leaf) && self.has_ids_for_split()
    }

    /// Turn terminal leaf `pane_id` into a split.
    ///
    /// The first child keeps the pane's session, the second hosts
    /// `new_session_id` and takes focus. Returns the new pane's id, or `None`
    /// if `pane_id` is unknown, not a terminal leaf, or no pane ids are left.
    pub fn split(
        &mut self,
        pane_id: PaneId,
        direction: SplitDirection,
        new_session_id: Option<SessionId>,
    ) -> Option<PaneId> {
        let original = match self.panes.get(&pane_id).map(|p| &p.kind) {
            Some(PaneKind::Terminal { session_id }) => *session_id,
            Some(PaneKind::Split { .. }) => {
                crate::debug_log!("LAYOUT", "split of split pane {} ignored", pane_id);
                return None;
            }
            None => return None,
        };

        if !self.has_ids_for_split() {
            log::warn!("Pane ids exhausted, cannot split pane {pane_id}");
            return None;
        }
        let first = self.alloc_leaf(pane_id, original)?;
        let second = self.alloc_leaf(pane_id, new_session_id)?;
        if let Some(pane) = self.panes.get_mut(&pane_id) {
            pane.kind = PaneKind::Split {
                direction,
                children: [first, second],
            };
        }
        self.focused = Some(second);

        crate::debug_info!(
            "LAYOUT",
            "split pane {} {:?} into {} and {}",
            pane_id,
            direction,
            first,
            second
        );
        Some(second)
    }

    /// Close `pane_id`, promoting its sibling into the parent's place.
    ///
    /// Closing the root leaf only clears its session. Returns false when
    /// nothing changed (unknown pane, or the root is a split).
    pub fn close(&mut self, pane_id: PaneId) -> bool {
        crate::debug_info!("LAYOUT", "close called for pane {}", pane_id);

        if pane_id == self.root {
            let Some(root) = self.panes.get_mut(&pane_id) else {
                return false;
            };
            if let PaneKind::Terminal { session_id } = &mut root.kind {
                *session_id = None;
                self.focused = Some(pane_id);
                return true;
            }
            crate::debug_log!("LAYOUT", "close of split root {} ignored", pane_id);
            return false;
        }

        let Some(parent_id) = self.panes.get(&pane_id).and_then(|p| p.parent) else {
            crate::debug_log!("LAYOUT", "pane {} not found in tree", pane_id);
            return false;
        };
        let Some([a, b]) = self.panes.get(&parent_id).and_then(PaneRecord::children) else {
            return false;
        };
        let sibling_id = if a == pane_id { b } else { a };

        let removed = self.remove_subtree(pane_id);
        let Some(sibling) = self.panes.remove(&sibling_id) else {
            return false;
        };

        if let PaneKind::Split { children, .. } = &sibling.kind {
            for child in children {
                if let Some(record) = self.panes.get_mut(child) {
                    record.parent = Some(parent_id);
                }
            }
        }
        let parent_is_leaf = sibling.is_leaf();
        if let Some(parent) = self.panes.get_mut(&parent_id) {
            parent.kind = sibling.kind;
            if parent.parent.is_some() {
                parent.size = sibling.size;
            }
        }

        let focus_lost = match self.focused {
            None => true,
            Some(focus) => focus == sibling_id || removed.contains(&focus),
        };
        if focus_lost {
            self.focused = if parent_is_leaf {
                Some(parent_id)
            } else {
                self.first_leaf(parent_id)
            };
            crate::debug_info!(
                "LAYOUT",
                "closed focused pane {}, new focus: {:?}",
                pane_id,
                self.focused
            );
        }
        true
    }

    /// Drop `pane_id` and all its descendants; returns the removed ids.
    fn remove_subtree(&mut self, pane_id: PaneId) -> HashSet<PaneId> {
        let mut removed = HashSet::new();
        let mut stack = vec![pane_id];
        while let Some(id) = stack.pop() {
            if let Some(record) = self.panes.remove(&id) {
                if let Some(children) = record.children() {
                    stack.extend(children);
                }
                removed.insert(id);
            }
        }
        removed
    }

    /// Focus an existing pane. Unknown ids are ignored.
    pub fn set_focused(&mut self, pane_id: PaneId) -> bool {
        if !self.panes.contains_key(&pane_id) {
            return false;
        }
        self.focused = Some(pane_id);
        true
    }

    /// Set a pane's size percentage, clamped to [10, 90].
    pub fn resize(&mut self, pane_id: PaneId, size: f64) -> bool {
        if size.is_nan() {
            return false;
        }
        match self.panes.get_mut(&pane_id) {
            Some(pane) => {
                pane.size = Some(size.clamp(MIN_PANE_SIZE, MAX_PANE_SIZE));
                true
            }
            None => false,
        }
    }

    /// Set the session of a terminal pane; split panes are left untouched.
    pub fn set_session_id(&mut self, pane_id: PaneId, session: Option<SessionId>) -> bool {
        match self.panes.get_mut(&pane_id).map(|p| &mut p.kind) {
            Some(PaneKind::Terminal { session_id }) => {
                *session_id = session;
                true
            }
            _ => false,
        }
    }

    /// Collapse to a single empty, focused root leaf. The grid is kept.
    pub fn reset(&mut self) {
        let (cols, rows) = self.grid();
        *self = Self::new();
        self.grid_cols = cols;
        self.grid_rows = rows;
        crate::debug_info!("LAYOUT", "layout reset");
    }

    /// Set the grid dimensions, each clamped to [1, 4].
    pub fn set_grid_size(&mut self, cols: i64, rows: i64) {
        self.grid_cols = clamp_grid(cols);
        self.grid_rows = clamp_grid(rows);
    }

    pub fn grid(&self) -> (u8, u8) {
        (self.grid_cols, self.grid_rows)
    }

    pub fn root_id(&self) -> PaneId {
        self.root
    }

    pub fn root(&self) -> Option<&PaneRecord> {
        self.panes.get(&self.root)
    }

    pub fn focused(&self) -> Option<PaneId> {
        self.focused
    }

    pub fn get(&self, pane_id: PaneId) -> Option<&PaneRecord> {
        self.panes.get(&pane_id)
    }

    pub fn contains(&self, pane_id: PaneId) -> bool {
        self.panes.contains_key(&pane_id)
    }

    pub fn pane_count(&self) -> usize {
        self.panes.len()
    }

    /// Terminal leaves in depth-first, first-child-first order
    pub fn leaves(&self) -> Vec<PaneId> {
        self.leaves_under(self.root)
    }

    fn leaves_under(&self, start: PaneId) -> Vec<PaneId> {
        let mut leaves = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(record) = self.panes.get(&id) else {
                continue;
            };
            match record.kind {
                PaneKind::Terminal { .. } => leaves.push(id),
                PaneKind::Split { children: [a, b], .. } => {
                    stack.push(b);
                    stack.push(a);
                }
            }
        }
        leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().len()
    }

    /// First terminal leaf in depth-first order under `start`
    pub fn first_leaf(&self, start: PaneId) -> Option<PaneId> {
        let mut current = start;
        loop {
            match self.panes.get(&current)?.kind {
                PaneKind::Terminal { .. } => return Some(current),
                PaneKind::Split { children: [first, _], .. } => current = first,
            }
        }
    }

    /// Leaf currently showing `session_id`
    pub fn pane_for_session(&self, session_id: &SessionId) -> Option<PaneId> {
        self.leaves()
            .into_iter()
            .find(|id| {
                self.panes
                    .get(id)
                    .and_then(PaneRecord::session_id)
                    .as_ref()
                    == Some(session_id)
            })
    }

    /// Sessions referenced by leaves, in leaf order
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.leaves()
            .into_iter()
            .filter_map(|id| self.panes.get(&id).and_then(PaneRecord::session_id))
            .collect()
    }
}

fn clamp_grid(value: i64) -> u8 {
    value.clamp(1, i64::from(MAX_GRID)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn leaf_session(tree: &LayoutTree, id: PaneId) -> Option<SessionId> {
        tree.get(id).and_then(PaneRecord::session_id)
    }

    #[test]
    fn test_split_fresh_root() {
        let mut tree = LayoutTree::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        tree.set_session_id(ROOT_PANE_ID, Some(s1));

        let new_pane = tree.split(ROOT_PANE_ID, SplitDirection::Horizontal, Some(s2)).unwrap();

        let root = tree.root().unwrap();
        assert_eq!(root.direction(), Some(SplitDirection::Horizontal));
        assert_eq!(root.session_id(), None);
        let [first, second] = root.children().unwrap();
        assert_eq!(second, new_pane);
        assert_eq!(leaf_session(&tree, first), Some(s1));
        assert_eq!(leaf_session(&tree, second), Some(s2));
        assert_eq!(tree.get(first).unwrap().size, Some(50.0));
        assert_eq!(tree.get(second).unwrap().size, Some(50.0));
        assert_eq!(tree.focused(), Some(second));
    }

    #[test]
    fn test_split_unknown_or_split_pane_is_noop() {
        let mut tree = LayoutTree::new();
        assert!(tree.split(42, SplitDirection::Vertical, None).is_none());

        tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None);
        let before = tree.pane_count();
        assert!(tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None).is_none());
        assert_eq!(tree.pane_count(), before);
    }

    #[test]
    fn test_close_only_leaf_clears_session() {
        let mut tree = LayoutTree::new();
        tree.set_session_id(ROOT_PANE_ID, Some(Uuid::new_v4()));

        assert!(tree.close(ROOT_PANE_ID));
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(leaf_session(&tree, ROOT_PANE_ID), None);
        assert_eq!(tree.focused(), Some(ROOT_PANE_ID));
    }

    #[test]
    fn test_close_promotes_leaf_sibling() {
        let mut tree = LayoutTree::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        tree.set_session_id(ROOT_PANE_ID, Some(s1));
        let second = tree.split(ROOT_PANE_ID, SplitDirection::Vertical, Some(s2)).unwrap();

        assert!(tree.close(second));
        assert_eq!(tree.leaf_count(), 1);
        let root = tree.root().unwrap();
        assert!(root.is_leaf());
        assert_eq!(root.session_id(), Some(s1));
        assert_eq!(tree.focused(), Some(ROOT_PANE_ID));
        assert_eq!(tree.pane_count(), 1);
    }

    #[test]
    fn test_close_promotes_split_sibling_and_reparents() {
        let mut tree = LayoutTree::new();
        let right = tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None).unwrap();
        let [left, _] = tree.root().unwrap().children().unwrap();
        let bottom = tree.split(right, SplitDirection::Horizontal, None).unwrap();
        let [top, _] = tree.get(right).unwrap().children().unwrap();
        assert_eq!(tree.leaf_count(), 3);

        tree.set_focused(left);
        assert!(tree.close(left));

        assert_eq!(tree.leaf_count(), 2);
        let root = tree.root().unwrap();
        assert_eq!(root.direction(), Some(SplitDirection::Horizontal));
        assert_eq!(root.children(), Some([top, bottom]));
        assert_eq!(tree.get(top).unwrap().parent, Some(ROOT_PANE_ID));
        assert_eq!(tree.get(bottom).unwrap().parent, Some(ROOT_PANE_ID));
        // Focus falls to the first leaf of the promoted subtree.
        assert_eq!(tree.focused(), Some(top));
    }

    #[test]
    fn test_close_unfocused_pane_keeps_focus() {
        let mut tree = LayoutTree::new();
        let right = tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None).unwrap();
        let bottom = tree.split(right, SplitDirection::Horizontal, None).unwrap();
        let [left, _] = tree.root().unwrap().children().unwrap();

        assert_eq!(tree.focused(), Some(bottom));
        assert!(tree.close(left));
        assert_eq!(tree.focused(), Some(bottom));
    }

    #[test]
    fn test_close_when_focus_on_sibling_moves_to_parent() {
        let mut tree = LayoutTree::new();
        let second = tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None).unwrap();
        let [first, _] = tree.root().unwrap().children().unwrap();

        assert_eq!(tree.focused(), Some(second));
        assert!(tree.close(first));
        assert_eq!(tree.focused(), Some(ROOT_PANE_ID));
    }

    #[test]
    fn test_close_unknown_and_split_root_are_noops() {
        let mut tree = LayoutTree::new();
        assert!(!tree.close(99));
        tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None);
        assert!(!tree.close(ROOT_PANE_ID));
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_resize_clamps() {
        let mut tree = LayoutTree::new();
        let pane = tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None).unwrap();

        assert!(tree.resize(pane, 150.0));
        assert_eq!(tree.get(pane).unwrap().size, Some(90.0));
        assert!(tree.resize(pane, -5.0));
        assert_eq!(tree.get(pane).unwrap().size, Some(10.0));
        assert!(tree.resize(pane, 33.0));
        assert_eq!(tree.get(pane).unwrap().size, Some(33.0));
        assert!(!tree.resize(pane, f64::NAN));
        assert!(!tree.resize(77, 50.0));
    }

    #[test]
    fn test_set_session_id_terminal_only() {
        let mut tree = LayoutTree::new();
        tree.split(ROOT_PANE_ID, SplitDirection::Vertical, None);
        assert!(!tree.set_session_id(ROOT_PANE_ID, Some(Uuid::new_v4())));
        assert_eq!(tree.root().unwrap().session_id(), None);
    }

    #[test]
    fn test_reset_and_grid() {
        let mut tree = LayoutTree::new();
        tree.split(ROOT_PANE_ID, SplitDirection::Vertical, Some(Uuid::new_v4()));
        tree.set_grid_size(9, -2);
        assert_eq!(tree.grid(), (4, 1));

        tree.reset();
        assert_eq!(tree.pane_count(), 1);
        assert_eq!(tree.focused(), Some(ROOT_PANE_ID));
        assert!(tree.root().unwrap().is_leaf());
        assert_eq!(tree.grid(), (4, 1));
    }

    #[test]
    fn test_leaves_dfs_order_and_lookup() {
        let mut tree = LayoutTree::new();
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let s3 = Uuid::new_v4();
        tree.set_session_id(ROOT_PANE_ID, Some(s1));
        let p2 = tree.split(ROOT_PANE_ID, SplitDirection::Vertical, Some(s2)).unwrap();
        let [p1, _] = tree.root().unwrap().children().unwrap();
        let p3 = tree.split(p1, SplitDirection::Horizontal, Some(s3)).unwrap();

        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1], p3);
        assert_eq!(leaves[2], p2);
        assert_eq!(tree.session_ids(), vec![s1, s3, s2]);
        assert_eq!(tree.pane_for_session(&s3), Some(p3));
        assert_eq!(tree.first_leaf(ROOT_PANE_ID), Some(leaves[0]));
        assert!(tree.pane_for_session(&Uuid::new_v4()).is_none());
    }
}
