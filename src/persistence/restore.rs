//! Cold restore of a persisted snapshot.
//!
//! Sessions come back disconnected and never auto-connect. A session whose
//! connection profile no longer exists is dropped. The layout, focus and
//! grid come back verbatim; a malformed layout falls back to a fresh one.

use termweave_config::ProfileStore;

use super::PersistedState;
use crate::pane::LayoutTree;
use crate::session::SessionRegistry;

/// What a restore did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored_sessions: usize,
    pub dropped_sessions: usize,
    /// The persisted layout was rejected and replaced by a fresh tree
    pub layout_reset: bool,
}

/// Rebuild `registry` and `layout` from `state`.
///
/// `registry` is expected to be empty; `layout` is replaced.
pub fn apply_state(
    state: &PersistedState,
    profiles: &ProfileStore,
    registry: &mut SessionRegistry,
    layout: &mut LayoutTree,
) -> RestoreReport {
    let mut report = RestoreReport::default();

    for record in &state.sessions {
        if !profiles.contains(&record.connection_id) {
            log::info!(
                "Dropping persisted session {}: profile {} no longer exists",
                record.id,
                record.connection_id
            );
            report.dropped_sessions += 1;
            continue;
        }
        if registry.insert_restored(record) {
            report.restored_sessions += 1;
        } else {
            report.dropped_sessions += 1;
        }
    }

    let active = state
        .active_session_id
        .filter(|id| registry.contains(id))
        .or_else(|| registry.ids().first().copied());
    registry.set_active(active);

    *layout = match LayoutTree::from_snapshot(
        &state.layout,
        state.focused_pane_id,
        state.grid_cols,
        state.grid_rows,
    ) {
        Ok(tree) => tree,
        Err(e) => {
            log::warn!("Persisted layout rejected ({e}); starting with a fresh layout");
            report.layout_reset = true;
            let mut tree = LayoutTree::new();
            tree.set_grid_size(state.grid_cols, state.grid_rows);
            tree
        }
    };

    log::info!(
        "Restored {} sessions ({} dropped), {} panes",
        report.restored_sessions,
        report.dropped_sessions,
        layout.pane_count()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pane::{LayoutNode, PaneType, ROOT_PANE_ID, SplitDirection};
    use crate::session::{ConnectionStatus, SessionRecord};
    use termweave_config::{AuthType, ProfileForm};
    use uuid::Uuid;

    fn store_with_profile() -> (ProfileStore, Uuid) {
        let mut store = ProfileStore::new();
        let id = store
            .add(ProfileForm {
                name: "web".to_string(),
                host: "10.0.0.1".to_string(),
                port: 22,
                username: "ops".to_string(),
                auth_type: AuthType::Password,
                password: "pw".to_string(),
                private_key: String::new(),
            })
            .id;
        (store, id)
    }

    fn record(connection_id: Uuid, status: ConnectionStatus) -> SessionRecord {
        SessionRecord {
            id: Uuid::new_v4(),
            connection_id,
            remote_session_id: Uuid::new_v4().to_string(),
            status,
            current_path: "/srv".to_string(),
        }
    }

    #[test]
    fn test_restore_drops_orphans_and_forces_disconnected() {
        let (profiles, profile) = store_with_profile();
        let kept = record(profile, ConnectionStatus::Connected);
        let orphan = record(Uuid::new_v4(), ConnectionStatus::Connected);

        let mut layout = LayoutTree::new();
        layout.set_session_id(ROOT_PANE_ID, Some(kept.id));
        layout.split(ROOT_PANE_ID, SplitDirection::Vertical, Some(orphan.id));
        layout.set_grid_size(3, 2);

        let state = PersistedState {
            layout: layout.to_snapshot(),
            focused_pane_id: layout.focused(),
            grid_cols: 3,
            grid_rows: 2,
            sessions: vec![kept.clone(), orphan.clone()],
            active_session_id: Some(orphan.id),
        };

        let mut registry = SessionRegistry::new(100);
        let mut restored_layout = LayoutTree::new();
        let report = apply_state(&state, &profiles, &mut registry, &mut restored_layout);

        assert_eq!(report.restored_sessions, 1);
        assert_eq!(report.dropped_sessions, 1);
        assert!(!report.layout_reset);
        assert!(registry.contains(&kept.id));
        assert!(!registry.contains(&orphan.id));

        let session = registry.get(&kept.id).unwrap();
        assert_eq!(session.status, ConnectionStatus::Disconnected);
        assert!(!session.auto_connect);
        assert_eq!(session.current_path, "/srv");

        // Persisted active was dropped, so the first restored session wins.
        assert_eq!(registry.active_id(), Some(kept.id));

        assert_eq!(restored_layout.to_snapshot(), state.layout);
        assert_eq!(restored_layout.focused(), layout.focused());
        assert_eq!(restored_layout.grid(), (3, 2));
    }

    #[test]
    fn test_restore_keeps_persisted_active() {
        let (profiles, profile) = store_with_profile();
        let a = record(profile, ConnectionStatus::Disconnected);
        let b = record(profile, ConnectionStatus::Error);
        let state = PersistedState {
            layout: LayoutTree::new().to_snapshot(),
            focused_pane_id: Some(ROOT_PANE_ID),
            grid_cols: 1,
            grid_rows: 1,
            sessions: vec![a.clone(), b.clone()],
            active_session_id: Some(b.id),
        };

        let mut registry = SessionRegistry::new(100);
        let mut layout = LayoutTree::new();
        apply_state(&state, &profiles, &mut registry, &mut layout);

        assert_eq!(registry.active_id(), Some(b.id));
        assert_eq!(registry.ids(), &[a.id, b.id]);
        assert_eq!(
            registry.get(&b.id).unwrap().status,
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_malformed_layout_falls_back_to_fresh_tree() {
        let (profiles, _) = store_with_profile();
        let state = PersistedState {
            layout: LayoutNode {
                id: 0,
                pane_type: PaneType::Split,
                session_id: None,
                direction: Some(SplitDirection::Vertical),
                children: Some(vec![]),
                size: None,
            },
            focused_pane_id: Some(0),
            grid_cols: 2,
            grid_rows: 9,
            sessions: vec![],
            active_session_id: None,
        };

        let mut registry = SessionRegistry::new(100);
        let mut layout = LayoutTree::new();
        let report = apply_state(&state, &profiles, &mut registry, &mut layout);

        assert!(report.layout_reset);
        assert_eq!(layout.pane_count(), 1);
        assert_eq!(layout.focused(), Some(ROOT_PANE_ID));
        assert_eq!(layout.grid(), (2, 4));
        assert_eq!(registry.active_id(), None);
    }

    #[test]
    fn test_exhausted_pane_ids_fall_back_to_fresh_tree() {
        let (profiles, profile) = store_with_profile();
        let kept = record(profile, ConnectionStatus::Connected);
        let state = PersistedState {
            layout: LayoutNode {
                id: u64::MAX,
                pane_type: PaneType::Terminal,
                session_id: Some(kept.id),
                direction: None,
                children: None,
                size: None,
            },
            focused_pane_id: Some(u64::MAX),
            grid_cols: 1,
            grid_rows: 1,
            sessions: vec![kept.clone()],
            active_session_id: Some(kept.id),
        };

        let mut registry = SessionRegistry::new(100);
        let mut layout = LayoutTree::new();
        let report = apply_state(&state, &profiles, &mut registry, &mut layout);

        assert!(report.layout_reset);
        assert_eq!(report.restored_sessions, 1);
        assert_eq!(layout.pane_count(), 1);
        assert!(layout.split(ROOT_PANE_ID, SplitDirection::Vertical, None).is_some());
    }
}
