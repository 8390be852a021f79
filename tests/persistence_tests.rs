//! Workspace snapshots across restarts.

mod common;

use common::{config_in, password_form, reopen_workspace, workspace_fixture};
use tempfile::TempDir;
use termweave::pane::SplitDirection;
use termweave::persistence::{PersistenceGateway, RestoreReport};
use termweave::session::ConnectionStatus;
use termweave::workspace::{Workspace, WorkspaceEvent};
use termweave::WorkspaceError;
use termweave_config::{ProfileId, ProfileStore};

/// Two profiles on disk; returns (web, db).
fn two_profiles(dir: &TempDir) -> (ProfileId, ProfileId) {
    let mut profiles = ProfileStore::new();
    let web = profiles.add(password_form("web")).id;
    let db = profiles.add(password_form("db")).id;
    profiles
        .save_to(&config_in(dir).profiles_file_path())
        .expect("save profiles");
    (web, db)
}

#[tokio::test]
async fn test_restore_rebuilds_layout_and_sessions() {
    let (mut ws, profile, dir) = workspace_fixture();
    let first = ws.open_session(profile, None).unwrap();
    let second = ws
        .open_session(profile, Some(SplitDirection::Horizontal))
        .unwrap();
    ws.set_grid_size(2, 3);
    ws.record_command(&second, "ls -la");
    // The working directory is carried across restarts.
    ws.handle_event(WorkspaceEvent::WorkingDirectory {
        session_id: first,
        path: "/srv/app".to_string(),
    });
    let first_pane = ws.layout().pane_for_session(&first).unwrap();
    ws.focus_pane(first_pane);

    let snapshot = ws.layout().to_snapshot();
    drop(ws);

    let mut restored = reopen_workspace(&dir);
    let report = restored.restore();
    assert_eq!(
        report,
        RestoreReport {
            restored_sessions: 2,
            dropped_sessions: 0,
            layout_reset: false,
        }
    );

    assert_eq!(restored.layout().to_snapshot(), snapshot);
    assert_eq!(restored.layout().focused(), Some(first_pane));
    assert_eq!(restored.layout().grid(), (2, 3));
    assert_eq!(restored.registry().ids(), &[first, second]);
    assert_eq!(restored.registry().active_id(), Some(first));

    let session = restored.registry().get(&first).unwrap();
    assert_eq!(session.status, ConnectionStatus::Disconnected);
    assert!(!session.auto_connect);
    assert_eq!(session.current_path, "/srv/app");
    assert!(
        restored
            .registry()
            .get(&second)
            .unwrap()
            .command_history
            .is_empty()
    );

    // A second restore is ignored.
    assert_eq!(restored.restore(), RestoreReport::default());
}

#[tokio::test]
async fn test_deleted_profile_drops_session_and_frees_pane() {
    let dir = TempDir::new().unwrap();
    let (web, db) = two_profiles(&dir);

    let mut ws = reopen_workspace(&dir);
    let kept = ws.open_session(web, None).unwrap();
    let dropped = ws.open_session(db, None).unwrap();
    let vacated = ws.layout().pane_for_session(&dropped).unwrap();
    drop(ws);

    let path = config_in(&dir).profiles_file_path();
    let mut profiles = ProfileStore::load_from(&path).unwrap();
    profiles.remove(&db);
    profiles.save_to(&path).unwrap();

    let mut ws = reopen_workspace(&dir);
    let report = ws.restore();
    assert_eq!(report.restored_sessions, 1);
    assert_eq!(report.dropped_sessions, 1);
    assert!(!ws.registry().contains(&dropped));
    // The active session was dropped, so the first survivor takes over.
    assert_eq!(ws.registry().active_id(), Some(kept));

    // The pane still points at the dropped session and is reused as-is.
    assert_eq!(ws.layout().focused(), Some(vacated));
    let replacement = ws.open_session(web, None).unwrap();
    assert_eq!(ws.layout().leaf_count(), 2);
    assert_eq!(ws.layout().pane_for_session(&replacement), Some(vacated));
}

#[tokio::test]
async fn test_corrupt_state_file_restores_nothing() {
    let (mut ws, profile, dir) = workspace_fixture();
    std::fs::write(ws.gateway().path(), "{ definitely not json").unwrap();

    assert_eq!(ws.restore(), RestoreReport::default());
    assert!(ws.registry().is_empty());
    assert_eq!(ws.layout().pane_count(), 1);

    // The next mutation overwrites the bad file.
    let id = ws.open_session(profile, None).unwrap();
    drop(ws);
    let mut ws = reopen_workspace(&dir);
    assert_eq!(ws.restore().restored_sessions, 1);
    assert!(ws.registry().contains(&id));
}

#[tokio::test]
async fn test_invalid_layout_resets_but_keeps_sessions() {
    let (mut ws, profile, dir) = workspace_fixture();
    let id = ws.open_session(profile, None).unwrap();
    ws.set_grid_size(3, 2);
    drop(ws);

    // A split with a single child is rejected as a whole.
    let path = config_in(&dir).state_file_path();
    let mut state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    state["layout"] = serde_json::json!({
        "id": 0,
        "type": "split",
        "direction": "vertical",
        "children": [{ "id": 1, "type": "terminal", "sessionId": id }]
    });
    std::fs::write(&path, state.to_string()).unwrap();

    let mut ws = reopen_workspace(&dir);
    let report = ws.restore();
    assert!(report.layout_reset);
    assert_eq!(report.restored_sessions, 1);
    assert_eq!(ws.layout().pane_count(), 1);
    assert_eq!(ws.layout().grid(), (3, 2));
    assert_eq!(ws.registry().active_id(), Some(id));
}

#[tokio::test]
async fn test_exhausted_pane_ids_refuse_new_panes() {
    let (mut ws, profile, dir) = workspace_fixture();
    let id = ws.open_session(profile, None).unwrap();
    drop(ws);

    let last = u64::MAX - 1;
    let path = config_in(&dir).state_file_path();
    let mut state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    state["layout"] = serde_json::json!({ "id": last, "type": "terminal", "sessionId": id });
    state["focusedPaneId"] = serde_json::json!(last);
    std::fs::write(&path, state.to_string()).unwrap();

    let mut ws = reopen_workspace(&dir);
    assert!(!ws.restore().layout_reset);

    let err = ws.open_session(profile, None).unwrap_err();
    assert!(matches!(err, WorkspaceError::InvalidPane(pane) if pane == last));
    let err = ws
        .split_pane(last, SplitDirection::Horizontal, profile)
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::InvalidPane(pane) if pane == last));

    // Nothing was created by the refused calls.
    assert_eq!(ws.registry().ids(), &[id]);
    assert_eq!(ws.layout().pane_count(), 1);
}

#[tokio::test]
async fn test_unwritable_state_path_is_tolerated() {
    let dir = TempDir::new().unwrap();
    let (web, _) = two_profiles(&dir);
    // The state file's parent is a regular file, so every save fails.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let config = config_in(&dir);
    let profiles = ProfileStore::load_from(&config.profiles_file_path()).unwrap();
    let gateway = PersistenceGateway::new(blocker.join("state.json"));
    let mut ws = Workspace::new(config, profiles, gateway);

    let id = ws.open_session(web, None).unwrap();
    assert!(ws.registry().contains(&id));
    assert!(!ws.gateway().path().exists());
    assert_eq!(ws.restore(), RestoreReport::default());
}

#[tokio::test]
async fn test_cleared_state_starts_fresh() {
    let (mut ws, profile, dir) = workspace_fixture();
    ws.open_session(profile, None).unwrap();
    assert!(ws.gateway().path().exists());

    ws.gateway().clear();
    assert!(!ws.gateway().path().exists());
    drop(ws);

    let mut ws = reopen_workspace(&dir);
    assert_eq!(ws.restore(), RestoreReport::default());
    assert!(ws.registry().is_empty());
}

#[tokio::test]
async fn test_unpersisted_mutations_skip_the_state_file() {
    let (mut ws, profile, _dir) = workspace_fixture();
    let id = ws.open_session(profile, None).unwrap();
    std::fs::remove_file(ws.gateway().path()).unwrap();

    assert!(ws.record_command(&id, "uptime"));
    ws.list_directory(&id, "/var/log");
    assert!(!ws.gateway().path().exists());

    ws.set_grid_size(2, 1);
    assert!(ws.gateway().path().exists());
}

#[tokio::test]
async fn test_reset_persists_single_empty_pane() {
    let (mut ws, profile, dir) = workspace_fixture();
    ws.open_session(profile, None).unwrap();
    ws.open_session(profile, None).unwrap();
    ws.reset();
    assert!(ws.registry().is_empty());
    drop(ws);

    let mut ws = reopen_workspace(&dir);
    let report = ws.restore();
    assert_eq!(report.restored_sessions, 0);
    assert_eq!(ws.layout().leaf_count(), 1);
    assert_eq!(ws.layout().root().unwrap().session_id(), None);
}
