//! The workspace: one explicitly constructed context owning every piece of
//! session state.
//!
//! Init order is fixed: load the config, load the connection profiles, build
//! the workspace, [`Workspace::restore`], then [`Workspace::connect_transport`].
//! [`Workspace::shutdown`] stops every timer and closes the channel.
//!
//! All mutation happens on the caller's task. Subscription handlers, heartbeat
//! timers and the transport's error callback only post [`WorkspaceEvent`]s,
//! which are applied one at a time by [`Workspace::handle_event`].

mod events;
mod handlers;

pub use events::{Notice, WorkspaceEvent};

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use termweave_config::{Config, ProfileId, ProfileStore};
use termweave_protocol::{
    ConnectRequest, DirectoryListRequest, DirectoryListResponse, DisconnectRequest, Envelope,
    InputRequest, ResizeRequest, TerminalConfig, destinations,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::error::{TransportError, WorkspaceError};
use crate::heartbeat::HeartbeatMonitor;
use crate::pane::{LayoutTree, PaneId, PaneRecord, SplitDirection};
use crate::persistence::{PersistedState, PersistenceGateway, RestoreReport, apply_state};
use crate::session::{ConnectionStatus, SessionId, SessionRegistry, SubscriptionSet};
use crate::transport::{Transport, TransportSettings};

pub type Result<T> = std::result::Result<T, WorkspaceError>;

pub struct Workspace {
    config: Config,
    profiles: ProfileStore,
    profiles_path: PathBuf,
    gateway: PersistenceGateway,
    transport: Transport,
    registry: SessionRegistry,
    layout: LayoutTree,
    heartbeat: HeartbeatMonitor,
    /// Geometry used when a session auto-connects
    terminal_size: (u16, u16),
    event_tx: mpsc::UnboundedSender<WorkspaceEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<WorkspaceEvent>>,
    notice_tx: mpsc::UnboundedSender<Notice>,
    notice_rx: Option<mpsc::UnboundedReceiver<Notice>>,
}

impl Workspace {
    /// Build a workspace. `profiles` must already be loaded.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: Config, profiles: ProfileStore, gateway: PersistenceGateway) -> Self {
        let transport = Transport::new(TransportSettings::from(&config));
        let heartbeat = HeartbeatMonitor::from_config(Arc::new(transport.clone()), &config);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        Self {
            profiles_path: config.profiles_file_path(),
            terminal_size: (config.default_cols, config.default_rows),
            registry: SessionRegistry::new(config.command_history_limit),
            layout: LayoutTree::new(),
            config,
            profiles,
            gateway,
            transport,
            heartbeat,
            event_tx,
            event_rx: Some(event_rx),
            notice_tx,
            notice_rx: Some(notice_rx),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn layout(&self) -> &LayoutTree {
        &self.layout
    }

    pub fn heartbeat(&self) -> &HeartbeatMonitor {
        &self.heartbeat
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Geometry used for sessions that auto-connect after being opened.
    pub fn set_terminal_size(&mut self, cols: u16, rows: u16) {
        self.terminal_size = (cols.max(1), rows.max(1));
    }

    /// Take the notice receiver. Only the first call returns `Some`.
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notice_rx.take()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Cold-restore the persisted layout and sessions.
    ///
    /// Only meaningful on a fresh workspace; later calls are ignored.
    pub fn restore(&mut self) -> RestoreReport {
        if !self.registry.is_empty() {
            log::warn!("Restore skipped: workspace already has sessions");
            return RestoreReport::default();
        }
        let Some(state) = self.gateway.load() else {
            log::info!("No persisted workspace state to restore");
            return RestoreReport::default();
        };
        apply_state(&state, &self.profiles, &mut self.registry, &mut self.layout)
    }

    /// Open the shared channel and re-subscribe every live session.
    pub async fn connect_transport(&mut self) -> Result<()> {
        let on_error = self.transport_error_sink();
        self.transport.connect(on_error).await?;
        self.resubscribe_live_sessions();
        Ok(())
    }

    /// [`Self::connect_transport`] over an already-open stream.
    pub async fn connect_transport_over<S>(&mut self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let on_error = self.transport_error_sink();
        self.transport.connect_stream(stream, on_error).await?;
        self.resubscribe_live_sessions();
        Ok(())
    }

    fn transport_error_sink(&self) -> impl Fn(TransportError) + Send + Sync + 'static {
        let tx = self.event_tx.clone();
        move |err| {
            let _ = tx.send(WorkspaceEvent::TransportFault(err));
        }
    }

    fn resubscribe_live_sessions(&mut self) {
        let live: Vec<SessionId> = self
            .registry
            .iter()
            .filter(|session| session.status.is_live())
            .map(|session| session.id)
            .collect();
        for id in live {
            self.subscribe_session(&id);
        }
        if !self.registry.is_empty() {
            log::info!("Re-subscribed live sessions after connect");
        }
    }

    /// Wait for the next asynchronous event.
    ///
    /// Returns `None` if the event receiver is currently taken by
    /// [`Self::run_until`].
    pub async fn next_event(&mut self) -> Option<WorkspaceEvent> {
        self.event_rx.as_mut()?.recv().await
    }

    /// Apply every event that is already queued; returns how many ran.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.event_rx.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Process events until `shutdown` resolves, then tear down.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Some(mut events) = self.event_rx.take() else {
            log::error!("Workspace event loop already running");
            return;
        };
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => break,
                },
                () = &mut shutdown => break,
            }
        }
        self.event_rx = Some(events);
        self.shutdown();
    }

    /// Stop every heartbeat, disconnect live sessions, close the channel and
    /// write a final snapshot.
    pub fn shutdown(&mut self) {
        log::info!("Shutting down workspace");
        self.heartbeat.stop_all();
        let ids: Vec<SessionId> = self.registry.ids().to_vec();
        for id in ids {
            let live = self
                .registry
                .get(&id)
                .is_some_and(|session| session.status.is_live());
            if live {
                self.publish_disconnect(&id);
                self.registry
                    .update_status(&id, ConnectionStatus::Disconnected);
            }
            self.registry.drop_subscriptions(&id, &self.transport);
        }
        self.transport.close();
        self.persist();
    }

    // ------------------------------------------------------------------
    // Sessions and panes
    // ------------------------------------------------------------------

    /// Open a session for `connection_id` in the focused pane.
    ///
    /// An empty focused pane receives the session; an occupied one is split
    /// (vertically unless `direction` says otherwise). The new session is
    /// active and connects immediately when the channel is up.
    pub fn open_session(
        &mut self,
        connection_id: ProfileId,
        direction: Option<SplitDirection>,
    ) -> Result<SessionId> {
        if !self.profiles.contains(&connection_id) {
            return Err(WorkspaceError::UnknownProfile(connection_id));
        }
        let target = self
            .layout
            .focused()
            .filter(|id| self.layout.get(*id).is_some_and(PaneRecord::is_leaf))
            .or_else(|| self.layout.first_leaf(self.layout.root_id()))
            .ok_or(WorkspaceError::InvalidPane(self.layout.root_id()))?;

        let vacant = self.pane_is_vacant(target);
        if !vacant && !self.layout.can_split(target) {
            return Err(WorkspaceError::InvalidPane(target));
        }

        let id = self.registry.create(connection_id).id;
        if vacant {
            self.layout.set_session_id(target, Some(id));
            self.layout.set_focused(target);
        } else {
            self.layout
                .split(target, direction.unwrap_or_default(), Some(id));
        }
        self.persist();
        self.auto_connect(&id)?;
        Ok(id)
    }

    /// Split `pane_id` and open a session for `connection_id` in the new half.
    pub fn split_pane(
        &mut self,
        pane_id: PaneId,
        direction: SplitDirection,
        connection_id: ProfileId,
    ) -> Result<SessionId> {
        if !self.profiles.contains(&connection_id) {
            return Err(WorkspaceError::UnknownProfile(connection_id));
        }
        if !self.layout.can_split(pane_id) {
            return Err(WorkspaceError::InvalidPane(pane_id));
        }
        let id = self.registry.create(connection_id).id;
        self.layout.split(pane_id, direction, Some(id));
        self.persist();
        self.auto_connect(&id)?;
        Ok(id)
    }

    fn auto_connect(&mut self, id: &SessionId) -> Result<()> {
        if self.transport.is_connected() && self.registry.take_auto_connect(id) {
            let (cols, rows) = self.terminal_size;
            self.connect_session(id, cols, rows)?;
        }
        Ok(())
    }

    /// A terminal leaf with no session, or one whose session is gone.
    fn pane_is_vacant(&self, pane_id: PaneId) -> bool {
        match self.layout.get(pane_id) {
            Some(pane) if pane.is_leaf() => pane
                .session_id()
                .is_none_or(|session| !self.registry.contains(&session)),
            _ => false,
        }
    }

    /// Subscribe the session's topics and ask the remote side to open its
    /// terminal.
    pub fn connect_session(&mut self, id: &SessionId, cols: u16, rows: u16) -> Result<()> {
        let session = self
            .registry
            .get(id)
            .ok_or(WorkspaceError::UnknownSession(*id))?;
        if !self.transport.is_connected() {
            return Err(WorkspaceError::NotConnected);
        }
        let profile = self
            .profiles
            .get(&session.connection_id)
            .ok_or(WorkspaceError::UnknownProfile(session.connection_id))?;

        let credentials = profile.credentials();
        let request = ConnectRequest {
            session_id: session.remote_session_id.clone(),
            host: profile.host.clone(),
            port: profile.port,
            username: profile.username.clone(),
            auth_type: profile.auth_type,
            password: credentials.password,
            private_key: credentials.private_key,
            terminal_config: TerminalConfig {
                cols,
                rows,
                term: self.config.terminal_type.clone(),
            },
        };
        log::info!(
            "Connecting session {} to {}",
            id,
            profile.display_label()
        );

        self.subscribe_session(id);
        self.set_status(id, ConnectionStatus::Connecting);
        self.transport
            .publish_json(destinations::CONNECT, &request)?;
        self.persist();
        Ok(())
    }

    fn subscribe_session(&mut self, id: &SessionId) {
        let Some(remote) = self
            .registry
            .get(id)
            .map(|session| session.remote_session_id.clone())
        else {
            return;
        };
        let session_id = *id;

        let tx = self.event_tx.clone();
        let terminal = self.transport.subscribe(
            destinations::terminal_topic(&remote),
            move |body| match Envelope::from_body(body) {
                Ok(envelope) => {
                    let _ = tx.send(WorkspaceEvent::Envelope {
                        session_id,
                        envelope,
                    });
                }
                Err(e) => log::warn!("Discarding malformed envelope for {session_id}: {e}"),
            },
        );

        let tx = self.event_tx.clone();
        let directory = self.transport.subscribe(
            destinations::directory_topic(&remote),
            move |body| match DirectoryListResponse::from_body(body) {
                Ok(response) => {
                    let _ = tx.send(WorkspaceEvent::Directory {
                        session_id,
                        response,
                    });
                }
                Err(e) => {
                    log::warn!("Discarding malformed directory listing for {session_id}: {e}")
                }
            },
        );

        let tx = self.event_tx.clone();
        let pwd = self
            .transport
            .subscribe(destinations::pwd_topic(&remote), move |body| {
                let _ = tx.send(WorkspaceEvent::WorkingDirectory {
                    session_id,
                    path: body.to_string(),
                });
            });

        self.registry.set_subscriptions(
            id,
            SubscriptionSet {
                terminal,
                directory,
                pwd,
            },
            &self.transport,
        );
    }

    /// Ask the remote side to close the session's terminal. The session stays
    /// in the registry and its pane keeps showing it.
    pub fn disconnect_session(&mut self, id: &SessionId) {
        if !self.registry.contains(id) {
            return;
        }
        self.publish_disconnect(id);
        self.heartbeat.stop(id);
        self.registry.drop_subscriptions(id, &self.transport);
        self.set_status(id, ConnectionStatus::Disconnected);
        self.persist();
    }

    fn publish_disconnect(&self, id: &SessionId) {
        if let Some(session) = self.registry.get(id) {
            self.publish(
                destinations::DISCONNECT,
                &DisconnectRequest {
                    session_id: session.remote_session_id.clone(),
                },
            );
        }
    }

    /// Disconnect and remove a session, closing the pane that shows it.
    pub fn close_session(&mut self, id: &SessionId) -> bool {
        if !self.registry.contains(id) {
            return false;
        }
        match self.layout.pane_for_session(id) {
            Some(pane) => self.close_pane(pane),
            None => {
                self.discard_session(id);
                self.persist();
                true
            }
        }
    }

    /// Close a pane together with the session it shows.
    pub fn close_pane(&mut self, pane_id: PaneId) -> bool {
        let session = self.layout.get(pane_id).and_then(PaneRecord::session_id);
        if !self.layout.close(pane_id) {
            return false;
        }
        if let Some(session) = session {
            self.discard_session(&session);
        }
        self.persist();
        true
    }

    fn discard_session(&mut self, id: &SessionId) {
        let live = self
            .registry
            .get(id)
            .is_some_and(|session| session.status.is_live());
        if live {
            self.publish_disconnect(id);
        }
        self.registry.remove(id, &self.transport, &mut self.heartbeat);
    }

    // ------------------------------------------------------------------
    // Fire-and-forget requests
    // ------------------------------------------------------------------

    pub fn send_input(&self, id: &SessionId, data: impl Into<String>) {
        if let Some(session) = self.registry.get(id) {
            self.publish(
                destinations::INPUT,
                &InputRequest {
                    session_id: session.remote_session_id.clone(),
                    data: data.into(),
                },
            );
        }
    }

    pub fn resize_terminal(&self, id: &SessionId, cols: u16, rows: u16) {
        if let Some(session) = self.registry.get(id) {
            self.publish(
                destinations::RESIZE,
                &ResizeRequest {
                    session_id: session.remote_session_id.clone(),
                    cols,
                    rows,
                },
            );
        }
    }

    /// Request a listing of `path`; the session shows as loading until the
    /// reply arrives.
    pub fn list_directory(&mut self, id: &SessionId, path: impl Into<String>) {
        let Some(remote) = self
            .registry
            .get(id)
            .map(|session| session.remote_session_id.clone())
        else {
            return;
        };
        self.registry.set_loading_directory(id, true);
        self.publish(
            destinations::LIST_DIRECTORY,
            &DirectoryListRequest {
                session_id: remote,
                path: path.into(),
            },
        );
    }

    pub fn request_working_directory(&self, id: &SessionId) {
        if let Some(session) = self.registry.get(id) {
            self.transport
                .publish(destinations::PWD, session.remote_session_id.clone());
        }
    }

    fn publish<T: Serialize>(&self, destination: &str, payload: &T) {
        if let Err(e) = self.transport.publish_json(destination, payload) {
            log::error!("Failed to encode request for {destination}: {e}");
        }
    }

    // ------------------------------------------------------------------
    // Local state
    // ------------------------------------------------------------------

    /// Command history is in-memory only, so recording never touches disk.
    pub fn record_command(&mut self, id: &SessionId, command: &str) -> bool {
        self.registry.append_command(id, command)
    }

    pub fn set_grid_size(&mut self, cols: i64, rows: i64) {
        self.layout.set_grid_size(cols, rows);
        self.persist();
    }

    /// Focus a pane; a pane showing a known session also makes it active.
    pub fn focus_pane(&mut self, pane_id: PaneId) -> bool {
        if !self.layout.set_focused(pane_id) {
            return false;
        }
        if let Some(session) = self.layout.get(pane_id).and_then(PaneRecord::session_id) {
            self.registry.set_active(Some(session));
        }
        self.persist();
        true
    }

    pub fn resize_pane(&mut self, pane_id: PaneId, size: f64) -> bool {
        let changed = self.layout.resize(pane_id, size);
        if changed {
            self.persist();
        }
        changed
    }

    pub fn reorder_sessions(&mut self, from: &SessionId, to: &SessionId) -> bool {
        let changed = self.registry.reorder(from, to);
        if changed {
            self.persist();
        }
        changed
    }

    /// Make a session active (or clear it) and focus the pane showing it.
    pub fn set_active_session(&mut self, id: Option<SessionId>) -> bool {
        if !self.registry.set_active(id) {
            return false;
        }
        if let Some(pane) = id.and_then(|id| self.layout.pane_for_session(&id)) {
            self.layout.set_focused(pane);
        }
        self.persist();
        true
    }

    /// Collapse the layout to a single empty pane, removing every session.
    pub fn reset(&mut self) {
        let ids: Vec<SessionId> = self.registry.ids().to_vec();
        for id in ids {
            self.discard_session(&id);
        }
        self.layout.reset();
        self.persist();
    }

    fn set_status(&mut self, id: &SessionId, status: ConnectionStatus) {
        let changed = self
            .registry
            .get(id)
            .is_some_and(|session| session.status != status);
        if self.registry.update_status(id, status) && changed {
            self.notify(Notice::StatusChanged {
                session_id: *id,
                status,
            });
        }
    }

    fn notify(&self, notice: Notice) {
        // The receiver may have been dropped by a caller that ignores notices.
        let _ = self.notice_tx.send(notice);
    }

    /// Write the snapshot synchronously. Only mutations of persisted fields
    /// call this; history and directory loading state are not persisted.
    fn persist(&self) {
        self.gateway
            .save(&PersistedState::capture(&self.registry, &self.layout));
    }

    fn save_profiles(&self) {
        if let Err(e) = self.profiles.save_to(&self.profiles_path) {
            log::error!("Failed to save connection profiles: {e:#}");
        }
    }
}
