//! The set of open sessions, their display order, and their subscriptions.
//!
//! Every lookup by id treats an unknown id as a silent no-op. Mutators return
//! `true` when they touched a session so callers know whether to persist.

use std::collections::HashMap;

use chrono::Utc;
use termweave_config::ProfileId;
use termweave_protocol::DirectoryEntry;

use super::{
    CommandHistoryItem, ConnectionStatus, ServerInfo, Session, SessionId, SessionRecord,
};
use crate::heartbeat::HeartbeatMonitor;
use crate::transport::{Subscription, Transport};

/// Live topic subscriptions of one session; any subset may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    pub terminal: Option<Subscription>,
    pub directory: Option<Subscription>,
    pub pwd: Option<Subscription>,
}

impl SubscriptionSet {
    pub fn is_empty(&self) -> bool {
        self.terminal.is_none() && self.directory.is_none() && self.pwd.is_none()
    }

    fn unsubscribe_all(self, transport: &Transport) {
        for subscription in [self.terminal, self.directory, self.pwd]
            .into_iter()
            .flatten()
        {
            transport.unsubscribe(&subscription);
        }
    }
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    /// Display (tab) order
    order: Vec<SessionId>,
    active: Option<SessionId>,
    subscriptions: HashMap<SessionId, SubscriptionSet>,
    history_limit: usize,
}

impl SessionRegistry {
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            order: Vec::new(),
            active: None,
            subscriptions: HashMap::new(),
            history_limit: history_limit.max(1),
        }
    }

    /// Open a fresh session for `connection_id` and make it active.
    pub fn create(&mut self, connection_id: ProfileId) -> &Session {
        let session = Session::new(connection_id);
        let id = session.id;
        self.order.push(id);
        self.active = Some(id);
        log::info!(
            "Created session {} (remote {}) for profile {}",
            id,
            session.remote_session_id,
            connection_id
        );
        self.sessions.entry(id).or_insert(session)
    }

    /// Re-insert a session from a persisted record.
    ///
    /// Returns false if a session with the same id already exists.
    pub fn insert_restored(&mut self, record: &SessionRecord) -> bool {
        if self.sessions.contains_key(&record.id) {
            log::warn!("Duplicate persisted session {} ignored", record.id);
            return false;
        }
        self.order.push(record.id);
        self.sessions.insert(record.id, Session::restored(record));
        true
    }

    /// Remove a session, its subscriptions, and its heartbeat.
    ///
    /// If it was active, the first remaining session becomes active.
    pub fn remove(
        &mut self,
        id: &SessionId,
        transport: &Transport,
        heartbeat: &mut HeartbeatMonitor,
    ) -> Option<Session> {
        let session = self.sessions.remove(id)?;
        self.drop_subscriptions(id, transport);
        heartbeat.stop(id);
        self.order.retain(|sid| sid != id);
        if self.active == Some(*id) {
            self.active = self.order.first().copied();
        }
        log::info!("Removed session {id}");
        Some(session)
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions in display order
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    pub fn ids(&self) -> &[SessionId] {
        &self.order
    }

    pub fn find_by_remote(&self, remote_session_id: &str) -> Option<&Session> {
        self.sessions
            .values()
            .find(|s| s.remote_session_id == remote_session_id)
    }

    pub fn active_id(&self) -> Option<SessionId> {
        self.active
    }

    pub fn active(&self) -> Option<&Session> {
        self.active.and_then(|id| self.sessions.get(&id))
    }

    /// Set or clear the active session. Unknown ids are ignored.
    pub fn set_active(&mut self, id: Option<SessionId>) -> bool {
        match id {
            Some(id) if !self.sessions.contains_key(&id) => false,
            _ => {
                self.active = id;
                true
            }
        }
    }

    pub fn update_status(&mut self, id: &SessionId, status: ConnectionStatus) -> bool {
        self.with_session(id, |session| {
            if session.status != status {
                crate::debug_info!(
                    "SESSION",
                    "{} status {} -> {}",
                    session.id,
                    session.status,
                    status
                );
            }
            session.status = status;
        })
    }

    pub fn update_server_info(&mut self, id: &SessionId, info: Option<ServerInfo>) -> bool {
        self.with_session(id, |session| session.server_info = info)
    }

    /// Append a command, trimmed. Blank commands are ignored; the oldest entry
    /// is evicted once the history limit is exceeded.
    pub fn append_command(&mut self, id: &SessionId, command: &str) -> bool {
        let trimmed = command.trim();
        if trimmed.is_empty() {
            return false;
        }
        let limit = self.history_limit;
        self.with_session(id, |session| {
            session.command_history.push_back(CommandHistoryItem {
                command: trimmed.to_string(),
                timestamp: Utc::now(),
            });
            while session.command_history.len() > limit {
                session.command_history.pop_front();
            }
        })
    }

    pub fn clear_history(&mut self, id: &SessionId) -> bool {
        self.with_session(id, |session| session.command_history.clear())
    }

    pub fn set_directory_data(
        &mut self,
        id: &SessionId,
        path: impl Into<String>,
        entries: Vec<DirectoryEntry>,
    ) -> bool {
        let path = path.into();
        self.with_session(id, |session| {
            session.current_path = path;
            session.directory_entries = entries;
        })
    }

    pub fn set_loading_directory(&mut self, id: &SessionId, loading: bool) -> bool {
        self.with_session(id, |session| session.is_loading_directory = loading)
    }

    pub fn set_current_path(&mut self, id: &SessionId, path: impl Into<String>) -> bool {
        let path = path.into();
        self.with_session(id, |session| session.current_path = path)
    }

    /// Return and clear the auto-connect flag.
    pub fn take_auto_connect(&mut self, id: &SessionId) -> bool {
        self.sessions
            .get_mut(id)
            .map(|session| std::mem::take(&mut session.auto_connect))
            .unwrap_or(false)
    }

    /// Swap the display positions of two sessions.
    pub fn reorder(&mut self, from: &SessionId, to: &SessionId) -> bool {
        if !self.sessions.contains_key(from) || !self.sessions.contains_key(to) {
            return false;
        }
        self.order = self
            .order
            .iter()
            .map(|id| match id {
                id if id == from => *to,
                id if id == to => *from,
                id => *id,
            })
            .collect();
        true
    }

    /// Install a session's subscriptions, unsubscribing any previous set.
    pub fn set_subscriptions(
        &mut self,
        id: &SessionId,
        set: SubscriptionSet,
        transport: &Transport,
    ) -> bool {
        if !self.sessions.contains_key(id) {
            set.unsubscribe_all(transport);
            return false;
        }
        if let Some(previous) = self.subscriptions.insert(*id, set) {
            previous.unsubscribe_all(transport);
        }
        true
    }

    pub fn drop_subscriptions(&mut self, id: &SessionId, transport: &Transport) {
        if let Some(set) = self.subscriptions.remove(id) {
            set.unsubscribe_all(transport);
        }
    }

    /// Forget every subscription without unsubscribing; used when the channel
    /// is gone and the tokens are already invalid.
    pub fn forget_all_subscriptions(&mut self) {
        self.subscriptions.clear();
    }

    pub fn subscriptions(&self, id: &SessionId) -> Option<&SubscriptionSet> {
        self.subscriptions.get(id)
    }

    fn with_session(&mut self, id: &SessionId, f: impl FnOnce(&mut Session)) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                f(session);
                true
            }
            None => false,
        }
    }
}
