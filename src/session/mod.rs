//! Terminal session model.
//!
//! A session is one logical remote terminal addressed independently on the
//! shared channel. The local `id` keys the registry and the layout; the
//! `remote_session_id` names the session's topics on the wire.

mod registry;

pub use registry::{SessionRegistry, SubscriptionSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use termweave_config::ProfileId;
use termweave_protocol::DirectoryEntry;
use uuid::Uuid;

/// Local session identifier
pub type SessionId = Uuid;

/// Connection state of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// A remote terminal is open or being opened.
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionStatus::Connecting | ConnectionStatus::Connected)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host facts reported by the remote side
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub hostname: String,
    pub os_type: String,
    pub os_version: String,
    pub uptime: String,
    pub cpu_cores: u32,
    pub memory_total: String,
    pub disk_usage: String,
}

/// One executed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHistoryItem {
    pub command: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    /// Connection profile this session was opened against
    pub connection_id: ProfileId,
    /// Identifier used on the wire
    pub remote_session_id: String,
    pub status: ConnectionStatus,
    pub server_info: Option<ServerInfo>,
    /// Oldest first; bounded by the registry's history limit
    pub command_history: VecDeque<CommandHistoryItem>,
    pub current_path: String,
    pub directory_entries: Vec<DirectoryEntry>,
    pub is_loading_directory: bool,
    /// Set only for freshly created sessions, consumed by the first connect
    pub auto_connect: bool,
}

impl Session {
    fn new(connection_id: ProfileId) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection_id,
            remote_session_id: Uuid::new_v4().to_string(),
            status: ConnectionStatus::Disconnected,
            server_info: None,
            command_history: VecDeque::new(),
            current_path: String::new(),
            directory_entries: Vec::new(),
            is_loading_directory: false,
            auto_connect: true,
        }
    }

    /// Rebuild from a persisted record. Never live, never auto-connecting.
    fn restored(record: &SessionRecord) -> Self {
        Self {
            id: record.id,
            connection_id: record.connection_id,
            remote_session_id: record.remote_session_id.clone(),
            status: ConnectionStatus::Disconnected,
            server_info: None,
            command_history: VecDeque::new(),
            current_path: record.current_path.clone(),
            directory_entries: Vec::new(),
            is_loading_directory: false,
            auto_connect: false,
        }
    }

    /// Persisted subset: no credentials, history, or directory listing.
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id,
            connection_id: self.connection_id,
            remote_session_id: self.remote_session_id.clone(),
            status: self.status,
            current_path: self.current_path.clone(),
        }
    }
}

/// Minimal persisted form of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: SessionId,
    pub connection_id: ProfileId,
    pub remote_session_id: String,
    #[serde(default)]
    pub status: ConnectionStatus,
    #[serde(default)]
    pub current_path: String,
}
