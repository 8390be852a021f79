//! Messages flowing into and out of the workspace.

use termweave_protocol::{DirectoryListResponse, Envelope, ErrorCode};

use crate::error::TransportError;
use crate::session::{ConnectionStatus, SessionId};

/// Asynchronous input delivered to [`super::Workspace::handle_event`].
///
/// Produced by subscription handlers, heartbeat timers and the transport's
/// error callback; consumed on the workspace's single event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceEvent {
    /// A decoded envelope from a session's terminal topic.
    Envelope {
        session_id: SessionId,
        envelope: Envelope,
    },
    /// A reply on a session's directory topic.
    Directory {
        session_id: SessionId,
        response: DirectoryListResponse,
    },
    /// A plain-text reply on a session's working-directory topic.
    WorkingDirectory { session_id: SessionId, path: String },
    /// No pong arrived within the heartbeat timeout of one monitoring cycle.
    HeartbeatTimeout { session_id: SessionId, generation: u64 },
    /// The shared channel failed.
    TransportFault(TransportError),
}

impl WorkspaceEvent {
    /// Session the event belongs to; `None` for channel-wide events.
    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            WorkspaceEvent::Envelope { session_id, .. }
            | WorkspaceEvent::Directory { session_id, .. }
            | WorkspaceEvent::WorkingDirectory { session_id, .. }
            | WorkspaceEvent::HeartbeatTimeout { session_id, .. } => Some(*session_id),
            WorkspaceEvent::TransportFault(_) => None,
        }
    }
}

/// Outbound notifications for whatever presents the workspace to a user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// Terminal output for a session.
    Output { session_id: SessionId, data: String },
    /// A session's connection status changed.
    StatusChanged {
        session_id: SessionId,
        status: ConnectionStatus,
    },
    /// Informational text from the remote side.
    Message { session_id: SessionId, text: String },
    /// The remote side acknowledged a resize.
    Resized {
        session_id: SessionId,
        cols: u16,
        rows: u16,
    },
    /// The remote side reported a failure for a session.
    SessionError {
        session_id: SessionId,
        code: Option<ErrorCode>,
        message: String,
    },
    /// A directory listing arrived.
    DirectoryListed { session_id: SessionId, path: String },
    /// A session missed its heartbeat.
    LivenessLost { session_id: SessionId },
    /// The shared channel failed.
    Transport(TransportError),
}
