//! Typed error types for termweave.
//!
//! Callers at the library boundary can match on these variants instead of
//! relying on opaque `anyhow` strings. File I/O paths (config, profiles,
//! snapshot storage) keep using `anyhow::Result` with context.

use crate::pane::PaneId;
use crate::session::SessionId;
use termweave_config::ProfileId;
use thiserror::Error;

/// Failures of the shared channel.
///
/// `Clone` so the same value can be delivered to the error callback and
/// returned from `Transport::connect`; I/O causes are captured as strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    // -----------------------------------------------------------------------
    // Handshake
    // -----------------------------------------------------------------------
    /// The TCP connection to the channel endpoint could not be opened.
    #[error("Failed to reach channel endpoint {addr}: {reason}")]
    Unreachable {
        /// Address that was dialled.
        addr: String,
        /// Underlying I/O error text.
        reason: String,
    },

    /// The server answered the handshake with an ERROR frame.
    #[error("Handshake rejected: {0}")]
    Rejected(String),

    /// No CONNECTED frame arrived within the handshake timeout.
    #[error("Handshake timed out after {0}s")]
    HandshakeTimeout(u64),

    /// The server sent something other than CONNECTED or ERROR during the handshake.
    #[error("Unexpected frame during handshake: {0}")]
    UnexpectedFrame(String),

    // -----------------------------------------------------------------------
    // Established channel
    // -----------------------------------------------------------------------
    /// The server sent an ERROR frame on an established channel.
    #[error("Channel error from server: {0}")]
    Remote(String),

    /// The channel closed without a DISCONNECT from this side.
    #[error("Channel connection lost")]
    ConnectionLost,

    /// Reading from or writing to the channel failed.
    #[error("Channel I/O error: {0}")]
    Io(String),

    /// A frame could not be encoded.
    #[error("Frame encoding failed: {0}")]
    Encode(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Failures of workspace operations that need a caller decision.
///
/// Unknown session ids on fire-and-forget operations stay silent no-ops; only
/// operations whose result the caller acts on report them.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// The shared channel is not connected.
    #[error("Not connected to the terminal channel")]
    NotConnected,

    /// No session with this id exists.
    #[error("Unknown session {0}")]
    UnknownSession(SessionId),

    /// No connection profile with this id exists.
    #[error("Unknown connection profile {0}")]
    UnknownProfile(ProfileId),

    /// No pane with this id exists, or it is not a terminal pane.
    #[error("Pane {0} cannot host a session")]
    InvalidPane(PaneId),

    /// The channel failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A request payload could not be encoded.
    #[error("Request encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reasons a persisted layout tree is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Two panes share an id.
    #[error("Duplicate pane id {0}")]
    DuplicatePane(PaneId),

    /// A split pane does not have exactly two children.
    #[error("Split pane {id} has {count} children, expected 2")]
    SplitArity {
        /// Offending pane.
        id: PaneId,
        /// Number of children found.
        count: usize,
    },

    /// A split pane has no direction.
    #[error("Split pane {0} has no direction")]
    MissingDirection(PaneId),

    /// A terminal pane carries children.
    #[error("Terminal pane {0} has children")]
    LeafWithChildren(PaneId),

    /// A split pane carries a session reference.
    #[error("Split pane {0} references a session")]
    SplitWithSession(PaneId),

    /// The focused pane is not part of the tree.
    #[error("Focused pane {0} is not in the tree")]
    FocusOutsideTree(PaneId),

    /// No pane id is left above the largest one in the snapshot.
    #[error("Pane id {0} leaves no room for new panes")]
    IdOverflow(PaneId),
}
