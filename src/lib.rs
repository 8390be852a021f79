// Library exports for the binary and the integration tests
//
// # Mutex Usage Policy
//
// termweave keeps almost all state on one task (the `Workspace`). Locks are
// only needed where the transport's reader task and the caller share state:
//
//   - `parking_lot::Mutex`    - sync-only state shared with the channel reader
//                               (subscription table, link slot). Never held
//                               across an `.await`.
//
//   - `tokio::sync::mpsc`     - everything else that crosses tasks: outbound
//                               frames, pongs, workspace events and notices.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod cli;
pub mod error;
pub mod heartbeat;
pub mod pane;
pub mod persistence;
pub mod session;
pub mod transport;
pub mod workspace;

pub use error::{LayoutError, TransportError, WorkspaceError};
pub use heartbeat::HeartbeatMonitor;
pub use pane::{LayoutTree, PaneId, SplitDirection};
pub use persistence::{PersistedState, PersistenceGateway};
pub use session::{ConnectionStatus, Session, SessionId, SessionRegistry};
pub use transport::{Transport, TransportSettings};
pub use workspace::{Notice, Workspace, WorkspaceEvent};
