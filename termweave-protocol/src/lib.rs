//! termweave-protocol: wire types for the shared terminal channel.
//!
//! One duplex channel carries the traffic of every terminal session. This
//! crate models what travels over it and performs no I/O of its own.
//!
//! The crate is organized by domain:
//!
//! - [`frame`] - Channel-level frames (handshake, subscribe, send, message)
//! - [`destinations`] - Publish destinations and per-session topic names
//! - [`envelope`] - The structured per-session message (tagged union)
//! - [`requests`] - Outbound session request payloads (connect, input, resize, ...)
//! - [`directory`] - Directory listing request/response types
//! - [`error_code`] - Error codes carried by `error` envelopes

pub mod destinations;
pub mod directory;
pub mod envelope;
pub mod error_code;
pub mod frame;
pub mod requests;

// Re-export the main public types at the crate root for convenience
pub use directory::{DirectoryEntry, DirectoryListRequest, DirectoryListResponse, EntryType};
pub use envelope::Envelope;
pub use error_code::ErrorCode;
pub use frame::{Frame, PROTOCOL_VERSION};
pub use requests::{
    AuthType, ConnectRequest, DisconnectRequest, InputRequest, ResizeRequest, TerminalConfig,
};
