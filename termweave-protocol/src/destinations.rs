//! Publish destinations and per-session topic names.
//!
//! Topics are keyed by the session's remote id (the identifier used on the
//! wire), not by the local registry id.

/// Open the remote terminal for a session.
pub const CONNECT: &str = "/app/terminal/connect";
/// Raw keyboard input.
pub const INPUT: &str = "/app/terminal/input";
/// Close the remote terminal.
pub const DISCONNECT: &str = "/app/terminal/disconnect";
/// Terminal size change.
pub const RESIZE: &str = "/app/terminal/resize";
/// Directory listing request.
pub const LIST_DIRECTORY: &str = "/app/terminal/listdir";
/// Working-directory query; body is the remote session id.
pub const PWD: &str = "/app/terminal/pwd";
/// Heartbeat ping; body is the remote session id.
pub const PING: &str = "/app/terminal/ping";

const TOPIC_PREFIX: &str = "/topic/terminal";

/// Envelope topic for a session.
pub fn terminal_topic(remote_session_id: &str) -> String {
    format!("{TOPIC_PREFIX}/{remote_session_id}")
}

/// Directory listing responses for a session.
pub fn directory_topic(remote_session_id: &str) -> String {
    format!("{TOPIC_PREFIX}/{remote_session_id}/directory")
}

/// Plain-text working directory replies for a session.
pub fn pwd_topic(remote_session_id: &str) -> String {
    format!("{TOPIC_PREFIX}/{remote_session_id}/pwd")
}
