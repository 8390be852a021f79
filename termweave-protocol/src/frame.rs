//! Channel-level frames.
//!
//! Frames are newline-delimited JSON objects tagged by `command`. The channel
//! itself only understands destinations and opaque string bodies; session
//! semantics live one level up in [`crate::envelope`].

use serde::{Deserialize, Serialize};

/// Protocol version offered in `CONNECT` and echoed in `CONNECTED`.
pub const PROTOCOL_VERSION: &str = "1.2";

/// A single frame on the shared channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frame {
    /// Client handshake request against the fixed base path.
    #[serde(rename_all = "camelCase")]
    Connect { path: String, accept_version: String },
    /// Server handshake acknowledgement.
    Connected {
        #[serde(default)]
        version: String,
    },
    /// Register interest in a topic; `id` is chosen by the client.
    Subscribe { id: u64, destination: String },
    /// Drop a previously registered subscription.
    Unsubscribe { id: u64 },
    /// Client-to-server publish.
    Send { destination: String, body: String },
    /// Server-to-client delivery for a subscribed topic.
    Message {
        destination: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subscription: Option<u64>,
        body: String,
    },
    /// Channel-level failure reported by the server.
    Error { message: String },
    /// Graceful client teardown.
    Disconnect,
}

impl Frame {
    /// Build the handshake frame for `path`.
    pub fn connect(path: impl Into<String>) -> Self {
        Frame::Connect {
            path: path.into(),
            accept_version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Build a publish frame.
    pub fn send(destination: impl Into<String>, body: impl Into<String>) -> Self {
        Frame::Send {
            destination: destination.into(),
            body: body.into(),
        }
    }

    /// Encode as a single JSON line (including the trailing newline).
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode a single line; surrounding whitespace is ignored.
    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }
}
