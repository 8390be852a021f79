//! The structured per-session message delivered on `/topic/terminal/{id}`.
//!
//! The `type` field selects one of a closed set of variants. Anything else
//! fails to decode and is treated as a malformed payload by the receiver.

use serde::{Deserialize, Serialize};

use crate::error_code::ErrorCode;

/// Session envelope, discriminated by `type`.
///
/// Optional fields tolerate both absence and explicit `null`, since the
/// server serializes every field of its record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// The remote terminal is up.
    #[serde(rename_all = "camelCase")]
    Connected {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Terminal output bytes (already decoded to text by the server).
    #[serde(rename_all = "camelCase")]
    Output {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
    },
    /// Informational status change.
    #[serde(rename_all = "camelCase")]
    Status {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The remote side reported a failure for this session.
    #[serde(rename_all = "camelCase")]
    Error {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The remote terminal closed.
    #[serde(rename_all = "camelCase")]
    Disconnected {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Acknowledgement of a resize request.
    #[serde(rename_all = "camelCase")]
    Resized {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cols: Option<u16>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rows: Option<u16>,
    },
    /// Server-initiated liveness probe.
    #[serde(rename_all = "camelCase")]
    Ping { session_id: String },
    /// Reply to a heartbeat ping.
    #[serde(rename_all = "camelCase")]
    Pong {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
    },
    /// Periodic server-side health report.
    #[serde(rename_all = "camelCase")]
    HealthCheck {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Envelope {
    /// Remote session id the envelope is addressed to.
    pub fn session_id(&self) -> &str {
        match self {
            Envelope::Connected { session_id, .. }
            | Envelope::Output { session_id, .. }
            | Envelope::Status { session_id, .. }
            | Envelope::Error { session_id, .. }
            | Envelope::Disconnected { session_id, .. }
            | Envelope::Resized { session_id, .. }
            | Envelope::Ping { session_id }
            | Envelope::Pong { session_id, .. }
            | Envelope::HealthCheck { session_id, .. } => session_id,
        }
    }

    /// Wire name of the variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Connected { .. } => "connected",
            Envelope::Output { .. } => "output",
            Envelope::Status { .. } => "status",
            Envelope::Error { .. } => "error",
            Envelope::Disconnected { .. } => "disconnected",
            Envelope::Resized { .. } => "resized",
            Envelope::Ping { .. } => "ping",
            Envelope::Pong { .. } => "pong",
            Envelope::HealthCheck { .. } => "health_check",
        }
    }

    /// Parsed error code of an `error` envelope.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Envelope::Error {
                error_code: Some(code),
                ..
            } => Some(ErrorCode::parse(code)),
            _ => None,
        }
    }

    /// Whether a `pong` or `health_check` reports an unhealthy session.
    ///
    /// Other variants, and reports without a status, count as healthy.
    pub fn reports_unhealthy(&self) -> bool {
        match self {
            Envelope::Pong { status, .. } | Envelope::HealthCheck { status, .. } => {
                status.as_deref() == Some("unhealthy")
            }
            _ => false,
        }
    }

    /// Decode an envelope from a topic body.
    pub fn from_body(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
