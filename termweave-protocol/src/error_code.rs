//! Error codes carried in the `errorCode` field of `error` envelopes.

use std::fmt;

/// Known failure categories reported by the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AuthFailed,
    Timeout,
    NetworkError,
    SessionExpired,
    InvalidRequest,
    SessionLimit,
    CommandFailed,
    SessionNotFound,
    /// A code this client does not know; kept verbatim.
    Other(String),
}

impl ErrorCode {
    /// Parse a wire code. Never fails: unknown codes become [`ErrorCode::Other`].
    pub fn parse(code: &str) -> Self {
        match code {
            "AUTH_FAILED" => ErrorCode::AuthFailed,
            "TIMEOUT" => ErrorCode::Timeout,
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "SESSION_EXPIRED" => ErrorCode::SessionExpired,
            "INVALID_REQUEST" => ErrorCode::InvalidRequest,
            "SESSION_LIMIT" => ErrorCode::SessionLimit,
            "COMMAND_FAILED" => ErrorCode::CommandFailed,
            "SESSION_NOT_FOUND" => ErrorCode::SessionNotFound,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::AuthFailed => "AUTH_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::SessionExpired => "SESSION_EXPIRED",
            ErrorCode::InvalidRequest => "INVALID_REQUEST",
            ErrorCode::SessionLimit => "SESSION_LIMIT",
            ErrorCode::CommandFailed => "COMMAND_FAILED",
            ErrorCode::SessionNotFound => "SESSION_NOT_FOUND",
            ErrorCode::Other(code) => code,
        }
    }

    /// Default human-readable description.
    pub fn description(&self) -> &str {
        match self {
            ErrorCode::AuthFailed => "Authentication failed",
            ErrorCode::Timeout => "Connection timeout",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::SessionExpired => "Session expired",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::SessionLimit => "Session limit exceeded",
            ErrorCode::CommandFailed => "Command execution failed",
            ErrorCode::SessionNotFound => "Session not found",
            ErrorCode::Other(_) => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
