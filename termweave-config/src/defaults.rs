//! Default value functions for configuration.
//!
//! Used as `#[serde(default = "crate::defaults::...")]` attributes on `Config` fields.

// ── Channel ────────────────────────────────────────────────────────────────

pub fn server_addr() -> String {
    "127.0.0.1:8080".to_string()
}

pub fn base_path() -> String {
    "/ws/terminal".to_string()
}

pub fn handshake_timeout_secs() -> u64 {
    10
}

// ── Heartbeat ──────────────────────────────────────────────────────────────

pub fn heartbeat_interval_secs() -> u64 {
    20
}

pub fn heartbeat_timeout_secs() -> u64 {
    10
}

// ── Sessions ───────────────────────────────────────────────────────────────

pub fn command_history_limit() -> usize {
    100
}

pub fn terminal_type() -> String {
    "xterm-256color".to_string()
}

pub fn default_cols() -> u16 {
    80
}

pub fn default_rows() -> u16 {
    24
}
