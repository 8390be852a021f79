//! Configuration system for termweave.
//!
//! This crate provides configuration loading, saving, and default values,
//! plus the connection-profile list that sessions are opened against:
//!
//! - [`Config`] - YAML configuration with per-field serde defaults
//! - [`ProfileStore`] - ordered connection profiles with credential helpers
//! - [`ConfigError`] - typed failures for config I/O and validation

pub mod config;
pub mod defaults;
mod error;
pub mod profiles;
mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::ConfigError;
pub use profiles::{ConnectionProfile, Credentials, ProfileForm, ProfileId, ProfileStore};
pub use types::LogLevel;

// Re-exported so callers can build profiles without depending on the protocol crate
pub use termweave_protocol::AuthType;
