//! Typed error variants for the termweave-config crate.
//!
//! `Config::load` and `Config::save` return `anyhow::Result`; callers who want
//! to match on a specific failure can downcast to [`ConfigError`].

use thiserror::Error;

/// Errors that can occur when loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An I/O error occurred reading or writing a config file.
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    /// The file contained invalid YAML.
    #[error("YAML parse error in config: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A field value failed semantic validation.
    ///
    /// The inner string names the field and the reason.
    #[error("Invalid config value: {0}")]
    Validation(String),
}
