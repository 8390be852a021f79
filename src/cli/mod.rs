//! Command-line interface for termweave.
//!
//! This module handles CLI argument parsing. Subcommand implementations live
//! in the [`commands`] submodule.

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// termweave - Multiplexed remote terminals over one shared channel
#[derive(Parser, Debug)]
#[command(name = "termweave")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Use this config file instead of ~/.config/termweave/config.yaml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set debug log level (overrides config and RUST_LOG)
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevelArg>,
}

/// Log level argument for CLI
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevelArg {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevelArg {
    /// Convert to `log::LevelFilter`
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevelArg::Off => log::LevelFilter::Off,
            LogLevelArg::Error => log::LevelFilter::Error,
            LogLevelArg::Warn => log::LevelFilter::Warn,
            LogLevelArg::Info => log::LevelFilter::Info,
            LogLevelArg::Debug => log::LevelFilter::Debug,
            LogLevelArg::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show the persisted layout, sessions and focus without connecting
    Status,

    /// List connection profiles
    Profiles,

    /// Add a connection profile
    AddProfile {
        /// Display name
        #[arg(long)]
        name: String,

        /// Remote host
        #[arg(long)]
        host: String,

        /// Remote port
        #[arg(long, default_value_t = 22)]
        port: u16,

        /// Remote user
        #[arg(long)]
        username: String,

        /// Authenticate with this password
        #[arg(long, conflicts_with = "key_file")]
        password: Option<String>,

        /// Authenticate with the private key in this file
        #[arg(long, value_name = "PATH")]
        key_file: Option<PathBuf>,
    },

    /// Remove a connection profile
    RemoveProfile {
        /// Profile id or name
        profile: String,
    },

    /// Open a session and attach this terminal to it
    Open {
        /// Profile id or name
        profile: String,

        /// Terminal columns (defaults to the config value)
        #[arg(long)]
        cols: Option<u16>,

        /// Terminal rows (defaults to the config value)
        #[arg(long)]
        rows: Option<u16>,
    },

    /// Clear the persisted layout and sessions
    Reset,
}

/// Runtime options passed from CLI to the application
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    /// Config file override
    pub config_path: Option<PathBuf>,
    /// Log level override from CLI
    pub log_level: Option<log::LevelFilter>,
    /// Subcommand to run; `None` means `status`
    pub command: Option<Commands>,
}

/// Parse CLI arguments into runtime options
pub fn process_cli() -> RuntimeOptions {
    RuntimeOptions::from(Cli::parse())
}

impl From<Cli> for RuntimeOptions {
    fn from(cli: Cli) -> Self {
        Self {
            config_path: cli.config,
            log_level: cli.log_level.map(LogLevelArg::to_level_filter),
            command: cli.command,
        }
    }
}
