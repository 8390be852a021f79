use anyhow::{Context, Result};
use termweave::cli;
use termweave_config::Config;
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    // Process CLI arguments first (before logging init for cleaner output)
    let options = cli::process_cli();

    // Route all log::info!() etc. to <temp_dir>/termweave_debug.log.
    // CLI --log-level takes highest precedence, then RUST_LOG, then config.
    termweave::debug::init_log_bridge(options.log_level);

    let config = match &options.config_path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };
    termweave::debug::apply_config_level(config.log_level.to_level_filter());

    log::info!("Starting termweave {}", termweave::VERSION);

    let runtime = Runtime::new()?;
    let result = runtime.block_on(cli::commands::run(options.command, config));

    // Don't let a stuck stdin read keep the process alive.
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    match result {
        Ok(0) => Ok(()),
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("termweave: error: {e:#}");
            Err(e)
        }
    }
}
