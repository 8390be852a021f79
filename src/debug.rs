use parking_lot::Mutex;
/// Debugging and logging infrastructure for termweave
///
/// Two entry points share one log file:
/// - the `log` facade, routed here by [`init_log_bridge`]
/// - the category macros (`debug_info!` etc.), controlled by the DEBUG_LEVEL
///   environment variable:
///   - 0 or unset: No debugging
///   - 1: Errors only
///   - 2: Info level (session lifecycle, transport events)
///   - 3: Debug level (layout surgery, subscription bookkeeping)
///   - 4: Trace level (every frame routed)
///
/// All output goes to `<temp_dir>/termweave_debug.log` so that diagnostics never
/// interleave with terminal output streamed to stdout.
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Debug level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    Off = 0,
    Error = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl DebugLevel {
    fn from_env() -> Self {
        match std::env::var("DEBUG_LEVEL") {
            Ok(val) => Self::from_number(&val),
            Err(_) => DebugLevel::Off,
        }
    }

    fn from_number(val: &str) -> Self {
        match val.trim().parse::<u8>() {
            Ok(1) => DebugLevel::Error,
            Ok(2) => DebugLevel::Info,
            Ok(3) => DebugLevel::Debug,
            Ok(4) => DebugLevel::Trace,
            _ => DebugLevel::Off,
        }
    }
}

/// Path of the shared debug log file
pub fn log_path() -> PathBuf {
    std::env::temp_dir().join("termweave_debug.log")
}

/// Global debug logger
struct DebugLogger {
    level: DebugLevel,
    file: Option<std::fs::File>,
    opened: bool,
}

impl DebugLogger {
    fn new() -> Self {
        let mut logger = DebugLogger {
            level: DebugLevel::from_env(),
            file: None,
            opened: false,
        };
        if logger.level != DebugLevel::Off {
            logger.open();
        }
        logger
    }

    /// Open (truncate) the log file once per process.
    fn open(&mut self) {
        if self.opened {
            return;
        }
        self.opened = true;

        // Failure to open is silent: diagnostics must never break the session.
        if let Ok(f) = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(log_path())
        {
            self.file = Some(f);
            let header = format!(
                "\n{}\ntermweave debug session started at {} (level={:?})\n{}\n",
                "=".repeat(80),
                get_timestamp(),
                self.level,
                "=".repeat(80)
            );
            self.write_raw(&header);
        }
    }

    fn write_raw(&mut self, msg: &str) {
        if let Some(ref mut file) = self.file {
            let _ = file.write_all(msg.as_bytes());
            let _ = file.flush();
        }
    }

    fn log(&mut self, level: DebugLevel, category: &str, msg: &str) {
        if level <= self.level {
            let timestamp = get_timestamp();
            let level_str = match level {
                DebugLevel::Error => "ERROR",
                DebugLevel::Info => "INFO ",
                DebugLevel::Debug => "DEBUG",
                DebugLevel::Trace => "TRACE",
                DebugLevel::Off => return,
            };
            self.write_raw(&format!(
                "[{}] [{}] [{}] {}\n",
                timestamp, level_str, category, msg
            ));
        }
    }
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new()))
}

fn get_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Check if debugging is enabled at given level
pub fn is_enabled(level: DebugLevel) -> bool {
    let logger = get_logger().lock();
    level <= logger.level
}

/// Log a message at specified level
pub fn log(level: DebugLevel, category: &str, msg: &str) {
    let mut logger = get_logger().lock();
    logger.log(level, category, msg);
}

/// Log formatted message
pub fn logf(level: DebugLevel, category: &str, args: fmt::Arguments) {
    if is_enabled(level) {
        log(level, category, &format!("{}", args));
    }
}

// ── log crate bridge ───────────────────────────────────────────────────────

/// Set when the level came from the CLI or RUST_LOG; config must not override it.
static LEVEL_PINNED: AtomicBool = AtomicBool::new(false);

/// Mirror records to stderr (RUST_LOG was set).
static MIRROR_STDERR: AtomicBool = AtomicBool::new(false);

struct LogBridge;

static BRIDGE: LogBridge = LogBridge;

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "[{}] [{:<5}] [{}] {}\n",
            get_timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
        {
            let mut logger = get_logger().lock();
            logger.open();
            logger.write_raw(&line);
        }
        if MIRROR_STDERR.load(Ordering::Relaxed) {
            eprint!("{line}");
        }
    }

    fn flush(&self) {
        let mut logger = get_logger().lock();
        if let Some(ref mut file) = logger.file {
            let _ = file.flush();
        }
    }
}

/// Parse the level part of a RUST_LOG value (`debug`, `termweave=trace`, ...).
///
/// The most verbose level mentioned wins; module filters are not supported.
fn parse_rust_log(value: &str) -> Option<log::LevelFilter> {
    value
        .split(',')
        .filter_map(|directive| {
            let level = directive.rsplit('=').next()?.trim();
            level.parse::<log::LevelFilter>().ok()
        })
        .max()
}

/// Route every `log` record into the debug log file.
///
/// Precedence: `cli_level` > `RUST_LOG` > the config level applied later via
/// [`apply_config_level`]. When RUST_LOG is set, records are also mirrored to
/// stderr. Safe to call more than once; only the first call installs the logger.
pub fn init_log_bridge(cli_level: Option<log::LevelFilter>) {
    let env_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| parse_rust_log(&value));
    MIRROR_STDERR.store(env_level.is_some(), Ordering::Relaxed);

    let level = match (cli_level, env_level) {
        (Some(level), _) | (None, Some(level)) => {
            LEVEL_PINNED.store(true, Ordering::Relaxed);
            level
        }
        (None, None) => log::LevelFilter::Info,
    };

    let _ = log::set_logger(&BRIDGE);
    log::set_max_level(level);
}

/// Apply the config file's level unless the CLI or RUST_LOG already chose one.
pub fn apply_config_level(level: log::LevelFilter) {
    if !LEVEL_PINNED.load(Ordering::Relaxed) {
        log::set_max_level(level);
    }
}

// Convenience macros for logging
#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Error, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Info, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Debug, $category, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_trace {
    ($category:expr, $($arg:tt)*) => {
        $crate::debug::logf($crate::debug::DebugLevel::Trace, $category, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_level_from_number() {
        assert_eq!(DebugLevel::from_number("0"), DebugLevel::Off);
        assert_eq!(DebugLevel::from_number(" 3 "), DebugLevel::Debug);
        assert_eq!(DebugLevel::from_number("9"), DebugLevel::Off);
        assert_eq!(DebugLevel::from_number("loud"), DebugLevel::Off);
    }

    #[test]
    fn test_parse_rust_log() {
        assert_eq!(parse_rust_log("debug"), Some(log::LevelFilter::Debug));
        assert_eq!(
            parse_rust_log("warn,termweave=trace"),
            Some(log::LevelFilter::Trace)
        );
        assert_eq!(parse_rust_log("termweave"), None);
        assert_eq!(parse_rust_log(""), None);
    }
}
