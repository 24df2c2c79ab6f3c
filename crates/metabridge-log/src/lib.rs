//! Leveled logging for the `metabridge` workspace.
//!
//! A small, dependency-free logger: a global level held in an atomic, macros
//! that capture the calling module path, and configuration from the
//! environment. Records are written to stderr so they never interleave with a
//! host application's stdout protocol.
//!
//! # Configuration
//!
//! - `METABRIDGE_LOG`: minimum level (`error`, `warn`, `info`, `debug`,
//!   `trace`). Defaults to `warn`.
//! - `METABRIDGE_LOG_COLOR`: set to `0` or `false` to disable ANSI colors.
//!
//! # Example
//!
//! ```
//! use metabridge_log::{debug, info, warn, Level};
//!
//! metabridge_log::set_level(Level::Debug);
//!
//! let class = "QQuickItem";
//! info!("built class {}", class);
//! debug!("members: {:?}", ["x", "y"]);
//! warn!("property read returned an unsupported type");
//! ```

use std::fmt::Arguments;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Environment variable holding the minimum log level.
pub const LEVEL_ENV: &str = "METABRIDGE_LOG";

/// Environment variable toggling ANSI colors.
pub const COLOR_ENV: &str = "METABRIDGE_LOG_COLOR";

/// Severity of a log record. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Failures the caller will see.
    Error = 0,
    /// Recovered problems (e.g. substituted values).
    Warn = 1,
    /// Coarse lifecycle events.
    Info = 2,
    /// Class creation, foreign connections.
    Debug = 3,
    /// Per-member detail.
    Trace = 4,
}

impl Level {
    const fn color_code(self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m",
            Level::Warn => "\x1b[33m",
            Level::Info => "\x1b[32m",
            Level::Debug => "\x1b[36m",
            Level::Trace => "\x1b[35m",
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }

    /// Returns the upper-case name of this level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    /// Parses a level name, case-insensitively.
    ///
    /// ```
    /// use metabridge_log::Level;
    ///
    /// assert_eq!("error".parse(), Ok(Level::Error));
    /// assert_eq!("INFO".parse(), Ok(Level::Info));
    /// assert!("loud".parse::<Level>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The global logger. Obtain it through [`get_logger`].
pub struct Logger {
    level: AtomicU8,
    color: AtomicBool,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
            color: AtomicBool::new(true),
        }
    }

    /// Sets the minimum level; records below it are dropped.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current minimum level.
    pub fn level(&self) -> Level {
        Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    /// Enables or disables ANSI colors.
    pub fn set_color(&self, enabled: bool) {
        self.color.store(enabled, Ordering::Relaxed);
    }

    /// Returns whether records are colored.
    pub fn color(&self) -> bool {
        self.color.load(Ordering::Relaxed)
    }

    /// Checks if a record at `level` would be written.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }

    fn format(&self, level: Level, target: &str, args: Arguments) -> String {
        if self.color() {
            format!("{}[{}]\x1b[0m {target}: {args}", level.color_code(), level.as_str())
        } else {
            format!("[{}] {target}: {args}", level.as_str())
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns the global logger, creating it at `Level::Warn` on first use.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Warn))
}

/// Sets the minimum level of the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the minimum level of the global logger from a level name.
///
/// # Errors
///
/// Returns the parse error message when `s` is not a level name.
pub fn set_level_from_str(s: &str) -> Result<(), String> {
    set_level(s.parse()?);
    Ok(())
}

/// Enables or disables ANSI colors on the global logger.
pub fn set_color(enabled: bool) {
    get_logger().set_color(enabled);
}

/// Configures the global logger from `METABRIDGE_LOG` and
/// `METABRIDGE_LOG_COLOR`.
///
/// Unset variables leave the current setting alone. An unparsable level is
/// reported on stderr and ignored.
pub fn init_from_env() {
    configure(
        std::env::var(LEVEL_ENV).ok().as_deref(),
        std::env::var(COLOR_ENV).ok().as_deref(),
    );
}

fn configure(level: Option<&str>, color: Option<&str>) {
    if let Some(raw) = level {
        if let Err(err) = set_level_from_str(raw) {
            eprintln!("metabridge-log: {err}, keeping {}", get_logger().level());
        }
    }
    if let Some(raw) = color {
        let off = matches!(raw.trim().to_ascii_lowercase().as_str(), "0" | "false" | "off" | "no");
        set_color(!off);
    }
}

#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    let logger = get_logger();
    if !logger.enabled(level) {
        return;
    }
    let line = logger.format(level, target, args);
    // A closed stderr is not worth failing the caller over.
    let _ = writeln!(std::io::stderr().lock(), "{line}");
}

/// Logs at an explicit level, tagging the record with the calling module.
///
/// ```
/// use metabridge_log::{log, Level};
///
/// log!(level: Level::Info, "declared {} members", 3);
/// ```
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            if $crate::get_logger().enabled($level) {
                $crate::__log_with_target(
                    $level,
                    module_path!(),
                    format_args!($($arg)*)
                );
            }
        }
    };
}

/// Logs at `Level::Error`.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs at `Level::Warn`.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs at `Level::Info`.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs at `Level::Debug`.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs at `Level::Trace`.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
