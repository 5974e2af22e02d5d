// aid/src/logging.rs

use log::{LevelFilter, SetLoggerError};
use std::io::Write;
use std::sync::Once;

/// Initialize the logging system with the specified log level
pub fn init_logging(level: LevelFilter) -> Result<(), SetLoggerError> {
    static INIT: Once = Once::new();
    let mut result = Ok(());

    INIT.call_once(|| {
        result = env_logger::Builder::new()
            .filter_level(level)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "[{}] {} - {}",
                    buf.timestamp_millis(),
                    record.level(),
                    record.args()
                )
            })
            .try_init();
    });

    result
}

/// Parses the `--log-level` flag. Unknown values fall back to info.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            LevelFilter::Info
        }
    }
}

/// Log level for the subsystem macros below
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

#[macro_export]
macro_rules! policy_log {
    ($level:expr, $($arg:tt)*) => {{
        match $level {
            $crate::logging::LogLevel::Trace => log::trace!("[POLICY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Debug => log::debug!("[POLICY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Info => log::info!("[POLICY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Warn => log::warn!("[POLICY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Error => log::error!("[POLICY] {}", format_args!($($arg)*)),
        }
    }};
}

#[macro_export]
macro_rules! bpf_log {
    ($level:expr, $($arg:tt)*) => {{
        match $level {
            $crate::logging::LogLevel::Trace => log::trace!("[BPF] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Debug => log::debug!("[BPF] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Info => log::info!("[BPF] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Warn => log::warn!("[BPF] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Error => log::error!("[BPF] {}", format_args!($($arg)*)),
        }
    }};
}

#[macro_export]
macro_rules! identity_log {
    ($level:expr, $($arg:tt)*) => {{
        match $level {
            $crate::logging::LogLevel::Trace => log::trace!("[IDENTITY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Debug => log::debug!("[IDENTITY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Info => log::info!("[IDENTITY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Warn => log::warn!("[IDENTITY] {}", format_args!($($arg)*)),
            $crate::logging::LogLevel::Error => log::error!("[IDENTITY] {}", format_args!($($arg)*)),
        }
    }};
}
