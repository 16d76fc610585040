// Author: Dustin Pilgrim
// License: MIT

use std::fmt::Arguments;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Local;
use once_cell::sync::Lazy;

#[derive(PartialEq, PartialOrd, Clone, Copy, Debug)]
pub enum LogLevel {
    Error = 1,
    Warn  = 2,
    Info  = 3,
    Debug = 4,
}

impl LogLevel {
    /// ANSI color for terminal output
    fn color(&self) -> &'static str {
        match self {
            LogLevel::Error => "\x1b[31m", // Red
            LogLevel::Warn  => "\x1b[33m", // Yellow
            LogLevel::Info  => "\x1b[36m", // Cyan
            LogLevel::Debug => "\x1b[90m", // Gray
        }
    }

    fn short(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERR",
            LogLevel::Warn  => "WRN",
            LogLevel::Info  => "INF",
            LogLevel::Debug => "DBG",
        }
    }
}

const RESET_COLOR: &str = "\x1b[0m";

pub struct Config {
    pub level: LogLevel,
    pub use_colors: bool,
    pub console: bool,
    pub file: Option<PathBuf>,
}

pub static GLOBAL_CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| {
    Mutex::new(Config {
        level: LogLevel::Info,
        use_colors: std::io::stdout().is_terminal(),
        console: false,
        file: None,
    })
});

fn config() -> std::sync::MutexGuard<'static, Config> {
    GLOBAL_CONFIG.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn set_log_level(level: LogLevel) {
    config().level = level;
}

pub fn enable_console_output(enabled: bool) {
    config().console = enabled;
}

pub fn enable_file_output(path: &Path) -> std::io::Result<()> {
    OpenOptions::new().create(true).append(true).open(path)?;
    config().file = Some(path.to_path_buf());
    Ok(())
}

/// Core logging function
pub fn log_message(level: LogLevel, prefix: &str, args: Arguments) {
    let config = config();

    if level > config.level {
        return;
    }

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let file_line = format!("[{}][{}][{}] {}", timestamp, level.short(), prefix, args);

    if let Some(path) = &config.file {
        if let Err(e) = write_line(path, &file_line) {
            eprintln!("Failed to write log: {}", e);
        }
    }

    // Errors always reach the terminal; everything else only when asked.
    if config.console || level == LogLevel::Error {
        let console_line = if config.use_colors {
            format!("{}●{} [{}][{}] {}", level.color(), RESET_COLOR, timestamp, prefix, args)
        } else {
            file_line
        };

        match level {
            LogLevel::Error | LogLevel::Warn => eprintln!("{}", console_line),
            _ => println!("{}", console_line),
        }
    }
}

fn write_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// Flexible macro to allow formatted logging
#[macro_export]
macro_rules! qlog {
    ($level:expr, $prefix:expr, $($arg:tt)*) => {
        $crate::log::log_message($level, $prefix, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! qinfo {
    ($prefix:expr, $($arg:tt)*) => { $crate::qlog!($crate::log::LogLevel::Info, $prefix, $($arg)*) };
}

#[macro_export]
macro_rules! qwarn {
    ($prefix:expr, $($arg:tt)*) => { $crate::qlog!($crate::log::LogLevel::Warn, $prefix, $($arg)*) };
}

#[macro_export]
macro_rules! qerror {
    ($prefix:expr, $($arg:tt)*) => { $crate::qlog!($crate::log::LogLevel::Error, $prefix, $($arg)*) };
}

#[macro_export]
macro_rules! qdebug {
    ($prefix:expr, $($arg:tt)*) => { $crate::qlog!($crate::log::LogLevel::Debug, $prefix, $($arg)*) };
}
