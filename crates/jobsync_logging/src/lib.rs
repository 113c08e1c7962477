#![deny(missing_docs)]
//! Shared logging utilities for the jobsync workspace.
//!
//! This crate provides the `sync_*` logging macros used across the codebase,
//! the logger initializers for the terminal front-end and a quiet initializer
//! for tests.

use std::cell::Cell;
use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILE: &str = "./jobsync.log";

thread_local! {
    /// Refresh pass currently executing on this thread.
    static POLL_GENERATION: Cell<u64> = const { Cell::new(0) };
}

/// Records the refresh pass the current thread is working on.
/// The scheduler calls this before each pass so log lines can be grouped.
pub fn set_poll_generation(generation: u64) {
    POLL_GENERATION.with(|v| v.set(generation));
}

/// Returns the refresh pass recorded for the current thread, or 0 if none was set.
pub fn poll_generation() -> u64 {
    POLL_GENERATION.with(|v| v.get())
}

/// Prefix the `sync_*` macros put in front of every message: `[pass N] `
/// while a refresh pass runs on this thread, empty otherwise.
pub fn pass_prefix() -> String {
    match poll_generation() {
        0 => String::new(),
        generation => format!("[pass {generation}] "),
    }
}

/// Shared body of the `sync_*` macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __sync_log {
    ($level:expr, $($arg:tt)*) => {{
        log::log!($level, "{}{}", $crate::pass_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! sync_trace {
    ($($arg:tt)*) => {
        $crate::__sync_log!(log::Level::Trace, $($arg)*)
    };
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! sync_debug {
    ($($arg:tt)*) => {
        $crate::__sync_log!(log::Level::Debug, $($arg)*)
    };
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! sync_info {
    ($($arg:tt)*) => {
        $crate::__sync_log!(log::Level::Info, $($arg)*)
    };
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! sync_warn {
    ($($arg:tt)*) => {
        $crate::__sync_log!(log::Level::Warn, $($arg)*)
    };
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! sync_error {
    ($($arg:tt)*) => {
        $crate::__sync_log!(log::Level::Error, $($arg)*)
    };
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to `./jobsync.log` in the current directory.
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initializes the global logger with the given destination and level.
///
/// Silently keeps an already installed logger.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![TermLogger::new(
            level,
            config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )],
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILE);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
