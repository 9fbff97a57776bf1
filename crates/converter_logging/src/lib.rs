#![deny(missing_docs)]
//! Shared logging utilities for the converter workspace.
//!
//! This crate provides the `conv_*` logging macros used across the codebase,
//! the `ipc_trace!` macro for message-channel debugging, and a minimal test
//! initializer for the global logger.

use std::sync::OnceLock;

/// Environment variable that turns on message-channel tracing.
pub const IPC_DEBUG_ENV: &str = "IPC_DEBUG";

static IPC_DEBUG: OnceLock<bool> = OnceLock::new();

/// Returns true when channel traffic should be traced.
///
/// The value is read from `IPC_DEBUG` once, unless [`set_ipc_debug`] ran first.
pub fn ipc_debug_enabled() -> bool {
    *IPC_DEBUG.get_or_init(|| {
        std::env::var(IPC_DEBUG_ENV)
            .map(|value| value == "1")
            .unwrap_or(false)
    })
}

/// Forces channel tracing on or off. Only the first call (or env read) wins.
pub fn set_ipc_debug(enabled: bool) -> bool {
    IPC_DEBUG.set(enabled).is_ok()
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! conv_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! conv_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! conv_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! conv_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! conv_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Logs one message-channel crossing (`direction`, `channel`, payload) when
/// `IPC_DEBUG=1`.
///
/// The payload is any `Debug` value; callers usually pass the JSON text.
#[macro_export]
macro_rules! ipc_trace {
    ($direction:expr, $channel:expr, $payload:expr) => {{
        if $crate::ipc_debug_enabled() {
            log::debug!("[IPC {}] {} {:?}", $direction, $channel, $payload);
        }
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
