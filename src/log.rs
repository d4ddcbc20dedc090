//! Module that sets up logging and prints colored messages to the terminal.

use color_print::cformat;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Function that installs the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise the level is `debug` when `debug` is set and `info` when it isn't.
/// Calling it twice is harmless, the second subscriber is discarded.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}

/// Function that logs an informational message.
pub fn info(message: &str) {
    tracing::info!("{}", cformat!("<green, bold>[info]</green, bold> {message}"));
}

/// Function that logs a warning.
pub fn warn(message: &str) {
    tracing::warn!("{}", cformat!("<yellow, bold>[warn]</yellow, bold> {message}"));
}

/// Function that logs an error.
pub fn error(message: &str) {
    tracing::error!("{}", cformat!("<red, bold>[error]</red, bold> {message}"));
}

/// Function that logs a protocol trace line, only visible with the debug toggle on.
pub fn debug(message: &str) {
    tracing::debug!("{}", cformat!("<cyan>[mutex]</cyan> {message}"));
}
