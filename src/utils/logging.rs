//! Logging macros gated by a per-module `ENABLE_LOGS` const.
//!
//! The per-fix filter decisions are chatty at 1 Hz, so hot modules can switch
//! their output off without touching the global `RUST_LOG` filter:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_debug, log_warn};
//!
//! log_debug!("dropping fix: accuracy {:.1}m", accuracy);
//! ```

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Installs the `env_logger` backend. `RUST_LOG` wins when set; otherwise the
/// level is Info, or Debug when `FITSYNC_DEBUG` is `1`/`true`.
/// Safe to call more than once.
pub fn init_logging() {
    let debug_mode = std::env::var("FITSYNC_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if builder.try_init().is_ok() {
        log::info!("FitSync logging initialised at {default_level}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENABLE_LOGS: bool = false;

    #[test]
    fn init_is_idempotent() {
        init_logging();
        init_logging();
    }

    #[test]
    fn disabled_module_macros_compile_to_nothing() {
        log_debug!("{}", 1);
        log_info!("{}", 2);
        log_warn!("{}", 3);
        log_error!("{}", 4);
    }
}
