// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging setup for consul-settings.
//!
//! The library itself only emits through the `log` facade (see the `*_fmt!`
//! macros). Binaries pick a backend here: plain `env_logger` output, or a
//! structured slog logger with `log` records bridged into it.

pub mod config;
pub mod structured;
mod wrapper;

#[cfg(test)]
pub(crate) mod test_logger;

use log::LevelFilter;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

use self::config::LoggingConfig;

static INIT: Once = Once::new();
static USING_STRUCTURED: AtomicBool = AtomicBool::new(false);

/// Whether the structured backend was installed.
pub fn is_structured_logging() -> bool {
    USING_STRUCTURED.load(Ordering::SeqCst)
}

fn level_name(level: LevelFilter) -> &'static str {
    match level {
        LevelFilter::Trace => "trace",
        LevelFilter::Debug => "debug",
        LevelFilter::Info => "info",
        LevelFilter::Warn => "warn",
        LevelFilter::Error => "error",
        LevelFilter::Off => "off",
    }
}

fn init_env_logger(level: LevelFilter) {
    let env = env_logger::Env::default().filter_or("RUST_LOG", level_name(level));

    // Another logger may already be installed (tests, embedding apps).
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .format_target(true)
        .try_init();
}

/// Initialize logging with the specified level.
///
/// This function ensures logging is only initialized once.
pub fn init(level: Option<LevelFilter>) {
    INIT.call_once(|| {
        init_env_logger(level.unwrap_or(LevelFilter::Info));
        crate::info_fmt!("Logging", "Initialized at level: {}", log::max_level());
    });
}

/// Initialize logging from a [`LoggingConfig`] at `level`.
///
/// `level` usually comes from [`LoggingConfig::level_filter`]; callers may
/// override it. With `structured` set, a slog logger is installed globally and `log`
/// records are forwarded to it; otherwise this behaves like [`init`].
pub fn init_with_config(level: LevelFilter, config: &LoggingConfig) {
    INIT.call_once(|| {
        if config.structured {
            let guard = structured::init_global_logger(&config.to_logger_config(level));
            guard.persist();

            if let Some(level) = level.to_level() {
                if slog_stdlog::init_with_level(level).is_ok() {
                    USING_STRUCTURED.store(true, Ordering::SeqCst);
                }
            }
        } else {
            init_env_logger(level);
        }

        crate::info_fmt!(
            "Logging",
            "Initialized at level: {} (structured: {})",
            log::max_level(),
            is_structured_logging()
        );
    });
}
