// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structured logging backend built on slog, with terminal or JSON output.
//!
//! Both formats write to stderr so stdout stays free for command output.

use serde::{Deserialize, Serialize};
use slog::{Drain, FnValue, Logger, Record, o};
use slog_async::Async;
use slog_json::Json;
use slog_term::{FullFormat, TermDecorator};
use std::io;

/// Structured logging format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable terminal output
    #[default]
    Terminal,
    /// JSON formatted output
    Json,
}

/// Structured logger configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Output format (Terminal or JSON)
    pub format: LogFormat,
    /// Log level
    pub level: slog::Level,
    /// Whether to include source code location
    pub include_location: bool,
    /// Whether to include thread ID
    pub include_thread_id: bool,
    /// Additional static key-value pairs to include in all logs
    pub static_fields: Vec<(String, String)>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            level: slog::Level::Info,
            include_location: true,
            include_thread_id: true,
            static_fields: Vec::new(),
        }
    }
}

/// Create a structured logger with the given configuration
pub fn create_logger(config: &LoggerConfig) -> Logger {
    let root = match config.format {
        LogFormat::Terminal => {
            let decorator = TermDecorator::new().stderr().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Logger::root(Async::new(drain).build().fuse(), o!())
        }
        LogFormat::Json => {
            let drain = Json::new(io::stderr()).add_default_keys().build().fuse();
            let drain = drain.filter_level(config.level).fuse();
            Logger::root(Async::new(drain).build().fuse(), o!())
        }
    };

    with_context(root, config)
}

fn with_context(mut logger: Logger, config: &LoggerConfig) -> Logger {
    if config.include_location {
        logger = logger.new(o!(
            "location" => FnValue(|record: &Record| format!("{}:{}", record.file(), record.line()))
        ));
    }

    if config.include_thread_id {
        logger = logger.new(o!(
            "thread" => FnValue(|_: &Record| format!("{:?}", std::thread::current().id()))
        ));
    }

    // slog keys are 'static; the few configured static fields are leaked once at startup
    for (key, value) in &config.static_fields {
        let key_str: &'static str = Box::leak(key.clone().into_boxed_str());
        logger = logger.new(o!(key_str => value.clone()));
    }

    logger
}

/// Global logger guard that keeps the logger alive
pub struct LoggerGuard {
    guard: slog_scope::GlobalLoggerGuard,
}

impl LoggerGuard {
    /// Keep the global logger installed for the rest of the process.
    pub fn persist(self) {
        self.guard.cancel_reset();
    }
}

/// Initialize the global structured logger
pub fn init_global_logger(config: &LoggerConfig) -> LoggerGuard {
    let logger = create_logger(config);
    let guard = slog_scope::set_global_logger(logger);

    LoggerGuard { guard }
}
