// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Logging options.
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `structured`        | bool                | `false`    | Use the slog backend instead of env_logger |
//! | `format`            | `terminal`/`json`   | `terminal` | Structured output format |
//! | `level`             | log level name      | `info`     | Maximum level emitted |
//! | `include_location`  | bool                | `true`     | Add `file:line` to structured records |
//! | `include_thread_id` | bool                | `true`     | Add the thread id to structured records |
//! | `static_fields`     | JSON object         | `{}`       | Extra fields on every structured record |
//!
//! [`LoggingConfig::from_env`] reads the same keys from `CONSUL_LOG_*`
//! variables, e.g. `CONSUL_LOG_FORMAT=json`.

use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ConfigError;
use crate::config::env::bind_prefixed;
use crate::logging::structured::{LogFormat, LoggerConfig};

/// Prefix used by [`LoggingConfig::from_env`].
pub const LOG_ENV_PREFIX: &str = "CONSUL_LOG_";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub structured: bool,
    pub format: LogFormat,
    pub level: String,
    pub include_location: bool,
    pub include_thread_id: bool,
    pub static_fields: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            structured: false,
            format: LogFormat::default(),
            level: "info".to_string(),
            include_location: true,
            include_thread_id: true,
            static_fields: HashMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Read logging options from `CONSUL_LOG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix(LOG_ENV_PREFIX)
    }

    /// Read logging options from variables starting with `prefix`.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        bind_prefixed(prefix)
    }

    /// The configured level; unknown names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.trim().parse().unwrap_or(LevelFilter::Info)
    }

    /// Settings for the slog backend at `level`.
    pub fn to_logger_config(&self, level: LevelFilter) -> LoggerConfig {
        let mut static_fields: Vec<(String, String)> = self
            .static_fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        static_fields.sort();

        LoggerConfig {
            format: self.format,
            level: slog_level(level),
            include_location: self.include_location,
            include_thread_id: self.include_thread_id,
            static_fields,
        }
    }
}

// slog has no "off"; only critical records get through then.
fn slog_level(level: LevelFilter) -> slog::Level {
    match level {
        LevelFilter::Off => slog::Level::Critical,
        LevelFilter::Error => slog::Level::Error,
        LevelFilter::Warn => slog::Level::Warning,
        LevelFilter::Info => slog::Level::Info,
        LevelFilter::Debug => slog::Level::Debug,
        LevelFilter::Trace => slog::Level::Trace,
    }
}
