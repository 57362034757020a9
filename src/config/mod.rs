// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Provider configuration.
//!
//! Two layers exist:
//!
//! 1. [`ConsulOptions`] is a plain serde bag the host application fills from
//!    wherever it keeps its settings (or from `CONSUL_*` environment
//!    variables via [`ConsulOptions::from_env`]).
//! 2. [`ConsulConfig`] is the validated form. Constructing it is the only
//!    place where the URL and environment are checked, so a bad value fails
//!    before any store query runs.
//!
//! | key | type | default | description |
//! |-----|------|---------|-------------|
//! | `url`           | absolute URL | | Consul HTTP address                |
//! | `token`         | string       | | ACL token sent as `X-Consul-Token` |
//! | `environment`   | string       | | First segment of every service key |
//! | `use_cache`     | bool         | `true` | Cache resolved settings       |
//! | `timeout_secs`  | integer      | `15`   | Store request timeout         |
//! | `normalization` | `preserve`/`lowercase` | `preserve` | Key case policy |

pub(crate) mod env;
pub mod error;


pub use error::ConfigError;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::key::KeyNormalization;

/// Store request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Where and how to reach the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConnection {
    address: Url,
    token: Option<String>,
    timeout: Duration,
}

impl StoreConnection {
    /// Validate `url` and build a connection description.
    ///
    /// An empty token is treated as no token; a missing timeout falls back to
    /// [`DEFAULT_TIMEOUT`]. A zero timeout is rejected.
    pub fn new(
        url: &str,
        token: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, ConfigError> {
        if url.is_empty() {
            return Err(ConfigError::invalid_config("url", "must not be empty"));
        }

        let address = Url::parse(url)
            .map_err(|e| ConfigError::invalid_config("url", format!("bad url format: {e}")))?;

        if address.cannot_be_a_base() {
            return Err(ConfigError::invalid_config(
                "url",
                format!("bad url format: {url} cannot serve as a base address"),
            ));
        }

        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::invalid_config(
                "timeout",
                "must be greater than zero",
            ));
        }

        Ok(Self {
            address,
            token: token.filter(|t| !t.is_empty()).map(str::to_string),
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Validated provider configuration.
#[derive(Debug, Clone)]
pub struct ConsulConfig {
    connection: StoreConnection,
    environment: String,
    use_cache: bool,
    normalization: KeyNormalization,
}

impl ConsulConfig {
    /// Create a configuration for `environment` served from `url`.
    ///
    /// Caching is on and keys are used as given until changed with the
    /// `with_*` methods.
    pub fn new(url: &str, environment: &str) -> Result<Self, ConfigError> {
        let connection = StoreConnection::new(url, None, None)?;
        Self::from_connection(connection, environment)
    }

    /// Create a configuration from an already validated connection.
    pub fn from_connection(
        connection: StoreConnection,
        environment: &str,
    ) -> Result<Self, ConfigError> {
        if environment.is_empty() {
            return Err(ConfigError::invalid_config(
                "environment",
                "must not be empty",
            ));
        }

        Ok(Self {
            connection,
            environment: environment.to_string(),
            use_cache: true,
            normalization: KeyNormalization::default(),
        })
    }

    /// Set the ACL token. An empty token clears it.
    pub fn with_token(mut self, token: &str) -> Self {
        self.connection.token = Some(token.to_string()).filter(|t| !t.is_empty());
        self
    }

    /// Set the store request timeout. A zero timeout restores
    /// [`DEFAULT_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.connection.timeout = if timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            timeout
        };
        self
    }

    /// Enable or disable the settings cache.
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the key normalization policy.
    pub fn with_normalization(mut self, normalization: KeyNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn connection(&self) -> &StoreConnection {
        &self.connection
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    pub fn normalization(&self) -> KeyNormalization {
        self.normalization
    }
}

/// Unvalidated options, as a host application would deserialize them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsulOptions {
    /// Absolute address of the Consul HTTP API
    pub url: String,

    /// ACL token
    pub token: Option<String>,

    /// Environment segment of every service key
    pub environment: String,

    /// Whether resolved settings are cached
    pub use_cache: bool,

    /// Store request timeout in seconds
    pub timeout_secs: u64,

    /// Key case policy
    pub normalization: KeyNormalization,
}

impl Default for ConsulOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            token: None,
            environment: String::new(),
            use_cache: true,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            normalization: KeyNormalization::default(),
        }
    }
}

impl TryFrom<ConsulOptions> for ConsulConfig {
    type Error = ConfigError;

    fn try_from(options: ConsulOptions) -> Result<Self, Self::Error> {
        let connection = StoreConnection::new(
            &options.url,
            options.token.as_deref(),
            Some(Duration::from_secs(options.timeout_secs)),
        )?;

        Ok(ConsulConfig::from_connection(connection, &options.environment)?
            .with_cache(options.use_cache)
            .with_normalization(options.normalization))
    }
}
