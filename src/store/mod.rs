// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Backing-store access.
//!
//! Two seams live here:
//!
//! - [`KvClient`] is the raw capability: list every entry under a prefix.
//!   [`ConsulKvClient`] implements it against Consul's HTTP API; tests plug in
//!   in-memory clients through a [`KvClientFactory`].
//! - [`ConfigurationStore`] is what the provider talks to: given a
//!   [`ServiceKey`], return the service's flat settings or `None`.
//!   [`ConsulConfigurationStore`] adapts a `KvClient` to it.

mod consul;

#[cfg(test)]
mod tests;

pub use consul::ConsulKvClient;

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::ServiceSettings;
use crate::config::{ConfigError, ConsulConfig, StoreConnection};
use crate::key::{KeyNormalization, ServiceKey};
use crate::{debug_fmt, trace_fmt};

/// A raw entry as returned by a prefix listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// Full key, prefix included.
    pub key: String,
    /// Raw payload; `None` for keys without a value.
    pub value: Option<Vec<u8>>,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: Option<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// List-by-prefix access to a key/value store.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// Return every entry whose key starts with `prefix`, or `None` when the
    /// store has nothing under it.
    async fn list(&self, prefix: &str) -> Result<Option<Vec<KvEntry>>, ConfigError>;
}

/// Creates a [`KvClient`] for one lookup. The client is dropped when the
/// lookup finishes.
pub type KvClientFactory =
    Arc<dyn Fn(&StoreConnection) -> Result<Box<dyn KvClient>, ConfigError> + Send + Sync>;

/// Source of per-service settings.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Fetch the settings stored under `key`.
    ///
    /// Returns `Ok(None)` when nothing is stored there. Store failures are
    /// returned as they are; no retry happens at this layer.
    async fn get_service_config(
        &self,
        key: &ServiceKey,
        cancel: &CancellationToken,
    ) -> Result<Option<ServiceSettings>, ConfigError>;
}

/// [`ConfigurationStore`] backed by a key/value client, Consul by default.
pub struct ConsulConfigurationStore {
    connection: StoreConnection,
    normalization: KeyNormalization,
    client_factory: KvClientFactory,
}

impl fmt::Debug for ConsulConfigurationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsulConfigurationStore")
            .field("connection", &self.connection)
            .field("normalization", &self.normalization)
            .finish_non_exhaustive()
    }
}

impl ConsulConfigurationStore {
    /// Create a store talking to Consul over HTTP.
    pub fn new(config: &ConsulConfig) -> Self {
        Self::with_factory(config, ConsulKvClient::factory())
    }

    /// Create a store whose clients come from `client_factory`.
    pub fn with_factory(config: &ConsulConfig, client_factory: KvClientFactory) -> Self {
        Self::from_connection(
            config.connection().clone(),
            config.normalization(),
            client_factory,
        )
    }

    /// Create a store from a bare connection, without an environment.
    pub fn from_connection(
        connection: StoreConnection,
        normalization: KeyNormalization,
        client_factory: KvClientFactory,
    ) -> Self {
        Self {
            connection,
            normalization,
            client_factory,
        }
    }

    pub fn connection(&self) -> &StoreConnection {
        &self.connection
    }

    /// Fetch the settings of `service` in `environment`, optionally scoped to
    /// `hosting`, building the key with this store's normalization policy.
    ///
    /// An empty `environment` is rejected with [`ConfigError::InvalidConfig`]
    /// before any client is created.
    pub async fn fetch_service_config(
        &self,
        environment: &str,
        service: &str,
        hosting: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<ServiceSettings>, ConfigError> {
        if environment.is_empty() {
            return Err(ConfigError::invalid_config(
                "environment",
                "must not be empty",
            ));
        }
        let key = ServiceKey::new(environment, service, hosting, self.normalization)?;
        self.get_service_config(&key, cancel).await
    }
}

#[async_trait]
impl ConfigurationStore for ConsulConfigurationStore {
    async fn get_service_config(
        &self,
        key: &ServiceKey,
        cancel: &CancellationToken,
    ) -> Result<Option<ServiceSettings>, ConfigError> {
        let client = (self.client_factory)(&self.connection)?;

        trace_fmt!("ConsulStore", "Listing entries under {}", key);
        let entries = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConfigError::Cancelled),
            listed = client.list(key.as_str()) => listed?,
        };

        let Some(entries) = entries.filter(|e| !e.is_empty()) else {
            debug_fmt!("ConsulStore", "No entries under {}", key);
            return Ok(None);
        };

        let settings = to_settings(key, entries);
        if settings.is_empty() {
            debug_fmt!("ConsulStore", "Only the folder entry exists under {}", key);
            return Ok(None);
        }

        debug_fmt!(
            "ConsulStore",
            "Fetched {} setting(s) under {}",
            settings.len(),
            key
        );
        Ok(Some(settings))
    }
}

/// Strip the service prefix from every entry and decode its payload as UTF-8.
/// The placeholder entry for the prefix itself is dropped.
fn to_settings(key: &ServiceKey, entries: Vec<KvEntry>) -> ServiceSettings {
    entries
        .into_iter()
        .filter_map(|entry| {
            let name = key.local_name(&entry.key);
            if name.is_empty() {
                return None;
            }
            let value = entry
                .value
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                .unwrap_or_default();
            Some((name.to_string(), value))
        })
        .collect()
}
