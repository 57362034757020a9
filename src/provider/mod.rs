// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Settings resolution.
//!
//! [`ExternalConfigurationProvider`] turns `(service, hosting)` into a
//! [`ServiceKey`], answers from its cache when it can and otherwise asks the
//! [`ConfigurationStore`]. Results can be returned as the flat mapping or
//! bound onto a typed struct.
//!
//! Concurrent first lookups of the same key may each query the store; the
//! cache guarantees they all end up returning the same published value.


use serde::de::DeserializeOwned;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::ServiceSettings;
use crate::binder;
use crate::cache::SettingsCache;
use crate::config::{ConfigError, ConsulConfig};
use crate::key::{KeyNormalization, ServiceKey};
use crate::store::{ConfigurationStore, ConsulConfigurationStore, ConsulKvClient, KvClientFactory};
use crate::{debug_fmt, trace_fmt};

/// Resolves per-service settings for one environment.
pub struct ExternalConfigurationProvider {
    store: Arc<dyn ConfigurationStore>,
    environment: String,
    use_cache: bool,
    normalization: KeyNormalization,
    cache: SettingsCache,
}

impl fmt::Debug for ExternalConfigurationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalConfigurationProvider")
            .field("environment", &self.environment)
            .field("use_cache", &self.use_cache)
            .field("normalization", &self.normalization)
            .field("cached", &self.cache.len())
            .finish_non_exhaustive()
    }
}

impl ExternalConfigurationProvider {
    /// Create a caching provider for `environment` on top of `store`.
    pub fn new(
        store: Arc<dyn ConfigurationStore>,
        environment: &str,
    ) -> Result<Self, ConfigError> {
        if environment.is_empty() {
            return Err(ConfigError::invalid_config(
                "environment",
                "must not be empty",
            ));
        }

        Ok(Self {
            store,
            environment: environment.to_string(),
            use_cache: true,
            normalization: KeyNormalization::default(),
            cache: SettingsCache::new(),
        })
    }

    /// Create a provider backed by Consul over HTTP.
    pub fn from_config(config: &ConsulConfig) -> Result<Self, ConfigError> {
        Self::from_config_with_factory(config, ConsulKvClient::factory())
    }

    /// Create a provider backed by clients from `client_factory`.
    pub fn from_config_with_factory(
        config: &ConsulConfig,
        client_factory: KvClientFactory,
    ) -> Result<Self, ConfigError> {
        let store = ConsulConfigurationStore::with_factory(config, client_factory);
        Ok(Self::new(Arc::new(store), config.environment())?
            .with_cache(config.use_cache())
            .with_normalization(config.normalization()))
    }

    /// Enable or disable caching.
    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    /// Set the key normalization policy used for both cache and store.
    pub fn with_normalization(mut self, normalization: KeyNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn uses_cache(&self) -> bool {
        self.use_cache
    }

    pub fn normalization(&self) -> KeyNormalization {
        self.normalization
    }

    pub fn cache(&self) -> &SettingsCache {
        &self.cache
    }

    /// Build the key this provider uses for `service` and `hosting`.
    pub fn service_key(
        &self,
        service: &str,
        hosting: Option<&str>,
    ) -> Result<ServiceKey, ConfigError> {
        ServiceKey::new(&self.environment, service, hosting, self.normalization)
    }

    /// Flat settings for `service`, or `None` when the store has none.
    pub async fn get_service_config(
        &self,
        service: &str,
        hosting: Option<&str>,
    ) -> Result<Option<Arc<ServiceSettings>>, ConfigError> {
        self.get_service_config_with_cancel(service, hosting, &CancellationToken::new())
            .await
    }

    /// Like [`get_service_config`](Self::get_service_config), aborting the
    /// store query when `cancel` fires. Cache hits are returned regardless.
    pub async fn get_service_config_with_cancel(
        &self,
        service: &str,
        hosting: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<ServiceSettings>>, ConfigError> {
        let key = self.service_key(service, hosting)?;

        if self.use_cache {
            if let Some(cached) = self.cache.get(&key) {
                trace_fmt!("SettingsProvider", "Cache hit for {}", key);
                return Ok(Some(cached));
            }
        }

        debug_fmt!("SettingsProvider", "Resolving {} from store", key);
        let settings = match self.store.get_service_config(&key, cancel).await? {
            Some(settings) if !settings.is_empty() => settings,
            _ => return Ok(None),
        };

        if self.use_cache {
            Ok(Some(self.cache.get_or_insert(&key, settings)))
        } else {
            Ok(Some(Arc::new(settings)))
        }
    }

    /// Settings for `service` bound onto `T`, or `None` when the store has none.
    ///
    /// Fields without a matching setting need a fallback: mark the struct (or
    /// the field) `#[serde(default)]`, or make the field an `Option`. Deriving
    /// `Default` alone is not enough; a required field left unmatched fails
    /// with [`ConfigError::ParseError`].
    pub async fn get_service_config_as<T: DeserializeOwned>(
        &self,
        service: &str,
        hosting: Option<&str>,
    ) -> Result<Option<T>, ConfigError> {
        self.get_service_config_as_with_cancel(service, hosting, &CancellationToken::new())
            .await
    }

    /// Typed form of [`get_service_config_with_cancel`](Self::get_service_config_with_cancel).
    pub async fn get_service_config_as_with_cancel<T: DeserializeOwned>(
        &self,
        service: &str,
        hosting: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ConfigError> {
        let Some(settings) = self
            .get_service_config_with_cancel(service, hosting, cancel)
            .await?
        else {
            return Ok(None);
        };

        trace_fmt!("SettingsProvider", "Binding {} onto {}", service, type_name::<T>());
        binder::bind(&settings).map(Some)
    }
}
