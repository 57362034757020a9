// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! consul-settings - per-service settings from Consul's key/value store
//!
//! Settings for a service live under `{environment}/{service}/` (optionally
//! `{environment}/{hosting}/{service}/`) in Consul. This crate fetches that
//! subtree, strips the prefix and hands back a flat key/value mapping, or the
//! same mapping bound onto a typed struct.
//!
//! # Overview
//!
//! - [`ExternalConfigurationProvider`] is the entry point. It owns a cache and a
//!   [`ConfigurationStore`].
//! - [`ConsulConfigurationStore`] talks to Consul through a [`KvClient`] built per
//!   lookup by a [`KvClientFactory`]; [`ConsulKvClient`] is the HTTP one.
//! - [`binder`] maps flat settings onto any `serde::Deserialize` struct, matching
//!   keys case-insensitively.
//!
//! # Example
//!
//! ```rust,no_run
//! use consul_settings::{ConsulConfig, ExternalConfigurationProvider};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct MangoSettings {
//!     key1: String,
//!     retries: u32,
//! }
//!
//! # async fn run() -> Result<(), consul_settings::ConfigError> {
//! let config = ConsulConfig::new("http://localhost:8500", "debug")?;
//! let provider = ExternalConfigurationProvider::from_config(&config)?;
//!
//! if let Some(settings) = provider.get_service_config("mango", None).await? {
//!     println!("key1 = {:?}", settings.get("key1"));
//! }
//!
//! let typed: Option<MangoSettings> = provider.get_service_config_as("mango", Some("eu")).await?;
//! # let _ = typed;
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod cache;
pub mod config;
pub mod key;
pub mod logging;
pub mod provider;
pub mod store;

/// Flat settings for one service: key names with the service prefix removed.
pub type ServiceSettings = std::collections::HashMap<String, String>;

// Re-export key types at the crate root for convenience
pub use cache::SettingsCache;
pub use config::{ConfigError, ConsulConfig, ConsulOptions, StoreConnection};
pub use key::{KeyNormalization, ServiceKey};
pub use provider::ExternalConfigurationProvider;
pub use store::{
    ConfigurationStore, ConsulConfigurationStore, ConsulKvClient, KvClient, KvClientFactory,
    KvEntry,
};
pub use tokio_util::sync::CancellationToken;
