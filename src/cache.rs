// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory settings cache.
//!
//! Entries are published once per [`ServiceKey`] and never replaced, evicted
//! or expired for the lifetime of the cache. Published settings sit behind an
//! `Arc` and are never mutated.

use dashmap::DashMap;
use std::sync::Arc;

use crate::ServiceSettings;
use crate::key::ServiceKey;

/// Concurrent map from service key to resolved settings.
#[derive(Debug, Default)]
pub struct SettingsCache {
    entries: DashMap<ServiceKey, Arc<ServiceSettings>>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings published under `key`, if any.
    pub fn get(&self, key: &ServiceKey) -> Option<Arc<ServiceSettings>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Publish `settings` under `key` unless something is already there.
    ///
    /// Returns whichever value ends up cached: the one passed in if this call
    /// won, the earlier one otherwise.
    pub fn get_or_insert(&self, key: &ServiceKey, settings: ServiceSettings) -> Arc<ServiceSettings> {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(settings));
        Arc::clone(entry.value())
    }

    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
