// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service key construction.
//!
//! Settings live in the store under `{environment}/{service}/`, or under
//! `{environment}/{hosting}/{service}/` when a hosting segment is given. The
//! same [`ServiceKey`] value is used as the cache key and as the store prefix.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfigError;

/// How key segments are normalized before they are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyNormalization {
    /// Segments are used exactly as given.
    #[default]
    Preserve,
    /// Every segment, environment included, is lowercased.
    Lowercase,
}

impl KeyNormalization {
    fn apply(self, segment: &str) -> String {
        match self {
            KeyNormalization::Preserve => segment.to_string(),
            KeyNormalization::Lowercase => segment.to_lowercase(),
        }
    }
}

/// Fully-qualified store prefix for one service. Always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Build the key for `service` in `environment`, optionally scoped to a
    /// `hosting` segment. An empty `hosting` is treated as absent.
    pub fn new(
        environment: &str,
        service: &str,
        hosting: Option<&str>,
        normalization: KeyNormalization,
    ) -> Result<Self, ConfigError> {
        if service.is_empty() {
            return Err(ConfigError::MissingArgument("service"));
        }

        let environment = normalization.apply(environment);
        let service = normalization.apply(service);

        let key = match hosting.filter(|h| !h.is_empty()) {
            Some(hosting) => format!(
                "{environment}/{}/{service}/",
                normalization.apply(hosting)
            ),
            None => format!("{environment}/{service}/"),
        };

        Ok(Self(key))
    }

    /// The key as it is sent to the store.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip this prefix from a full store key, yielding the local setting name.
    pub fn local_name<'a>(&self, full_key: &'a str) -> &'a str {
        full_key.strip_prefix(self.0.as_str()).unwrap_or(full_key)
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
