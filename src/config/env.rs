// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment variable source for [`ConsulOptions`].
//!
//! `CONSUL_URL=http://consul:8500 CONSUL_USE_CACHE=false` becomes the flat
//! mapping `{"url": "...", "use_cache": "false"}`, which is then bound like
//! any other settings mapping.

use std::env;

use serde::de::DeserializeOwned;
use std::any::type_name;

use super::{ConfigError, ConsulOptions};
use crate::ServiceSettings;
use crate::binder;
use crate::debug_fmt;

/// Prefix used by [`ConsulOptions::from_env`].
pub const DEFAULT_ENV_PREFIX: &str = "CONSUL_";

impl ConsulOptions {
    /// Read options from `CONSUL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Read options from environment variables starting with `prefix`.
    ///
    /// Unset options keep their defaults; unknown variables are ignored.
    pub fn from_env_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        bind_prefixed(prefix)
    }
}

/// Bind the variables starting with `prefix` onto `T`.
pub(crate) fn bind_prefixed<T: DeserializeOwned>(prefix: &str) -> Result<T, ConfigError> {
    let vars = collect_prefixed(prefix, env::vars());
    debug_fmt!(
        "EnvOptions",
        "Read {} variable(s) with prefix {} for {}",
        vars.len(),
        prefix,
        type_name::<T>()
    );
    binder::bind(&vars)
}

/// Strip the prefix and lowercase the remainder for consistent matching.
fn collect_prefixed<I>(prefix: &str, vars: I) -> ServiceSettings
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest.to_lowercase(), value))
        })
        .collect()
}
