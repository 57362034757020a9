// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binding flat settings onto typed structs.
//!
//! The target is any struct implementing [`serde::Deserialize`]. Its field
//! names (after `rename`/`rename_all`) are matched against the setting names:
//!
//! 1. an exact match wins;
//! 2. otherwise the first field, in declaration order, that matches ignoring
//!    case is used;
//! 3. settings matching no field are skipped.
//!
//! Each matched value is decoded into the field's declared type: numbers and
//! booleans are parsed, strings are copied, and collections or nested structs
//! are read as JSON documents. Fields without a matching setting take their
//! `#[serde(default)]` value.
//!
//! ```rust
//! use consul_settings::{binder, ServiceSettings};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Default, Deserialize)]
//! #[serde(default, rename_all = "PascalCase")]
//! struct MangoSettings {
//!     api_key: String,
//!     retries: u32,
//!     hosts: Vec<String>,
//! }
//!
//! let settings: ServiceSettings = [
//!     ("apikey".to_string(), "secret".to_string()),
//!     ("Retries".to_string(), "3".to_string()),
//!     ("Hosts".to_string(), r#"["a", "b"]"#.to_string()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let bound: MangoSettings = binder::bind(&settings)?;
//! assert_eq!(bound.api_key, "secret");
//! assert_eq!(bound.retries, 3);
//! assert_eq!(bound.hosts.len(), 2);
//! # Ok::<(), consul_settings::ConfigError>(())
//! ```

mod de;


use serde::de::DeserializeOwned;
use serde::de::value::MapDeserializer;
use std::any::type_name;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::ServiceSettings;
use crate::config::ConfigError;
use crate::trace_fmt;
use de::{DecodeError, RawValue};

/// Bind `settings` onto a new `T`.
///
/// Fails with [`ConfigError::ParseError`] when `T` is not a struct with named
/// fields, when a value cannot be decoded into its field's type, or when a
/// field without a default has no matching setting.
pub fn bind<T: DeserializeOwned>(settings: &ServiceSettings) -> Result<T, ConfigError> {
    let fields = de::field_names::<T>().ok_or_else(|| {
        ConfigError::ParseError(format!(
            "{} cannot be bound: only structs with named fields are supported",
            type_name::<T>()
        ))
    })?;

    let matched = match_fields(fields, settings);
    trace_fmt!(
        "Binder",
        "Binding {} of {} setting(s) onto {}",
        matched.len(),
        settings.len(),
        type_name::<T>()
    );

    let entries = matched
        .into_iter()
        .map(|(field, candidate)| (field, RawValue::new(candidate.key, candidate.value)));

    T::deserialize(MapDeserializer::<_, DecodeError>::new(entries))
        .map_err(|e| ConfigError::ParseError(format!("{}: {e}", type_name::<T>())))
}

/// A setting competing for a field.
#[derive(Debug)]
struct Candidate<'a> {
    key: &'a str,
    value: &'a str,
    exact: bool,
}

impl Candidate<'_> {
    /// Exact matches beat case-insensitive ones; ties go to the smaller key so
    /// the outcome does not depend on map iteration order.
    fn outranks(&self, other: &Candidate<'_>) -> bool {
        match (self.exact, other.exact) {
            (true, false) => true,
            (false, true) => false,
            _ => self.key < other.key,
        }
    }
}

fn match_fields<'a>(
    fields: &'static [&'static str],
    settings: &'a ServiceSettings,
) -> BTreeMap<&'static str, Candidate<'a>> {
    let mut matched = BTreeMap::new();

    for (key, value) in settings {
        let Some((field, exact)) = resolve_field(fields, key) else {
            trace_fmt!("Binder", "No field matches setting '{}', skipping", key);
            continue;
        };

        let candidate = Candidate {
            key,
            value,
            exact,
        };

        match matched.entry(field) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if candidate.outranks(slot.get()) {
                    slot.insert(candidate);
                }
            }
        }
    }

    matched
}

fn resolve_field(fields: &'static [&'static str], key: &str) -> Option<(&'static str, bool)> {
    if let Some(field) = fields.iter().find(|field| **field == key) {
        return Some((*field, true));
    }

    fields
        .iter()
        .find(|field| eq_ignore_case(field, key))
        .map(|field| (*field, false))
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
