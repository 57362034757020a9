// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types shared by every layer of the settings pipeline.

use std::fmt;
use thiserror::Error;

/// Errors that can occur while configuring the provider or resolving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration value was missing or malformed. Raised at construction
    /// time, before any store query runs.
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// A required call argument was empty.
    #[error("missing argument: {0} must not be empty")]
    MissingArgument(&'static str),

    /// The HTTP transport to the store failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered, but not successfully.
    #[error("provider error: {provider}: {message}")]
    ProviderError { provider: String, message: String },

    /// The lookup was cancelled while the store query was in flight.
    #[error("settings lookup cancelled")]
    Cancelled,

    /// A value could not be decoded or bound onto its target type.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A generic error.
    #[error("{0}")]
    Other(String),
}

impl ConfigError {
    /// Create a new provider error.
    pub fn provider_error<P: fmt::Display, M: fmt::Display>(provider: P, message: M) -> Self {
        Self::ProviderError {
            provider: provider.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a new invalid-configuration error.
    pub fn invalid_config<F: fmt::Display, M: fmt::Display>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
