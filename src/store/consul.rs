// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Consul HTTP key/value client.
//!
//! Only one endpoint is used: `GET /v1/kv/{prefix}?recurse=true`, which
//! answers with every key under the prefix and base64-encoded values, or
//! `404` when there is none.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::sync::Arc;

use super::{KvClient, KvClientFactory, KvEntry};
use crate::config::{ConfigError, StoreConnection};
use crate::trace_fmt;

const TOKEN_HEADER: &str = "X-Consul-Token";

/// Raw KV pair as Consul serializes it. Other attributes are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KvPair {
    key: String,
    value: Option<String>,
}

/// [`KvClient`] for Consul's HTTP API.
#[derive(Debug, Clone)]
pub struct ConsulKvClient {
    http: Client,
    address: Url,
    token: Option<String>,
}

impl ConsulKvClient {
    /// Build a client for `connection`. The connection timeout applies to
    /// each request as a whole.
    pub fn connect(connection: &StoreConnection) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .user_agent(concat!("consul-settings/", env!("CARGO_PKG_VERSION")))
            .timeout(connection.timeout())
            .build()?;

        Ok(Self {
            http,
            address: connection.address().clone(),
            token: connection.token().map(str::to_string),
        })
    }

    /// Factory producing a fresh `ConsulKvClient` per lookup.
    pub fn factory() -> KvClientFactory {
        Arc::new(
            |connection: &StoreConnection| -> Result<Box<dyn KvClient>, ConfigError> {
                Ok(Box::new(ConsulKvClient::connect(connection)?))
            },
        )
    }

    fn list_url(&self, prefix: &str) -> String {
        let base = self.address.as_str().trim_end_matches('/');
        let path = prefix
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{base}/v1/kv/{path}?recurse=true")
    }
}

#[async_trait]
impl KvClient for ConsulKvClient {
    async fn list(&self, prefix: &str) -> Result<Option<Vec<KvEntry>>, ConfigError> {
        let url = self.list_url(prefix);
        trace_fmt!("ConsulKvClient", "GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfigError::provider_error(
                "consul",
                format!("unexpected status {status} listing '{prefix}': {body}"),
            ));
        }

        let pairs: Option<Vec<KvPair>> = response.json().await?;
        pairs
            .map(|pairs| pairs.into_iter().map(decode_pair).collect::<Result<Vec<_>, _>>())
            .transpose()
    }
}

fn decode_pair(pair: KvPair) -> Result<KvEntry, ConfigError> {
    let value = match pair.value {
        Some(encoded) => Some(STANDARD.decode(encoded.as_bytes()).map_err(|e| {
            ConfigError::ParseError(format!("invalid base64 value for '{}': {e}", pair.key))
        })?),
        None => None,
    };

    Ok(KvEntry::new(pair.key, value))
}
