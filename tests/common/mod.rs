// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared helpers for the integration tests: Consul response fixtures served
//! from a wiremock server.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One KV pair the way Consul serializes it.
#[allow(dead_code)]
pub fn kv_pair(key: &str, value: Option<&str>) -> Value {
    json!({
        "LockIndex": 0,
        "Key": key,
        "Flags": 0,
        "Value": value.map(|v| STANDARD.encode(v)),
        "CreateIndex": 100,
        "ModifyIndex": 200
    })
}

/// Serve `pairs` for a recursive listing of `prefix`, expecting `calls` hits.
#[allow(dead_code)]
pub async fn mount_listing(server: &MockServer, prefix: &str, pairs: Vec<Value>, calls: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/kv/{prefix}")))
        .and(query_param("recurse", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(pairs)))
        .expect(calls)
        .mount(server)
        .await;
}

/// Answer a recursive listing of `prefix` with `404`, as Consul does for a
/// prefix without keys.
#[allow(dead_code)]
pub async fn mount_missing(server: &MockServer, prefix: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/kv/{prefix}")))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

/// The listing Consul returns for `debug/mango/` in most tests.
#[allow(dead_code)]
pub fn mango_listing() -> Vec<Value> {
    vec![
        kv_pair("debug/mango/", None),
        kv_pair("debug/mango/key1", Some("value1")),
        kv_pair("debug/mango/Retries", Some("3")),
        kv_pair("debug/mango/endpoints", Some(r#"["a","b"]"#)),
        kv_pair("debug/mango/notes", None),
    ]
}
