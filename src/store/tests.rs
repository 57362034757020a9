// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#[cfg(test)]
mod tests {
    use crate::config::{ConfigError, ConsulConfig, StoreConnection};
    use crate::key::{KeyNormalization, ServiceKey};
    use crate::store::{
        ConfigurationStore, ConsulConfigurationStore, ConsulKvClient, KvClient, KvClientFactory,
        KvEntry,
    };

    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // In-memory client recording the prefixes it was asked for
    struct FakeKvClient {
        entries: Option<Vec<KvEntry>>,
        prefixes: Arc<Mutex<Vec<String>>>,
        dropped: Arc<AtomicUsize>,
        hang: bool,
        fail: bool,
    }

    impl Drop for FakeKvClient {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl KvClient for FakeKvClient {
        async fn list(&self, prefix: &str) -> Result<Option<Vec<KvEntry>>, ConfigError> {
            self.prefixes.lock().unwrap().push(prefix.to_string());
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(ConfigError::provider_error("fake", "connection refused"));
            }
            Ok(self.entries.clone())
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        entries: Option<Vec<KvEntry>>,
        hang: bool,
        fail: bool,
        created: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
        prefixes: Arc<Mutex<Vec<String>>>,
    }

    impl FakeFactory {
        fn returning(entries: Option<Vec<KvEntry>>) -> Self {
            Self {
                entries,
                ..Self::default()
            }
        }

        fn build(&self) -> KvClientFactory {
            let entries = self.entries.clone();
            let (hang, fail) = (self.hang, self.fail);
            let created = self.created.clone();
            let dropped = self.dropped.clone();
            let prefixes = self.prefixes.clone();

            Arc::new(move |_connection: &StoreConnection| -> Result<Box<dyn KvClient>, ConfigError> {
                created.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(FakeKvClient {
                    entries: entries.clone(),
                    prefixes: prefixes.clone(),
                    dropped: dropped.clone(),
                    hang,
                    fail,
                }))
            })
        }
    }

    fn config() -> ConsulConfig {
        ConsulConfig::new("http://localhost:8500", "debug").unwrap()
    }

    fn entry(key: &str, value: &str) -> KvEntry {
        KvEntry::new(key, Some(value.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn test_fetch_strips_prefix_and_decodes_values() {
        let factory = FakeFactory::returning(Some(vec![
            entry("debug/mango/key1", "value1"),
            entry("debug/mango/nested/key2", "héllo"),
            KvEntry::new("debug/mango/empty", None),
        ]));
        let store = ConsulConfigurationStore::with_factory(&config(), factory.build());

        let settings = store
            .fetch_service_config("debug", "mango", None, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(settings.len(), 3);
        assert_eq!(settings["key1"], "value1");
        assert_eq!(settings["nested/key2"], "héllo");
        assert_eq!(settings["empty"], "");
        assert_eq!(*factory.prefixes.lock().unwrap(), vec!["debug/mango/"]);
    }

    #[tokio::test]
    async fn test_fetch_with_hosting_uses_hosting_prefix() {
        let factory = FakeFactory::returning(Some(vec![entry("debug/azure/mango/key1", "value1")]));
        let store = ConsulConfigurationStore::with_factory(&config(), factory.build());

        let settings = store
            .fetch_service_config("debug", "mango", Some("azure"), &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(settings["key1"], "value1");
        assert_eq!(*factory.prefixes.lock().unwrap(), vec!["debug/azure/mango/"]);
    }

    #[tokio::test]
    async fn test_fetch_lowercases_prefix_when_configured() {
        let factory = FakeFactory::returning(Some(vec![entry("debug/mango/key1", "value1")]));
        let store = ConsulConfigurationStore::with_factory(
            &config().with_normalization(KeyNormalization::Lowercase),
            factory.build(),
        );

        let settings = store
            .fetch_service_config("Debug", "Mango", None, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(settings["key1"], "value1");
        assert_eq!(*factory.prefixes.lock().unwrap(), vec!["debug/mango/"]);
    }

    #[tokio::test]
    async fn test_fetch_returns_none_for_missing_or_empty_result() {
        for entries in [None, Some(Vec::new()), Some(vec![KvEntry::new("debug/mango/", None)])] {
            let factory = FakeFactory::returning(entries);
            let store = ConsulConfigurationStore::with_factory(&config(), factory.build());

            let result = store
                .fetch_service_config("debug", "mango", None, &CancellationToken::new())
                .await
                .unwrap();

            assert!(result.is_none());
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_service_before_connecting() {
        let factory = FakeFactory::default();
        let store = ConsulConfigurationStore::with_factory(&config(), factory.build());

        let result = store
            .fetch_service_config("debug", "", Some("hosting"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ConfigError::MissingArgument("service"))));
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_rejects_empty_environment_before_connecting() {
        let factory = FakeFactory::default();
        let store = ConsulConfigurationStore::with_factory(
            &config().with_normalization(KeyNormalization::Lowercase),
            factory.build(),
        );

        let result = store
            .fetch_service_config("", "mango", Some(""), &CancellationToken::new())
            .await;

        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfig { ref field, .. }) if field == "environment"
        ));
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
        assert!(factory.prefixes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_client_is_created_and_released_per_call() {
        let factory = FakeFactory::returning(Some(vec![entry("debug/mango/key1", "value1")]));
        let store = ConsulConfigurationStore::with_factory(&config(), factory.build());
        let key = ServiceKey::new("debug", "mango", None, KeyNormalization::Preserve).unwrap();

        for _ in 0..3 {
            store
                .get_service_config(&key, &CancellationToken::new())
                .await
                .unwrap();
        }

        assert_eq!(factory.created.load(Ordering::SeqCst), 3);
        assert_eq!(factory.dropped.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_store_failure_is_propagated_and_client_released() {
        let factory = FakeFactory {
            fail: true,
            ..FakeFactory::default()
        };
        let store = ConsulConfigurationStore::with_factory(&config(), factory.build());

        let result = store
            .fetch_service_config("debug", "mango", None, &CancellationToken::new())
            .await;

        match result {
            Err(ConfigError::ProviderError { provider, message }) => {
                assert_eq!(provider, "fake");
                assert_eq!(message, "connection refused");
            }
            other => panic!("Expected ProviderError, got {other:?}"),
        }
        assert_eq!(factory.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_the_query() {
        let factory = FakeFactory {
            hang: true,
            ..FakeFactory::default()
        };
        let store = ConsulConfigurationStore::with_factory(&config(), factory.build());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = store
            .fetch_service_config("debug", "mango", None, &cancel)
            .await;

        assert!(matches!(result, Err(ConfigError::Cancelled)));
        assert_eq!(factory.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_factory_error_is_propagated() {
        let factory: KvClientFactory = Arc::new(
            |_: &StoreConnection| -> Result<Box<dyn KvClient>, ConfigError> {
                Err(ConfigError::Other("no client".to_string()))
            },
        );
        let store = ConsulConfigurationStore::with_factory(&config(), factory);

        let result = store
            .fetch_service_config("debug", "mango", None, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ConfigError::Other(_))));
    }

    // ---- Consul HTTP client ------------------------------------------------

    fn connection(uri: &str, token: Option<&str>) -> StoreConnection {
        StoreConnection::new(uri, token, Some(Duration::from_secs(2))).unwrap()
    }

    #[tokio::test]
    async fn test_consul_client_lists_and_decodes() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/debug/mango/"))
            .and(query_param("recurse", "true"))
            .and(header("X-Consul-Token", "token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "Key": "debug/mango/key1", "Value": "dmFsdWUx", "Flags": 0, "ModifyIndex": 12 },
                { "Key": "debug/mango/limits", "Value": "eyJtYXgiOjV9" },
                { "Key": "debug/mango/empty", "Value": null }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ConsulKvClient::connect(&connection(&server.uri(), Some("token"))).unwrap();
        let entries = client.list("debug/mango/").await.unwrap().unwrap();

        assert_eq!(
            entries,
            vec![
                KvEntry::new("debug/mango/key1", Some(b"value1".to_vec())),
                KvEntry::new("debug/mango/limits", Some(br#"{"max":5}"#.to_vec())),
                KvEntry::new("debug/mango/empty", None),
            ]
        );
    }

    #[tokio::test]
    async fn test_consul_client_not_found_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/debug/unknown/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ConsulKvClient::connect(&connection(&server.uri(), None)).unwrap();
        let entries = client.list("debug/unknown/").await.unwrap();

        assert!(entries.is_none());
    }

    #[tokio::test]
    async fn test_consul_client_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("ACL not found"))
            .mount(&server)
            .await;

        let client = ConsulKvClient::connect(&connection(&server.uri(), Some("bad"))).unwrap();
        let err = client.list("debug/mango/").await.unwrap_err();

        match err {
            ConfigError::ProviderError { provider, message } => {
                assert_eq!(provider, "consul");
                assert!(message.contains("403"), "{message}");
                assert!(message.contains("ACL not found"), "{message}");
            }
            other => panic!("Expected ProviderError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_consul_client_invalid_base64() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{ "Key": "debug/mango/key1", "Value": "%%%" }])),
            )
            .mount(&server)
            .await;

        let client = ConsulKvClient::connect(&connection(&server.uri(), None)).unwrap();
        let result = client.list("debug/mango/").await;

        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_consul_client_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let slow = StoreConnection::new(&server.uri(), None, Some(Duration::from_millis(100)))
            .unwrap();
        let client = ConsulKvClient::connect(&slow).unwrap();
        let result = client.list("debug/mango/").await;

        match result {
            Err(ConfigError::Http(e)) => assert!(e.is_timeout()),
            other => panic!("Expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_consul_client_keeps_base_path_and_encodes_segments() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/consul/v1/kv/debug/my%20service/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "Key": "debug/my service/key1", "Value": "dmFsdWUx" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/consul/", server.uri());
        let client = ConsulKvClient::connect(&connection(&base, None)).unwrap();
        let entries = client.list("debug/my service/").await.unwrap().unwrap();

        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_consul_store_end_to_end() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/kv/debug/mango/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "Key": "debug/mango/", "Value": null },
                { "Key": "debug/mango/ApiKey", "Value": "c2VjcmV0S2V5" }
            ])))
            .mount(&server)
            .await;

        let config = ConsulConfig::new(&server.uri(), "debug").unwrap();
        let store = ConsulConfigurationStore::new(&config);

        let settings = store
            .fetch_service_config("debug", "mango", None, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(settings.len(), 1);
        assert_eq!(settings["ApiKey"], "secretKey");
    }
}
