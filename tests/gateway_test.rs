//! End-to-end gateway tests against mocked upstreams.
//!
//! The catalogue and the workflow runner are wiremock servers; storage and
//! the ingest queue are in-memory test doubles.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use torii_gatewayr::ades::AdesClient;
use torii_gatewayr::airbus::AirbusClient;
use torii_gatewayr::auth::jwt::JwtAuthenticator;
use torii_gatewayr::authz::WorkspaceGuard;
use torii_gatewayr::catalogue::StacClient;
use torii_gatewayr::config::{
    AdesConfig, AirbusConfig, AuthSettings, CatalogueConfig, Config, MetricsConfig, OpaSettings,
    PlanetConfig, PulsarConfig, RateLimitConfig, ServerConfig, StorageConfig,
};
use torii_gatewayr::ingest::{IngestError, IngestMessage, IngestQueue};
use torii_gatewayr::server::handlers::Gateway;
use torii_gatewayr::server::rate_limit::RateLimiter;
use torii_gatewayr::storage::{ObjectStore, StorageError};

const SECRET: &str = "gateway-test-secret";
const BUCKET: &str = "test-bucket";

/// In-memory object store recording puts and deletes
#[derive(Default)]
struct MemoryStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStore {
    fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .cloned()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{key}"), body);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(&format!("{bucket}/{key}"));
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.object(bucket, key)
            .ok_or_else(|| StorageError::OperationFailed(format!("no such key {key}")))
    }

    async fn presigned_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://{bucket}.s3.test/{key}?X-Amz-Expires={}",
            expires_in.as_secs()
        ))
    }
}

/// Ingest queue recording published messages
#[derive(Default)]
struct RecordingQueue {
    messages: Mutex<Vec<IngestMessage>>,
}

impl RecordingQueue {
    fn published(&self) -> Vec<IngestMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestQueue for RecordingQueue {
    async fn publish(&self, message: IngestMessage) -> Result<(), IngestError> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

fn test_config(catalogue_url: &str, ades_url: &str, rate_limit: RateLimitConfig) -> Config {
    Config {
        server: ServerConfig {
            address: "127.0.0.1:0".into(),
        },
        auth: AuthSettings {
            secret: Some(SECRET.into()),
            ..Default::default()
        },
        opa: OpaSettings::default(),
        storage: StorageConfig {
            bucket: BUCKET.into(),
            region: "eu-west-2".into(),
            endpoint: None,
            presign_expiry_seconds: 3600,
        },
        pulsar: PulsarConfig {
            url: "pulsar://localhost:6650".into(),
            topic: "transformed".into(),
            producer_name: "torii-gatewayr".into(),
        },
        ades: AdesConfig {
            url: ades_url.into(),
            cluster_prefix: "test".into(),
        },
        catalogue: CatalogueConfig {
            public_url: catalogue_url.into(),
            root_path: "/api/catalogue".into(),
        },
        airbus: AirbusConfig::default(),
        planet: PlanetConfig::default(),
        rate_limit,
        metrics: MetricsConfig::default(),
    }
}

struct Harness {
    gateway: Gateway,
    store: Arc<MemoryStore>,
    queue: Arc<RecordingQueue>,
}

fn harness(config: Config) -> Harness {
    let airbus = AirbusClient::new(config.airbus.clone());
    harness_with_airbus(config, airbus)
}

fn harness_with_airbus(config: Config, airbus: AirbusClient) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let queue = Arc::new(RecordingQueue::default());
    let gateway = Gateway::new(
        Arc::new(JwtAuthenticator::new_hs256(
            SECRET,
            &config.auth.workspaces_claim,
        )),
        WorkspaceGuard::new(),
        store.clone(),
        queue.clone(),
        StacClient::new(),
        AdesClient::new(
            config.ades.clone(),
            config.storage.clone(),
            config.pulsar.clone(),
        ),
        airbus,
        RateLimiter::new(&config.rate_limit),
        config,
    );
    Harness {
        gateway,
        store,
        queue,
    }
}

fn bearer_token(username: &str, workspaces: &[&str]) -> String {
    let claims = json!({
        "preferred_username": username,
        "workspaces": workspaces,
        "exp": chrono::Utc::now().timestamp() + 600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn request(
    http_method: &str,
    uri: &str,
    token: Option<&str>,
    body: &Value,
) -> Request<Full<Bytes>> {
    let mut builder = Request::builder().method(http_method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

async fn body_json(response: hyper::Response<Full<Bytes>>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Identity and routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_is_public() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let response = harness
        .gateway
        .handle(request("GET", "/manage/health", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_health_verifies_airbus_token_when_key_configured() {
    let airbus_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "tok"})))
        .expect(1)
        .mount(&airbus_server)
        .await;

    let mut config = test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    );
    config.airbus.api_key = Some("vendor-key".into());
    let airbus = AirbusClient::builder(config.airbus.clone())
        .token_url(airbus_server.uri())
        .build();
    let harness = harness_with_airbus(config, airbus);

    let response = harness
        .gateway
        .handle(request("GET", "/manage/health", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_health_fails_when_token_generation_fails() {
    let airbus_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "invalid key"})))
        .mount(&airbus_server)
        .await;

    let mut config = test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    );
    config.airbus.api_key = Some("vendor-key".into());
    let airbus = AirbusClient::builder(config.airbus.clone())
        .token_url(airbus_server.uri())
        .build();
    let harness = harness_with_airbus(config, airbus);

    let response = harness
        .gateway
        .handle(request("GET", "/manage/health", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Health check failed:"));
}

#[tokio::test]
async fn test_metrics_endpoint_is_plaintext() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let response = harness
        .gateway
        .handle(request("GET", "/metrics", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["Content-Type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
}

#[tokio::test]
async fn test_metrics_disabled_is_not_found() {
    let mut config = test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    );
    config.metrics.enabled = false;
    let harness = harness(config);
    let response = harness
        .gateway
        .handle(request("GET", "/metrics", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/manage/catalogs/user-datasets/ws1",
            None,
            &json!({"url": "https://catalogue.local/item"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["detail"].is_string());
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/manage/catalogs/user-datasets/ws1",
            Some("not.a.jwt"),
            &json!({"url": "https://catalogue.local/item"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_workspace_mismatch_is_forbidden() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["other-workspace"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/manage/catalogs/user-datasets/ws1",
            Some(&token),
            &json!({"url": "https://catalogue.local/item"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["detail"], "Access denied");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let response = harness
        .gateway
        .handle(request("GET", "/nope", None, &json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_is_not_allowed() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let response = harness
        .gateway
        .handle(request(
            "GET",
            "/manage/catalogs/user-datasets/ws1",
            None,
            &json!({}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_order_without_any_workspace_is_forbidden() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &[]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1/order",
            Some(&token),
            &json!({"productBundle": "Visual"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ---------------------------------------------------------------------------
// Item mirroring
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_create_item_mirrors_documents_and_publishes() {
    let catalogue = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/api/catalogue/stac/catalogs/user/collections/sentinel2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": "sentinel2"}"#))
        .mount(&catalogue)
        .await;
    Mock::given(method("GET"))
        .and(path(
            "/api/catalogue/stac/catalogs/user/collections/sentinel2/items/tile-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": "tile-1"}"#))
        .mount(&catalogue)
        .await;

    let harness = harness(test_config(
        &catalogue.uri(),
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let item_url = format!(
        "{}/api/catalogue/stac/catalogs/user/collections/sentinel2/items/tile-1",
        catalogue.uri()
    );
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/manage/catalogs/user-datasets/ws1",
            Some(&token),
            &json!({"url": item_url}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Item created successfully");

    let keys: Vec<String> = body["keys"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k.as_str().unwrap().to_string())
        .collect();
    assert_eq!(keys.len(), 2);
    // Collection before item, both under the saved-data mirror
    assert!(keys[0].starts_with("ws1/saved-data/"));
    assert!(keys[0].ends_with("sentinel2.json"));
    assert!(keys[1].ends_with("tile-1.json"));

    for key in &keys {
        assert!(harness.store.object(BUCKET, key).is_some());
        let url = body["urls"][key].as_str().unwrap();
        assert!(url.contains("X-Amz-Expires=3600"));
    }

    let published = harness.queue.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, "ws1/create_item");
    assert_eq!(published[0].workspace, "ws1");
    assert_eq!(published[0].bucket_name, BUCKET);
    assert_eq!(published[0].target, "user-datasets/ws1");
    assert_eq!(published[0].added_keys, keys);
    assert!(published[0].updated_keys.is_empty());
}

#[tokio::test]
async fn test_update_item_reports_updated_keys() {
    let catalogue = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": "doc"}"#))
        .mount(&catalogue)
        .await;

    let harness = harness(test_config(
        &catalogue.uri(),
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let item_url = format!(
        "{}/api/catalogue/stac/catalogs/user/collections/sentinel2/items/tile-1",
        catalogue.uri()
    );
    let response = harness
        .gateway
        .handle(request(
            "PUT",
            "/manage/catalogs/user-datasets/ws1",
            Some(&token),
            &json!({"url": item_url}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Item updated successfully");

    let published = harness.queue.published();
    assert_eq!(published[0].id, "ws1/update_item");
    assert!(published[0].added_keys.is_empty());
    assert_eq!(published[0].updated_keys.len(), 2);
}

#[tokio::test]
async fn test_delete_item_removes_key_and_publishes() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "DELETE",
            "/manage/catalogs/user-datasets/ws1",
            Some(&token),
            &json!({
                "url": "https://catalogue.local/api/catalogue/stac/catalogs/user/collections/sentinel2/items/tile-1"
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Item deleted successfully"
    );

    let deleted = harness.store.deleted.lock().unwrap().clone();
    assert_eq!(deleted.len(), 1);
    assert!(deleted[0].starts_with("ws1/saved-data/"));

    let published = harness.queue.published();
    assert_eq!(published[0].id, "ws1/delete_item");
    assert_eq!(published[0].deleted_keys, deleted);
}

#[tokio::test]
async fn test_create_item_rejects_invalid_body() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/manage/catalogs/user-datasets/ws1",
            Some(&token),
            &json!({"not-a-url": true}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limit_applies_per_workspace() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig {
            enabled: true,
            interval_seconds: 60,
        },
    ));
    let token = bearer_token("alice", &["ws1"]);
    let delete = |token: String| {
        request(
            "DELETE",
            "/manage/catalogs/user-datasets/ws1",
            Some(&token),
            &json!({"url": "https://catalogue.local/api/catalogue/stac/catalogs/user/collections/c/items/i"}),
        )
    };

    let first = harness.gateway.handle(delete(token.clone())).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = harness.gateway.handle(delete(token)).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(second.headers().contains_key("Retry-After"));
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

fn planet_item(catalogue_uri: &str) -> Value {
    json!({
        "id": "item-1",
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [0.1, 0.0], [0.1, 0.1], [0.0, 0.1], [0.0, 0.0]]]
        },
        "properties": {"datetime": "2024-05-01T10:00:00Z"},
        "assets": {"data": {"href": "https://planet.example/data.tif"}},
        "links": [
            {"rel": "collection", "href": format!("{catalogue_uri}/collections/PSScene")},
            {"rel": "self", "href": format!("{catalogue_uri}/items/item-1")}
        ]
    })
}

async fn mount_planet_catalogue(catalogue: &MockServer) {
    Mock::given(method("GET"))
        .and(path(
            "/api/catalogue/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(planet_item(&catalogue.uri())))
        .mount(catalogue)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/PSScene"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "PSScene",
            "description": "Planet scenes",
            "links": [
                {"rel": "parent", "href": format!("{}/catalogs/planet", catalogue.uri())}
            ]
        })))
        .mount(catalogue)
        .await;
    Mock::given(method("GET"))
        .and(path("/catalogs/planet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "planet",
            "description": "Planet",
            "links": []
        })))
        .mount(catalogue)
        .await;
}

#[tokio::test]
async fn test_order_planet_item_succeeds() {
    let catalogue = MockServer::start().await;
    mount_planet_catalogue(&catalogue).await;

    let ades = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/planet/processes/planet-adaptor/execution"))
        .and(header("Prefer", "respond-async"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&ades)
        .await;

    let harness = harness(test_config(
        &catalogue.uri(),
        &ades.uri(),
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1/order",
            Some(&token),
            &json!({"productBundle": "Visual"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()["Location"].to_str().unwrap().to_string();
    assert!(location.ends_with(
        "/stac/catalogs/user/catalogs/ws1/catalogs/commercial-data/catalogs/planet/collections/PSScene/items/item-1_Visual"
    ));

    let body = body_json(response).await;
    assert_eq!(body["id"], "item-1_Visual");
    assert_eq!(body["properties"]["order:status"], "pending");
    assert_eq!(body["properties"]["order_options"]["productBundle"], "Visual");
    assert_eq!(body["properties"]["title"], "Order: item-1 - Visual");
    assert_eq!(body["assets"], json!({}));

    // Catalogue record and ingestion copy, three levels each
    let stored = harness.store.keys();
    assert_eq!(stored.len(), 6);
    assert!(stored.contains(&format!(
        "{BUCKET}/ws1/commercial-data/planet/PSScene/item-1_Visual.json"
    )));
    assert!(stored.contains(&format!(
        "{BUCKET}/transformed/catalogs/user/catalogs/ws1/catalogs/commercial-data/catalogs/planet/collections/PSScene/items/item-1_Visual.json"
    )));

    let published = harness.queue.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].id, "ws1/order_item");
    assert_eq!(published[0].source, "/");
    assert_eq!(published[0].target, "/");
    assert_eq!(published[0].added_keys.len(), 3);
    assert!(published[0]
        .added_keys
        .iter()
        .all(|k| k.starts_with("transformed/")));

    // Workflow inputs are forwarded with the stac key and serialized
    // coordinate string
    let requests = ades.received_requests().await.unwrap();
    let payload: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(payload["inputs"]["workspace"], "ws1");
    assert_eq!(payload["inputs"]["product_bundle"], "Visual");
    assert_eq!(
        payload["inputs"]["stac_key"],
        format!("s3://{BUCKET}/ws1/commercial-data/planet/PSScene/item-1_Visual.json")
    );
    assert_eq!(payload["inputs"]["coordinates"], "[]");
}

#[tokio::test]
async fn test_order_blocked_while_pending() {
    let catalogue = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/api/catalogue/stac/catalogs/user/catalogs/ws1/catalogs/commercial-data/catalogs/planet/collections/PSScene/items/item-1_Visual",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "item-1_Visual",
            "properties": {"order:status": "pending"}
        })))
        .mount(&catalogue)
        .await;

    let ades = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ades)
        .await;

    let harness = harness(test_config(
        &catalogue.uri(),
        &ades.uri(),
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1/order",
            Some(&token),
            &json!({"productBundle": "Visual"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["Message"].to_str().unwrap(),
        "Order not placed. Current item status is pending"
    );
    assert!(response.headers().contains_key("Location"));
    assert!(harness.queue.published().is_empty());
    assert!(harness.store.keys().is_empty());
}

#[tokio::test]
async fn test_order_workflow_failure_records_failed_item() {
    let catalogue = MockServer::start().await;
    mount_planet_catalogue(&catalogue).await;

    let ades = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ades)
        .await;

    let harness = harness(test_config(
        &catalogue.uri(),
        &ades.uri(),
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1/order",
            Some(&token),
            &json!({"productBundle": "Visual"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["detail"],
        "Error executing order workflow"
    );

    // The order record is re-uploaded as failed, and the ingest message
    // still goes out so the failed record is harvested
    let stored = harness
        .store
        .object(
            BUCKET,
            "ws1/commercial-data/planet/PSScene/item-1_Visual.json",
        )
        .unwrap();
    let item: Value = serde_json::from_slice(&stored).unwrap();
    assert_eq!(item["properties"]["order:status"], "failed");
    assert_eq!(harness.queue.published().len(), 1);
}

#[tokio::test]
async fn test_order_rejects_unknown_bundle() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1/order",
            Some(&token),
            &json!({"productBundle": "Platinum"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(detail.contains("Valid bundles"));
}

#[tokio::test]
async fn test_order_unknown_collection_not_found() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/NotAScene/items/item-1/order",
            Some(&token),
            &json!({"productBundle": "Visual"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_planet_quote_from_request_coordinates() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    // One degree square at the equator, roughly 12,360 square kilometres
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/PSScene/items/item-1/quote",
            Some(&token),
            &json!({
                "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["units"], "km2");
    let value = body["value"].as_f64().unwrap();
    assert!(value > 12_000.0 && value < 12_700.0, "got {value}");
}

#[tokio::test]
async fn test_planet_quote_falls_back_to_item_geometry() {
    let catalogue = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(
            "/api/catalogue/stac/catalogs/commercial/catalogs/planet/collections/SkySatCollect/items/sky-1",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sky-1",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[0.0, 0.0], [0.001, 0.0], [0.001, 0.001], [0.0, 0.001], [0.0, 0.0]]]
            }
        })))
        .mount(&catalogue)
        .await;

    let harness = harness(test_config(
        &catalogue.uri(),
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/commercial/catalogs/planet/collections/SkySatCollect/items/sky-1/quote",
            Some(&token),
            &json!({}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    // SkySat orders are priced with a three square kilometre floor
    assert_eq!(body["value"], 3.0);
    assert_eq!(body["units"], "km2");
}

#[tokio::test]
async fn test_airbus_quote_requires_licence() {
    let harness = harness(test_config(
        "https://catalogue.local",
        "http://ades.local",
        RateLimitConfig::default(),
    ));
    let token = bearer_token("alice", &["ws1"]);
    let response = harness
        .gateway
        .handle(request(
            "POST",
            "/stac/catalogs/supported-datasets/catalogs/airbus/collections/airbus_sar_data/items/sar-1/quote",
            Some(&token),
            &json!({}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let detail = body_json(response).await["detail"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(detail.contains("Licence is required"));
}
