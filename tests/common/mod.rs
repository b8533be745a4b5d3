#![allow(dead_code)]

use std::sync::Once;

use kusto_ingest::{Config, DataFormat};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/tenant/oauth2/v2.0/token";
pub const INGEST_PATH: &str = "/v1/rest/ingest/db/events";

pub fn config(server: &MockServer) -> Config {
    Config::from_values(
        "tenant",
        "app-id",
        Some("app-secret".into()),
        "cluster",
        "region",
        "db",
        "events",
        Some("events_mapping".into()),
        DataFormat::Json,
    )
    .with_cluster_uri(server.uri())
    .with_authority_host(server.uri())
    .with_retry_max_attempts(2)
}

pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "access-token"
        })))
        .mount(server)
        .await;
}

pub async fn mount_ingest_ok(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(INGEST_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Bodies of every ingest POST the server saw, in arrival order.
pub async fn ingest_bodies(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == INGEST_PATH)
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

static INIT: Once = Once::new();

pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}
