//! Common test utilities for integration tests.
//!
//! A [`TestBackend`] is a wiremock server speaking the SDK REST endpoints for
//! project `proj1`. Contexts built with [`context_at`] use the real reqwest
//! client and file storage, with the scripted realtime transport.
//!
//! ```ignore
//! let backend = TestBackend::start().await;
//! backend.mount_auth("t1", &["home"]).await;
//! let context = context_at(dir.path(), MockTransport::new());
//! ```

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cure_sync::adapters::mock::MockTransport;
use cure_sync::adapters::{FileStorage, ReqwestHttpClient};
use cure_sync::{Configuration, CureContext};

pub const PROJECT_ID: &str = "proj1";
pub const API_KEY: &str = "key1";
pub const SECRET: &str = "s1";

pub struct TestBackend {
    pub server: MockServer,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> Configuration {
        Configuration::new(PROJECT_ID, API_KEY, SECRET)
            .with_server_url(self.server.uri())
            .with_socket_url("wss://realtime.test")
    }

    pub async fn mount_auth(&self, token: &str, tabs: &[&str]) {
        Mock::given(method("POST"))
            .and(path("/api/sdk/auth"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"token": token, "tabs": tabs})),
            )
            .mount(&self.server)
            .await;
    }

    pub async fn mount_auth_failure(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/sdk/auth"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"error": "nope"})))
            .mount(&self.server)
            .await;
    }

    /// Translations for `tab`. Mounts are answered in registration order, so a
    /// response limited by `times` is used up before a later one applies.
    pub async fn mount_translations(&self, tab: &str, body: Value, times: Option<u64>) {
        self.mount_translations_delayed(tab, body, times, Duration::ZERO)
            .await;
    }

    pub async fn mount_translations_delayed(
        &self,
        tab: &str,
        body: Value,
        times: Option<u64>,
        delay: Duration,
    ) {
        let mock = Mock::given(method("POST"))
            .and(path(format!("/api/sdk/translations/{}/{}", PROJECT_ID, tab)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    pub async fn mount_colors(&self, body: Value, times: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/api/sdk/colors/{}", PROJECT_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body));
        let mock = match times {
            Some(n) => mock.up_to_n_times(n),
            None => mock,
        };
        mock.mount(&self.server).await;
    }

    pub async fn mount_images(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/sdk/images/{}", PROJECT_ID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_store(&self, identifier: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/sdk/store/{}/{}", PROJECT_ID, identifier)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Empty colors and images, so a full sync has something to hit.
    pub async fn mount_empty_reserved(&self) {
        self.mount_colors(json!([]), None).await;
        self.mount_images(json!([])).await;
    }

    /// Requests received whose path ends with `suffix`.
    pub async fn requests_to(&self, suffix: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path().ends_with(suffix))
            .count()
    }
}

/// `{"keys": [...]}` with one language per key.
pub fn keys_body(lang: &str, pairs: &[(&str, &str)]) -> Value {
    let keys: Vec<Value> = pairs
        .iter()
        .map(|(key, value)| {
            let mut values = serde_json::Map::new();
            values.insert(lang.to_string(), json!(value));
            json!({"key": key, "values": values})
        })
        .collect();
    json!({ "keys": keys })
}

/// Context over reqwest, file storage in `dir`, and `transport`.
pub fn context_at(dir: &Path, transport: MockTransport) -> CureContext {
    CureContext::with_components(
        Arc::new(ReqwestHttpClient::new()),
        Arc::new(transport),
        Arc::new(FileStorage::new(dir)),
    )
    .expect("context inside tokio runtime")
}

/// Poll `condition` for up to two seconds.
pub async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met in time");
}
