//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the full router in-process
//! with a mock download client injected, so every endpoint can be exercised
//! without a running qBittorrent.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use seedwarden_core::{
    cache::ManualClock,
    testing::{MockClientFactory, MockTorrentClient},
    Config, Reconciler,
};
use seedwarden_server::{create_router, AppState};

/// Re-export fixtures for test convenience
pub use seedwarden_core::testing::fixtures;

/// Test fixture with a mock client behind the client pool.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_unique() {
///     let fixture = TestFixture::new();
///     let response = fixture.post("/api/upgrade", fixture.body("Show.S01E01.1080p.WEB-DL")).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock torrent client handed out for every identity
    pub torrent_client: Arc<MockTorrentClient>,
    /// Factory behind the client pool - toggle connect failures
    pub factory: Arc<MockClientFactory>,
    /// Clock driving cache freshness and the sweep grace period
    pub clock: Arc<ManualClock>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a test fixture with custom configuration. Retry delays are
    /// always zero.
    pub fn with_config(config: Config) -> Self {
        let factory = Arc::new(MockClientFactory::new());
        let clock = Arc::new(ManualClock::default());
        let reconciler =
            Reconciler::new(&config.reconcile).with_pacing(Duration::ZERO, Duration::ZERO);

        let state = AppState::new(config, factory.clone(), clock.clone())
            .with_reconciler(reconciler);
        let router = create_router(Arc::new(state));

        Self {
            router,
            torrent_client: factory.client(),
            factory,
            clock,
        }
    }

    /// Standard request body for `name`.
    pub fn body(&self, name: &str) -> Value {
        serde_json::json!({
            "name": name,
            "host": "http://qbittorrent.local:8080",
            "user": "admin",
            "password": "adminadmin",
        })
    }

    /// Make a GET request.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Make a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.post_raw(path, body.to_string()).await
    }

    /// Make a POST request with an arbitrary body.
    pub async fn post_raw(&self, path: &str, body: impl Into<String>) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.into()))
            .unwrap();
        self.send(request).await
    }

    /// Raw text body of a GET request.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse { status, body }
    }
}
