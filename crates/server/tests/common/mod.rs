//! Common test utilities for API testing with a mock task runner.
//!
//! This module provides a test fixture that creates an in-process router
//! backed by [`MockTaskRunner`], so pipelines run without spawning
//! processes.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use conductor_core::{
    testing::MockTaskRunner, Config, JobRegistry, PipelineController, PipelineTrigger,
    StageConfig, TaskConfig,
};
use conductor_server::{api::create_router, state::AppState};

/// Test fixture for API testing.
///
/// The pipeline has two stages:
/// - `collection`: `fetch_press_releases`, `scrape_articles`
/// - `analysis`: `analyze_news_sentiment`
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_trigger() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/jobs", json!({ "symbol": "AAPL" })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock runner - script task outcomes
    pub runner: Arc<MockTaskRunner>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

fn mock_task(name: &str, script: &str) -> TaskConfig {
    TaskConfig {
        name: name.to_string(),
        executable: "mock".to_string(),
        args: vec![script.to_string()],
        timeout_secs: Some(5),
    }
}

impl TestFixture {
    /// Create a new test fixture where every task succeeds.
    pub fn new() -> Self {
        let runner = Arc::new(MockTaskRunner::new());

        let mut config = Config::default();
        config.pipeline.settle_interval_ms = 0;
        config.pipeline.stages = vec![
            StageConfig {
                name: "collection".to_string(),
                timeout_secs: None,
                tasks: vec![
                    mock_task("fetch_press_releases", "fetch_press_releases_render.py"),
                    mock_task("scrape_articles", "scrape_articles_supabase_render.py"),
                ],
            },
            StageConfig {
                name: "analysis".to_string(),
                timeout_secs: None,
                tasks: vec![mock_task(
                    "analyze_news_sentiment",
                    "analyze_news_sentiment_render.py",
                )],
            },
        ];

        let controller = PipelineController::from_config(
            &config.pipeline,
            runner.clone(),
            JobRegistry::new(),
        );
        let trigger = PipelineTrigger::new(Arc::new(controller));
        let state = Arc::new(AppState::new(config, trigger));

        Self {
            router: create_router(state),
            runner,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Get the raw text body of a GET request.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Poll a job until it reaches a terminal state.
    pub async fn wait_for_job(&self, job_id: &str) -> Value {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let response = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            assert_eq!(response.status, StatusCode::OK);
            let state = response.body["state"].as_str().unwrap_or_default();
            if state == "completed" || state == "failed" {
                return response.body;
            }
            assert!(Instant::now() < deadline, "job {} did not finish", job_id);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
