#![allow(dead_code)]

use diagnosis_service::config::{DiagnosisConfig, GeminiSettings, UploadConfig, DEFAULT_MAX_UPLOAD_BYTES};
use diagnosis_service::services::providers::gemini::GeminiProvider;
use async_trait::async_trait;
use diagnosis_service::models::{DiagnosisRecord, QaEntry};
use diagnosis_service::services::{InMemoryRecordStore, InferenceGateway, RecordStore};
use diagnosis_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config as CoreConfig;
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_API_KEY: &str = "test-api-key";
pub const VISION_MODEL: &str = "vision-test";
pub const TEXT_MODEL: &str = "text-test";

pub const REPORT_PATH: &str = "/models/vision-test:generateContent";
pub const FOLLOWUP_PATH: &str = "/models/text-test:generateContent";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub upstream: MockServer,
    pub store: Option<Arc<InMemoryRecordStore>>,
    pub client: reqwest::Client,
}

pub fn test_config(api_base: &str) -> DiagnosisConfig {
    DiagnosisConfig {
        common: CoreConfig { port: 0 }, // Random port for testing
        mongodb: None,
        gemini: GeminiSettings {
            api_key: Secret::new(TEST_API_KEY.to_string()),
            api_base: api_base.to_string(),
            vision_model: VISION_MODEL.to_string(),
            text_model: TEXT_MODEL.to_string(),
            request_timeout: None,
        },
        uploads: UploadConfig {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        },
    }
}

impl TestApp {
    /// Spawn without record history, talking to a mock Gemini server.
    pub async fn spawn() -> Self {
        let upstream = MockServer::start().await;
        let config = test_config(&upstream.uri());
        Self::spawn_with(upstream, config, None, None).await
    }

    /// Spawn with an in-memory record store.
    pub async fn spawn_with_history() -> Self {
        let upstream = MockServer::start().await;
        let config = test_config(&upstream.uri());
        let memory = Arc::new(InMemoryRecordStore::new());
        let store: Arc<dyn RecordStore> = memory.clone();
        Self::spawn_with(upstream, config, Some(store), Some(memory)).await
    }

    /// Spawn with a record store whose every operation fails.
    pub async fn spawn_with_broken_history() -> Self {
        let upstream = MockServer::start().await;
        let config = test_config(&upstream.uri());
        let store: Arc<dyn RecordStore> = Arc::new(FailingRecordStore);
        Self::spawn_with(upstream, config, Some(store), None).await
    }

    /// Spawn with the provider pointed at `api_base` instead of the mock
    /// server, e.g. an address nothing listens on.
    pub async fn spawn_against(api_base: &str) -> Self {
        let upstream = MockServer::start().await;
        Self::spawn_with(upstream, test_config(api_base), None, None).await
    }

    /// Spawn with an upstream request timeout.
    pub async fn spawn_with_timeout(timeout: Duration) -> Self {
        let upstream = MockServer::start().await;
        let mut config = test_config(&upstream.uri());
        config.gemini.request_timeout = Some(timeout);
        Self::spawn_with(upstream, config, None, None).await
    }

    async fn spawn_with(
        upstream: MockServer,
        config: DiagnosisConfig,
        store: Option<Arc<dyn RecordStore>>,
        memory: Option<Arc<InMemoryRecordStore>>,
    ) -> Self {
        let gateway = InferenceGateway::new(
            Arc::new(
                GeminiProvider::new(config.report_provider_config())
                    .expect("Failed to build report provider"),
            ),
            Arc::new(
                GeminiProvider::new(config.followup_provider_config())
                    .expect("Failed to build followup provider"),
            ),
        );

        let app = Application::build_with(config, gateway, store)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();

        // Wait for the server to answer
        for _ in 0..50 {
            if client.get(format!("{}/health", address)).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            upstream,
            store: memory,
            client,
        }
    }

    pub async fn post_report(&self, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/api/diagnosis/report", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_followup(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/api/diagnosis/followup", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Answer every call on `path` with `text` as the first candidate's text.
    pub async fn mock_text(&self, path_str: &str, text: &str) {
        self.mock_json(path_str, gemini_text(text)).await;
    }

    pub async fn mock_json(&self, path_str: &str, body: Value) {
        Mock::given(method("POST"))
            .and(path(path_str))
            .and(header("x-goog-api-key", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.upstream)
            .await;
    }

    /// JSON bodies of every request the mock upstream received on `path`.
    pub async fn upstream_bodies(&self, path_str: &str) -> Vec<Value> {
        self.upstream
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == path_str)
            .map(|r| serde_json::from_slice(&r.body).expect("Upstream body is not JSON"))
            .collect()
    }
}

/// Record store standing in for an unreachable database.
pub struct FailingRecordStore;

fn store_down() -> AppError {
    AppError::DatabaseError(anyhow::anyhow!("store unavailable"))
}

#[async_trait]
impl RecordStore for FailingRecordStore {
    async fn insert_record(&self, _record: &DiagnosisRecord) -> Result<(), AppError> {
        Err(store_down())
    }

    async fn find_record(&self, _id: &str) -> Result<Option<DiagnosisRecord>, AppError> {
        Err(store_down())
    }

    async fn append_qa(&self, _id: &str, _entry: &QaEntry) -> Result<bool, AppError> {
        Err(store_down())
    }

    async fn list_records(
        &self,
        _limit: i64,
        _skip: u64,
    ) -> Result<Vec<DiagnosisRecord>, AppError> {
        Err(store_down())
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Err(store_down())
    }
}

pub fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
    })
}

/// A small JPEG header; the service never decodes it.
pub fn jpeg_bytes() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9]
}

pub fn image_form(bytes: Vec<u8>) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(bytes)
            .file_name("chest.jpg")
            .mime_str("image/jpeg")
            .unwrap(),
    )
}

/// An address with nothing listening on it.
pub async fn refused_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
