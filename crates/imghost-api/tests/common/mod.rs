//! Shared fixtures for HTTP tests.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use imghost_api::{AppState, build_app, build_state};
use imghost_core::config::AppConfig;
use imghost_core::config::database::DatabaseConfig;
use imghost_core::config::storage::StorageConfig;

const BOUNDARY: &str = "imghost-test-boundary";

/// Public prefix local engines in these tests serve their files under.
pub const LOCAL_BASE_URL: &str = "http://localhost:8000/uploads";

pub struct TestApp {
    pub dir: TempDir,
    pub app: Router,
    pub state: AppState,
}

pub async fn setup() -> TestApp {
    setup_with(|_| {}).await
}

pub async fn setup_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig {
        database: DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("api.db").display()),
            ..DatabaseConfig::default()
        },
        storage: StorageConfig {
            upload_dir: dir.path().join("uploads").display().to_string(),
            thumbnail_dir: dir.path().join("thumbnails").display().to_string(),
            operation_timeout_seconds: 5,
        },
        ..AppConfig::default()
    };
    customize(&mut config);

    let state = build_state(config).await.unwrap();
    let app = build_app(state.clone());
    TestApp { dir, app, state }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    /// GET a non-JSON resource: status, content type and bytes.
    pub async fn raw(&self, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let response = self.app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, content_type, body.to_vec())
    }

    /// Send a request and decode the JSON envelope.
    pub async fn json(&self, req: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(req).await;
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn request(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.json(req).await
    }

    /// Create an active local engine rooted directly at the upload directory.
    pub async fn local_engine(&self, name: &str) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/storage/engines",
                serde_json::json!({
                    "name": name,
                    "engine_type": "local",
                    "config": {"base_path": "", "base_url": LOCAL_BASE_URL},
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    /// Upload one file through the multipart endpoint.
    pub async fn upload(&self, uri: &str, filename: &str, content_type: &str, data: &[u8]) -> (StatusCode, Value) {
        self.json(multipart_request(uri, "file", &[(filename, content_type, data)]))
            .await
    }
}

/// Build a `multipart/form-data` POST with one part per file under `field`.
pub fn multipart_request(uri: &str, field: &str, files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (filename, content_type, data) in files {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::from(body))
        .unwrap()
}

/// Path component of an absolute URL.
pub fn url_path(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    match without_scheme.find('/') {
        Some(idx) => without_scheme[idx..].to_string(),
        None => "/".to_string(),
    }
}

/// A small solid-colour PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 60, 60]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}
