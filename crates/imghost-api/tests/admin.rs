//! Storage engine and settings administration endpoints.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::setup;

#[tokio::test]
async fn test_engine_lifecycle() {
    let t = setup().await;

    let first = t.local_engine("first").await;
    assert_eq!(first["is_default"], true);
    let second = t.local_engine("second").await;
    assert_eq!(second["is_default"], false);
    let second_id = second["id"].as_i64().unwrap();

    let (status, body) = t
        .request(
            Method::POST,
            &format!("/api/storage/engines/{second_id}/default"),
            json!(null),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_default"], true);

    let (_, health) = t.get("/api/health").await;
    assert_eq!(health["data"]["status"], "ok");
    assert_eq!(health["data"]["engines_loaded"], 2);
    assert_eq!(health["data"]["default_engine_id"], second_id);

    let (status, body) = t
        .request(
            Method::PUT,
            &format!("/api/storage/engines/{second_id}"),
            json!({"name": "renamed", "max_capacity": 1024}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "renamed");
    assert_eq!(body["data"]["max_capacity"], 1024);

    let (status, body) = t.get(&format!("/api/storage/engines/{second_id}/usage")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["available"], true);
    assert_eq!(body["data"]["used_capacity"], 0);

    let (status, body) = t
        .request(Method::POST, &format!("/api/storage/engines/{second_id}/test"), json!(null))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);

    let (status, _) = t
        .request(Method::DELETE, &format!("/api/storage/engines/{second_id}"), json!(null))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.get(&format!("/api/storage/engines/{second_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "STORAGE_NOT_FOUND");

    let (_, body) = t.get("/api/storage/engines?is_active=true").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_engine_secrets_are_masked() {
    let t = setup().await;
    let (status, body) = t
        .request(
            Method::POST,
            "/api/storage/engines",
            json!({
                "name": "minio",
                "engine_type": "s3",
                "config": {
                    "access_key_id": "AK",
                    "secret_access_key": "SK",
                    "bucket_name": "pics",
                    "endpoint_url": "http://127.0.0.1:9",
                },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["config"]["secret_access_key"], "******");
    assert_eq!(body["data"]["config"]["access_key_id"], "AK");
    let id = body["data"]["id"].as_i64().unwrap();

    let mut config = body["data"]["config"].clone();
    config["bucket_name"] = json!("photos");
    let (status, _) = t
        .request(
            Method::PUT,
            &format!("/api/storage/engines/{id}"),
            json!({ "config": config }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let stored = t.state.engine_service.get(id).await.unwrap();
    assert_eq!(stored.config.0["secret_access_key"], "SK");
    assert_eq!(stored.config.0["bucket_name"], "photos");
}

#[tokio::test]
async fn test_engine_validation_errors() {
    let t = setup().await;

    let (status, body) = t
        .request(
            Method::POST,
            "/api/storage/engines",
            json!({"name": "", "engine_type": "local"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = t
        .request(
            Method::POST,
            "/api/storage/engines",
            json!({"name": "ftp", "engine_type": "ftp"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "UNSUPPORTED_STORAGE_TYPE");

    let (status, body) = t
        .request(Method::POST, "/api/storage/engines/77/default", json!(null))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "STORAGE_NOT_FOUND");

    let (_, body) = t.get("/api/storage/types").await;
    assert_eq!(body["data"], json!(["aliyun_oss", "local", "s3"]));
}

#[tokio::test]
async fn test_cache_reload_reports_contents() {
    let t = setup().await;
    let engine = t.local_engine("disk").await;

    let (status, body) = t
        .request(Method::POST, "/api/storage/cache/reload", json!(null))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["default_engine_id"], engine["id"]);
}

#[tokio::test]
async fn test_config_endpoints() {
    let t = setup().await;

    let (_, body) = t.get("/api/configs").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 6);

    let (status, body) = t
        .request(Method::PUT, "/api/configs/thumbnail_width", json!({"value": "0"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = t
        .request(
            Method::PUT,
            "/api/configs/batch",
            json!({"configs": {"site_title": "Pics", "dedup_policy": "both"}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = t.get("/api/configs/site_title").await;
    assert_eq!(body["data"]["value"], "Pics");

    let (status, _) = t
        .request(Method::DELETE, "/api/configs/site_title", json!(null))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = t.get("/api/configs/site_title").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error_code"], "CONFIG_NOT_FOUND");

    let (status, body) = t
        .request(Method::POST, "/api/configs/reload", json!(null))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 6);
}
