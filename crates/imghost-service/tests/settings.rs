//! Runtime settings persistence and cache coherence.

mod common;

use std::collections::HashMap;

use imghost_core::{ErrorCode, ErrorKind};
use imghost_entity::image::DedupPolicy;

use common::setup;

#[tokio::test]
async fn test_defaults_are_seeded_once() {
    let env = setup().await;

    let rows = env.settings.list().await.unwrap();
    assert_eq!(rows.len(), 6);
    assert_eq!(env.settings.get("max_upload_size").await.unwrap().value, "10485760");
    assert_eq!(env.settings.initialize_defaults().await.unwrap(), 0);

    let cache = env.settings.cache();
    assert_eq!(cache.max_upload_size().await, 10_485_760);
    assert_eq!(cache.dedup_policy().await, DedupPolicy::Any);
}

#[tokio::test]
async fn test_set_updates_cache_and_keeps_description() {
    let env = setup().await;

    let saved = env.settings.set("thumbnail_width", "150", None).await.unwrap();
    assert_eq!(saved.value, "150");
    assert!(saved.description.is_some());
    assert_eq!(env.settings.cache().thumbnail_size().await, (150, 300));

    let err = env.settings.set("thumbnail_width", "wide", None).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(env.settings.get("thumbnail_width").await.unwrap().value, "150");
}

#[tokio::test]
async fn test_set_many_is_validated_up_front() {
    let env = setup().await;

    let err = env
        .settings
        .set_many(HashMap::from([
            ("site_title".to_string(), "Pics".to_string()),
            ("dedup_policy".to_string(), "sometimes".to_string()),
        ]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(env.settings.cache().get("site_title").await.is_none());

    let saved = env
        .settings
        .set_many(HashMap::from([
            ("site_title".to_string(), "Pics".to_string()),
            ("dedup_policy".to_string(), "both".to_string()),
        ]))
        .await
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(env.settings.cache().dedup_policy().await, DedupPolicy::Both);
}

#[tokio::test]
async fn test_missing_and_deleted_keys() {
    let env = setup().await;

    let err = env.settings.get("nope").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.has_code(ErrorCode::ConfigNotFound));

    env.settings.set("site_title", "Pics", Some("Title")).await.unwrap();
    env.settings.delete("site_title").await.unwrap();
    assert!(env.settings.cache().get("site_title").await.is_none());
    assert!(env.settings.delete("site_title").await.unwrap_err().has_code(ErrorCode::ConfigNotFound));
}

#[tokio::test]
async fn test_reload_picks_up_external_changes() {
    let env = setup().await;
    sqlx::query("UPDATE system_configs SET value = '2048' WHERE key = 'max_upload_size'")
        .execute(&env.pool)
        .await
        .unwrap();
    assert_eq!(env.settings.cache().max_upload_size().await, 10_485_760);

    assert_eq!(env.settings.reload().await.unwrap(), 6);
    assert_eq!(env.settings.cache().max_upload_size().await, 2048);
}
