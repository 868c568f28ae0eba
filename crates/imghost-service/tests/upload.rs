//! Upload, dedup and delete workflows against a real SQLite database and a
//! local storage engine.

mod common;

use chrono::Utc;
use serde_json::json;

use imghost_core::{ErrorCode, ErrorKind};
use imghost_database::repositories::ImageRepository;
use imghost_entity::engine::{CreateEngine, UpdateEngine};
use imghost_entity::image::{ImageQuery, NewImage};

use common::{png, setup, upload};

const ABC_MD5: &str = "900150983cd24fb0d6963f7d28e17f72";
const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

#[tokio::test]
async fn test_upload_abc_to_default_engine() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;

    let image = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();

    let key = format!("uploads/{}/{ABC_MD5}.png", Utc::now().format("%Y%m%d"));
    assert_eq!(image.md5, ABC_MD5);
    assert_eq!(image.sha256, ABC_SHA256);
    assert_eq!(image.file_size, 3);
    assert_eq!(image.storage_engine_id, engine.id);
    assert_eq!(image.storage_filename, key);
    assert_eq!(image.original_url, format!("http://localhost:8000/uploads/{key}"));
    assert_eq!(image.upload_ip.as_deref(), Some("127.0.0.1"));
    assert!(image.thumbnail_url.is_none());
    assert!(!image.is_deleted);

    let stored = std::fs::read(env.upload_dir().join(&key)).unwrap();
    assert_eq!(stored, b"abc");
    assert_eq!(env.engine(engine.id).await.used_capacity, 3);
}

#[tokio::test]
async fn test_duplicate_upload_returns_existing_row() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;

    let first = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();
    let second = env
        .images
        .upload(upload("other-name.gif", "image/gif", &b"abc"[..]))
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.original_filename, "a.png");
    assert_eq!(env.engine(engine.id).await.used_capacity, 3);
    assert_eq!(env.images.list(&ImageQuery::default()).await.unwrap().total_items, 1);
}

/// Insert a live row whose MD5 matches `abc` but whose SHA-256 does not.
async fn insert_md5_lookalike(env: &common::TestEnv, engine_id: i64) -> i64 {
    let mut conn = env.pool.acquire().await.unwrap();
    let row = ImageRepository::create(
        &mut conn,
        &NewImage {
            md5: ABC_MD5.to_string(),
            sha256: "0".repeat(64),
            original_filename: "lookalike.png".to_string(),
            storage_filename: "uploads/lookalike.png".to_string(),
            storage_engine_id: engine_id,
            file_size: 3,
            file_type: "image/png".to_string(),
            width: None,
            height: None,
            upload_ip: None,
            extra_metadata: json!({}),
            original_url: "http://localhost:8000/uploads/uploads/lookalike.png".to_string(),
            thumbnail_url: None,
        },
    )
    .await
    .unwrap();
    row.id
}

#[tokio::test]
async fn test_any_policy_matches_on_either_hash() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let lookalike = insert_md5_lookalike(&env, engine.id).await;

    let image = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();

    assert_eq!(image.id, lookalike);
}

#[tokio::test]
async fn test_both_policy_requires_both_hashes() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let lookalike = insert_md5_lookalike(&env, engine.id).await;
    env.settings.set("dedup_policy", "both", None).await.unwrap();

    let image = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();

    assert_ne!(image.id, lookalike);
    assert_eq!(image.sha256, ABC_SHA256);
}

#[tokio::test]
async fn test_upload_validation() {
    let env = setup().await;
    env.local_engine("disk", "").await;

    let empty = env
        .images
        .upload(upload("a.png", "image/png", Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(empty.kind, ErrorKind::Validation);
    assert!(empty.has_code(ErrorCode::InvalidImageFormat));

    let text = env
        .images
        .upload(upload("a.txt", "text/plain", &b"abc"[..]))
        .await
        .unwrap_err();
    assert!(text.has_code(ErrorCode::InvalidImageFormat));

    env.settings.set("max_upload_size", "2", None).await.unwrap();
    let large = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap_err();
    assert_eq!(large.kind, ErrorKind::Validation);
    assert!(large.has_code(ErrorCode::ImageTooLarge));
}

#[tokio::test]
async fn test_engine_resolution_errors() {
    let env = setup().await;

    let none = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap_err();
    assert_eq!(none.kind, ErrorKind::StorageUnavailable);
    assert!(none.has_code(ErrorCode::NoDefaultStorage));

    let mut missing = upload("a.png", "image/png", &b"abc"[..]);
    missing.storage_engine_id = Some(404);
    let err = env.images.upload(missing).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.has_code(ErrorCode::StorageNotFound));

    let engine = env.local_engine("disk", "").await;
    env.engines
        .update(
            engine.id,
            UpdateEngine {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let mut disabled = upload("a.png", "image/png", &b"abc"[..]);
    disabled.storage_engine_id = Some(engine.id);
    let err = env.images.upload(disabled).await.unwrap_err();
    assert!(err.has_code(ErrorCode::StorageDisabled));
}

#[tokio::test]
async fn test_explicit_engine_and_capacity_guard() {
    let env = setup().await;
    env.local_engine("default", "").await;
    let small = env
        .engines
        .create(CreateEngine {
            name: "small".to_string(),
            engine_type: "local".to_string(),
            config: json!({"base_path": "small"}),
            path_rule: Some("{md5}.{ext}".to_string()),
            is_active: true,
            is_default: false,
            max_capacity: Some(4),
        })
        .await
        .unwrap();

    let mut first = upload("a.png", "image/png", &b"abc"[..]);
    first.storage_engine_id = Some(small.id);
    let image = env.images.upload(first).await.unwrap();
    assert_eq!(image.storage_engine_id, small.id);
    assert_eq!(image.storage_filename, format!("{ABC_MD5}.png"));
    assert!(env.upload_dir().join("small").join(&image.storage_filename).is_file());

    let mut second = upload("b.png", "image/png", &b"defg"[..]);
    second.storage_engine_id = Some(small.id);
    let err = env.images.upload(second).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.has_code(ErrorCode::StorageFull));
    assert_eq!(env.engine(small.id).await.used_capacity, 3);
}

#[tokio::test]
async fn test_png_upload_gets_thumbnail_and_dimensions() {
    let env = setup().await;
    env.local_engine("disk", "").await;
    env.settings.set("system_domain", "https://img.example.com/", None).await.unwrap();

    let image = env
        .images
        .upload(upload("photo.PNG", "image/png", png(600, 400)))
        .await
        .unwrap();

    assert_eq!(image.width, Some(600));
    assert_eq!(image.height, Some(400));
    assert!(image.storage_filename.ends_with(".png"));

    let url = image.thumbnail_url.unwrap();
    let expected = format!(
        "https://img.example.com/thumbnails/{}/{}.300x300.webp",
        Utc::now().format("%Y%m%d"),
        image.md5
    );
    assert_eq!(url, expected);
    let relative = url.split("/thumbnails/").nth(1).unwrap();
    assert!(env.thumbnail_dir().join(relative).is_file());
}

#[tokio::test]
async fn test_soft_delete_keeps_object_and_capacity() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let image = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();

    env.images.delete(image.id, false).await.unwrap();

    let row = env.images.get(image.id).await.unwrap();
    assert!(row.is_deleted);
    assert!(env.upload_dir().join(&image.storage_filename).is_file());
    assert_eq!(env.engine(engine.id).await.used_capacity, 3);
    assert_eq!(env.images.list(&ImageQuery::default()).await.unwrap().total_items, 0);

    let deleted = ImageQuery {
        is_deleted: Some(true),
        ..Default::default()
    };
    assert_eq!(env.images.list(&deleted).await.unwrap().total_items, 1);
    assert!(env.images.download(image.id).await.is_err());

    let again = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();
    assert_ne!(again.id, image.id);
}

#[tokio::test]
async fn test_hard_delete_removes_object_and_releases_capacity() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let image = env
        .images
        .upload(upload("photo.png", "image/png", png(64, 64)))
        .await
        .unwrap();
    let thumbnail = image.thumbnail_url.clone().unwrap();
    let thumb_path = env
        .thumbnail_dir()
        .join(thumbnail.split("/thumbnails/").nth(1).unwrap());
    assert!(thumb_path.is_file());

    env.images.delete(image.id, true).await.unwrap();

    assert!(!env.upload_dir().join(&image.storage_filename).exists());
    assert!(!thumb_path.exists());
    assert_eq!(env.engine(engine.id).await.used_capacity, 0);

    let err = env.images.get(image.id).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert!(err.has_code(ErrorCode::ImageNotFound));
}

#[tokio::test]
async fn test_hard_delete_keeps_object_still_referenced() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let old = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();
    env.images.delete(old.id, false).await.unwrap();
    let current = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();
    assert_eq!(current.storage_filename, old.storage_filename);

    env.images.delete(old.id, true).await.unwrap();

    assert!(env.upload_dir().join(&current.storage_filename).is_file());
    assert_eq!(env.engine(engine.id).await.used_capacity, 3);
    assert_eq!(
        env.images.download(current.id).await.unwrap().data.as_ref(),
        b"abc"
    );
}

#[tokio::test]
async fn test_hard_delete_keeps_thumbnail_shared_across_engines() {
    let env = setup().await;
    let first = env.local_engine("first", "a").await;
    let second = env.local_engine("second", "b").await;
    let data = png(48, 48);

    let old = env
        .images
        .upload(upload("p.png", "image/png", data.clone()))
        .await
        .unwrap();
    assert_eq!(old.storage_engine_id, first.id);
    env.images.delete(old.id, false).await.unwrap();

    let mut again = upload("p.png", "image/png", data);
    again.storage_engine_id = Some(second.id);
    let current = env.images.upload(again).await.unwrap();
    assert_eq!(current.storage_engine_id, second.id);
    assert_eq!(current.thumbnail_url, old.thumbnail_url);

    let thumbnail = current.thumbnail_url.clone().unwrap();
    let thumb_path = env
        .thumbnail_dir()
        .join(thumbnail.split("/thumbnails/").nth(1).unwrap());

    env.images.delete(old.id, true).await.unwrap();

    assert!(!env.upload_dir().join("a").join(&old.storage_filename).exists());
    assert!(env.upload_dir().join("b").join(&current.storage_filename).is_file());
    assert!(thumb_path.is_file());

    env.images.delete(current.id, true).await.unwrap();
    assert!(!thumb_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_identical_uploads_share_one_row() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let data = bytes::Bytes::from_static(b"same-data");

    let mut handles = Vec::new();
    for _ in 0..8 {
        let images = env.images.clone();
        let req = upload("same.png", "image/png", data.clone());
        handles.push(tokio::spawn(async move { images.upload(req).await }));
    }
    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }

    assert!(ids.iter().all(|id| *id == ids[0]), "ids differ: {ids:?}");
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(env.engine(engine.id).await.used_capacity, data.len() as i64);

    let stored = env.images.get(ids[0]).await.unwrap();
    assert!(env.upload_dir().join(&stored.storage_filename).is_file());
}

#[tokio::test]
async fn test_used_capacity_tracks_each_upload_and_delete() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;

    let mut images = Vec::new();
    let mut expected = 0;
    for (i, size) in [10usize, 20, 30, 40, 50].into_iter().enumerate() {
        let body = vec![b'a' + i as u8; size];
        let image = env
            .images
            .upload(upload(&format!("{size}.png"), "image/png", body))
            .await
            .unwrap();
        expected += size as i64;
        assert_eq!(image.file_size, size as i64);
        assert_eq!(env.engine(engine.id).await.used_capacity, expected);
        images.push(image);
    }
    assert_eq!(expected, 150);

    let thirty = images.iter().find(|image| image.file_size == 30).unwrap();
    env.images.delete(thirty.id, true).await.unwrap();

    assert_eq!(env.engine(engine.id).await.used_capacity, 120);
    assert!(!env.upload_dir().join(&thirty.storage_filename).exists());
    assert_eq!(env.images.list(&ImageQuery::default()).await.unwrap().total_items, 4);
}

#[tokio::test]
async fn test_used_capacity_floors_at_zero() {
    let env = setup().await;
    let engine = env.local_engine("disk", "").await;
    let image = env
        .images
        .upload(upload("a.png", "image/png", &b"abc"[..]))
        .await
        .unwrap();
    sqlx::query("UPDATE storage_engines SET used_capacity = 1 WHERE id = ?")
        .bind(engine.id)
        .execute(&env.pool)
        .await
        .unwrap();

    env.images.delete(image.id, true).await.unwrap();

    assert_eq!(env.engine(engine.id).await.used_capacity, 0);
}

#[tokio::test]
async fn test_missing_image_delete_is_not_found() {
    let env = setup().await;
    let err = env.images.delete(12345, false).await.unwrap_err();
    assert!(err.has_code(ErrorCode::ImageNotFound));
}

#[tokio::test]
async fn test_batch_operations_isolate_failures() {
    let env = setup().await;
    env.local_engine("disk", "").await;

    let result = env
        .images
        .batch_upload(vec![
            upload("a.png", "image/png", &b"abc"[..]),
            upload("empty.png", "image/png", Vec::new()),
            upload("b.png", "image/png", &b"defg"[..]),
        ])
        .await;

    assert_eq!(result.succeeded.len(), 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].filename, "empty.png");
    assert_eq!(result.failed[0].error_code, Some(ErrorCode::InvalidImageFormat));

    let ids: Vec<i64> = result.succeeded.iter().map(|i| i.id).chain([9999]).collect();
    assert_eq!(env.images.batch_delete(&ids, true).await, 2);
    assert_eq!(env.images.list(&ImageQuery::default()).await.unwrap().total_items, 0);
}

#[tokio::test]
async fn test_list_is_newest_first_and_paginated() {
    let env = setup().await;
    env.local_engine("disk", "").await;
    let mut ids = Vec::new();
    for body in ["one", "two", "three"] {
        let image = env
            .images
            .upload(upload("x.png", "image/png", body.as_bytes().to_vec()))
            .await
            .unwrap();
        ids.push(image.id);
    }

    let page = env
        .images
        .list(&ImageQuery {
            page: imghost_core::types::PageRequest::new(1, 2),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total_items, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, ids[2]);
    assert_eq!(page.items[1].id, ids[1]);
}
