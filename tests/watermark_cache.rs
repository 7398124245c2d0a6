mod common;

use axum::http::StatusCode;
use bytes::Bytes;
use std::sync::Arc;

use common::{
    CountingStore, RecordingEngine, StaticOrigin, WATERMARK_KEY, png_bytes, server, test_config,
    wait_for_key,
};
use imgcgi::engine::RasterEngine;
use imgcgi::storage::providers::memory::MemoryStore;

#[tokio::test]
async fn test_origin_fetch_populates_cache() {
    let store = MemoryStore::new();
    store
        .insert("a.png", png_bytes(8, 8, [0, 0, 0, 255]), "image/png")
        .await;
    let logo = png_bytes(20, 20, [255, 255, 255, 255]);
    let origin = Arc::new(StaticOrigin::serving(logo.clone()));
    let engine = Arc::new(RecordingEngine::default());
    let server = server(
        test_config(),
        Arc::new(store.clone()),
        engine.clone(),
        origin.clone(),
    );

    let response = server.get("/img-cgi/640/watermark/a.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(origin.calls(), 1);
    assert_eq!(engine.last_job().overlay.unwrap().image, logo);

    assert!(wait_for_key(&store, WATERMARK_KEY).await);

    // Served from the cache from now on
    let response = server.get("/img-cgi/320/watermark/a.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(origin.calls(), 1);
    let overlay = engine.last_job().overlay.unwrap();
    assert_eq!(overlay.image, logo);
    assert_eq!(overlay.resize.width, Some(40));
}

#[tokio::test]
async fn test_write_back_failure_does_not_affect_response() {
    let inner = MemoryStore::new();
    inner
        .insert("a.png", png_bytes(8, 8, [0, 0, 0, 255]), "image/png")
        .await;
    let mut store = CountingStore::new(inner.clone());
    store.fail_puts = true;
    let store = Arc::new(store);

    let origin = Arc::new(StaticOrigin::serving(png_bytes(20, 20, [255, 255, 255, 255])));
    let engine = Arc::new(RecordingEngine::default());
    let server = server(test_config(), store.clone(), engine.clone(), origin.clone());

    for _ in 0..2 {
        let response = server.get("/img-cgi/thumb/watermark/a.png").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        assert!(engine.last_job().overlay.is_some());
    }

    // Nothing cached, so every request went to the origin
    assert_eq!(origin.calls(), 2);
    assert!(!inner.contains(WATERMARK_KEY).await);
    for _ in 0..100 {
        if store.puts() == 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(store.puts(), 2);
}

#[tokio::test]
async fn test_cached_watermark_skips_origin() {
    let store = MemoryStore::new();
    store
        .insert("a.png", png_bytes(8, 8, [0, 0, 0, 255]), "image/png")
        .await;
    let cached = png_bytes(30, 30, [0, 255, 0, 255]);
    store.insert(WATERMARK_KEY, cached.clone(), "image/png").await;

    let origin = Arc::new(StaticOrigin::unreachable());
    let engine = Arc::new(RecordingEngine::default());
    let server = server(test_config(), Arc::new(store), engine.clone(), origin.clone());

    let response = server.get("/img-cgi/original/watermark/a.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(origin.calls(), 0);

    let job = engine.last_job();
    assert!(job.resize.is_none());
    let overlay = job.overlay.unwrap();
    assert_eq!(overlay.image, cached);
    // No output width, so the default 1920 tier applies
    assert_eq!(overlay.resize.width, Some(100));
    assert_eq!(overlay.opacity, 0.8);
}

#[tokio::test]
async fn test_unavailable_watermark_on_original_passes_through() {
    let source = png_bytes(8, 8, [1, 2, 3, 255]);
    let store = MemoryStore::new();
    store.insert("a.png", source.clone(), "image/png").await;

    let engine = Arc::new(RecordingEngine::default());
    let server = server(
        test_config(),
        Arc::new(store),
        engine.clone(),
        Arc::new(StaticOrigin::unreachable()),
    );

    let response = server.get("/img-cgi/original/watermark/a.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.as_bytes(), &source);
    assert_eq!(engine.calls(), 0);
}

#[tokio::test]
async fn test_cache_read_error_falls_back_to_origin_and_writes_back() {
    let inner = MemoryStore::new();
    inner
        .insert("a.png", png_bytes(8, 8, [0, 0, 0, 255]), "image/png")
        .await;
    let mut store = CountingStore::new(inner.clone());
    store.fail_get_key = Some(WATERMARK_KEY.to_string());
    let store = Arc::new(store);

    let logo = png_bytes(20, 20, [255, 255, 255, 255]);
    let origin = Arc::new(StaticOrigin::serving(logo.clone()));
    let engine = Arc::new(RecordingEngine::default());
    let server = server(test_config(), store.clone(), engine.clone(), origin.clone());

    let response = server.get("/img-cgi/640/watermark/a.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(origin.calls(), 1);
    assert_eq!(engine.last_job().overlay.unwrap().image, logo);

    assert!(wait_for_key(&inner, WATERMARK_KEY).await);
    assert_eq!(store.puts(), 1);
}

#[tokio::test]
async fn test_undecodable_cached_watermark_falls_back() {
    let store = MemoryStore::new();
    store
        .insert("a.png", png_bytes(600, 400, [30, 120, 200, 255]), "image/png")
        .await;
    store
        .insert(WATERMARK_KEY, Bytes::from_static(b"<html>oops</html>"), "image/png")
        .await;

    let origin = Arc::new(StaticOrigin::unreachable());
    let server = server(
        test_config(),
        Arc::new(store),
        Arc::new(RasterEngine::default()),
        origin.clone(),
    );

    let watermarked = server.get("/img-cgi/thumb/watermark/a.png").await;
    assert_eq!(watermarked.status_code(), StatusCode::OK);
    assert_eq!(origin.calls(), 1);

    let plain = server.get("/img-cgi/thumb/a.png").await;
    assert_eq!(watermarked.as_bytes(), plain.as_bytes());
}

#[tokio::test]
async fn test_undecodable_origin_body_is_not_cached() {
    let store = MemoryStore::new();
    store
        .insert("a.png", png_bytes(8, 8, [0, 0, 0, 255]), "image/png")
        .await;
    let origin = Arc::new(StaticOrigin::serving(Bytes::from_static(b"<html>502</html>")));
    let engine = Arc::new(RecordingEngine::default());
    let server = server(
        test_config(),
        Arc::new(store.clone()),
        engine.clone(),
        origin.clone(),
    );

    let response = server.get("/img-cgi/640/watermark/a.png").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(engine.last_job().overlay.is_none());

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!store.contains(WATERMARK_KEY).await);
}
