//! Offline cache worker and proxy against a fake bot web server.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use botdash::cache::network::HttpNetwork;
use botdash::cache::proxy::build_router;
use botdash::cache::storage::CacheStorage;
use botdash::cache::worker::{OfflineCacheWorker, WorkerState};
use botdash::cache::{CacheManifest, ProxyRequest, RequestKey};
use botdash::config::CacheConfig;
use botdash::types::DashboardError;

use crate::support::{base_url, spawn_fake_bot};

fn network(url: &str) -> Arc<HttpNetwork> {
    Arc::new(HttpNetwork::new(url, Duration::from_secs(5)).unwrap())
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), 100_000).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn canonical_manifest_installs_and_serves_without_network() {
    let (addr, bot) = spawn_fake_bot().await;
    let storage = Arc::new(CacheStorage::new());
    let worker = Arc::new(
        OfflineCacheWorker::from_config(
            &CacheConfig::default(),
            storage.clone(),
            network(&base_url(addr)),
        )
        .unwrap(),
    );

    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Activated);
    assert_eq!(storage.len("tradebot-v1").await, 5);
    let fetched_at_install = bot.asset_calls();
    assert_eq!(fetched_at_install, 5);

    let app = build_router(worker.clone());
    let (s1, first) = get(app.clone(), "/main.js").await;
    let (s2, second) = get(app.clone(), "/main.js").await;
    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first, b"setInterval(updateStatus, 5000);");

    let (_, sw) = get(app, "/service-worker.js").await;
    assert!(!sw.is_empty());

    assert_eq!(bot.asset_calls(), fetched_at_install);
    assert_eq!(worker.stats().hits, 3);
}

#[tokio::test]
async fn missing_asset_fails_whole_install() {
    let (addr, _bot) = spawn_fake_bot().await;
    let storage = Arc::new(CacheStorage::new());
    let worker = OfflineCacheWorker::new(
        storage.clone(),
        network(&base_url(addr)),
        "tradebot",
        1,
        CacheManifest::new(["/", "/index.html", "/missing.css"]).unwrap(),
    );

    let err = worker.install().await.unwrap_err();
    match err {
        DashboardError::InstallFailed { url, reason } => {
            assert_eq!(url, "/missing.css");
            assert!(reason.contains("404"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(worker.state(), WorkerState::Redundant);
    assert!(storage.names().await.is_empty());
    assert!(storage
        .lookup_in("tradebot-v1", &RequestKey::get("/"))
        .await
        .is_none());
}

#[tokio::test]
async fn two_entry_manifest_installs() {
    let (addr, _bot) = spawn_fake_bot().await;
    let storage = Arc::new(CacheStorage::new());
    let worker = OfflineCacheWorker::new(
        storage.clone(),
        network(&base_url(addr)),
        "tradebot",
        1,
        CacheManifest::new(["/", "/index.html"]).unwrap(),
    );

    worker.install().await.unwrap();
    assert_eq!(worker.state(), WorkerState::Installed);
    assert_eq!(storage.len("tradebot-v1").await, 2);
}

#[tokio::test]
async fn api_calls_pass_through_proxy() {
    let (addr, bot) = spawn_fake_bot().await;
    let worker = Arc::new(OfflineCacheWorker::new(
        Arc::new(CacheStorage::new()),
        network(&base_url(addr)),
        "tradebot",
        1,
        CacheManifest::new(["/"]).unwrap(),
    ));
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    let app = build_router(worker.clone());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/start")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"mode":"simulate"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(bot.start_bodies.lock().unwrap().len(), 1);

    let (status, body) = get(app.clone(), "/api/status").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["running"], true);

    get(app, "/api/status").await;
    assert_eq!(bot.status_calls(), 2);
    assert_eq!(worker.stats().misses, 2);
}

#[tokio::test]
async fn failed_upgrade_keeps_previous_bucket() {
    let (addr, _bot) = spawn_fake_bot().await;
    let storage = Arc::new(CacheStorage::new());
    let installer = OfflineCacheWorker::new(
        storage.clone(),
        network(&base_url(addr)),
        "tradebot",
        1,
        CacheManifest::canonical(),
    );
    installer.install().await.unwrap();

    // The next version's worker, pointed at a dead upstream.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead = listener.local_addr().unwrap();
    drop(listener);
    let offline = OfflineCacheWorker::new(
        storage.clone(),
        network(&base_url(dead)),
        "tradebot",
        2,
        CacheManifest::canonical(),
    );
    assert!(offline.install().await.is_err());
    assert_eq!(storage.names().await, vec!["tradebot-v1"]);

    installer.activate().await.unwrap();
    let resp = installer
        .handle_fetch(&ProxyRequest::get("/index.html"))
        .await
        .unwrap();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.header("content-type"), Some("text/html"));
}
