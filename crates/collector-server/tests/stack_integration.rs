//! Integration tests against a locally running backing stack
//!
//! These tests exercise the Redis stores and the full archive pipeline
//! (manifest tick → download → verify → extract → upload → event → commit)
//! against real services. The manifest and archive endpoints are served by
//! an in-process fixture server; Redis and MinIO must be running locally:
//!
//! ```bash
//! # Redis at redis://127.0.0.1:6379 (override with REDIS_URL)
//! # MinIO at http://127.0.0.1:9000, minioadmin credentials (override with S3_ENDPOINT)
//! cargo test --test stack_integration -- --ignored
//! ```

use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use redis::aio::ConnectionManager;
use tempfile::TempDir;
use zip::write::FileOptions;

use collector_common::checksum::compute_md5;
use collector_server::{
    config::{HttpRetryConfig, ManifestConfig},
    ingest::{download, ArchiveProcessor, Coordinator, EventBus},
    storage::{ObjectStore, StorageConfig},
    store::{HashStore, StatusStore},
};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

fn minio_endpoint() -> String {
    std::env::var("S3_ENDPOINT").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string())
}

async fn redis_conn() -> ConnectionManager {
    redis::Client::open(redis_url())
        .expect("valid redis url")
        .get_connection_manager()
        .await
        .expect("redis reachable")
}

/// Unique per-run suffix so repeated test runs never see stale state.
fn run_stamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        let options: FileOptions = FileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

#[derive(Clone)]
struct Fixture {
    manifest: String,
    archives: HashMap<String, Vec<u8>>,
}

async fn manifest_handler(State(fixture): State<Fixture>) -> String {
    fixture.manifest.clone()
}

async fn archive_handler(
    State(fixture): State<Fixture>,
    Path(name): Path<String>,
) -> Response {
    match fixture.archives.get(&name) {
        Some(bytes) => bytes.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve a canned manifest and archive set on an ephemeral port.
async fn spawn_fixture(
    listener: tokio::net::TcpListener,
    manifest: String,
    archives: HashMap<String, Vec<u8>>,
) {
    let app = Router::new()
        .route("/manifest.txt", get(manifest_handler))
        .route("/archives/:name", get(archive_handler))
        .with_state(Fixture { manifest, archives });
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}

fn manifest_config(addr: SocketAddr) -> ManifestConfig {
    ManifestConfig {
        url: format!("http://{addr}/manifest.txt"),
        connect_timeout_secs: 10,
        read_timeout_secs: 10,
        retry: HttpRetryConfig {
            period_ms: 100,
            max_period_ms: 200,
            max_attempts: 2,
        },
    }
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn test_hash_store_round_trip() {
    let store = HashStore::new(redis_conn().await, 60);
    let archive = format!("{}.translation.export.CSV.zip", run_stamp());

    assert_eq!(store.stored(&archive).await.unwrap(), None);
    assert!(store.is_new_or_changed(&archive, "111").await.unwrap());

    store.put(&archive, "111").await.unwrap();
    assert_eq!(store.stored(&archive).await.unwrap(), Some("111".to_string()));
    assert!(!store.is_new_or_changed(&archive, "111").await.unwrap());
    assert!(store.is_new_or_changed(&archive, "222").await.unwrap());
}

#[tokio::test]
#[ignore = "requires a local Redis"]
async fn test_status_store_register_mark_and_sweep() {
    let store = StatusStore::new(redis_conn().await, 60);
    let stamp = run_stamp();
    let archive = format!("{stamp}.translation.export.CSV.zip");
    let url_a = format!("http://storage.local/gdelt/{stamp}-a.CSV");
    let url_b = format!("http://storage.local/gdelt/{stamp}-b.CSV");

    store.register(&archive, &url_a).await.unwrap();
    store.register(&archive, &url_b).await.unwrap();

    let record = store.get(&url_a).await.unwrap().unwrap();
    assert_eq!(record.archive_file_name, archive);
    assert!(!record.sent);

    assert!(store.mark_sent(&url_a).await.unwrap());
    assert!(store.get(&url_a).await.unwrap().unwrap().sent);

    // Unregistered URLs are never resurrected.
    assert!(!store.mark_sent("http://storage.local/gdelt/unknown.CSV").await.unwrap());

    let pending = store.pending().await.unwrap();
    assert!(pending.iter().any(|r| r.file_url == url_b));
    assert!(!pending.iter().any(|r| r.file_url == url_a));
}

#[tokio::test]
#[ignore = "requires a local Redis and MinIO"]
async fn test_pipeline_processes_archives_end_to_end() {
    let stamp = run_stamp();
    let archive_name = format!("{stamp}.translation.export.CSV.zip");
    let member_name = format!("{stamp}.translation.export.CSV");
    let archive = zip_bytes(&[(member_name.as_str(), b"1,2,3\n".as_slice())]);
    let hash = compute_md5(&archive);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let manifest = format!(
        "{} {} http://{addr}/archives/{archive_name}\n",
        archive.len(),
        hash
    );
    spawn_fixture(
        listener,
        manifest,
        HashMap::from([(archive_name.clone(), archive)]),
    )
    .await;

    let conn = redis_conn().await;
    let hash_store = HashStore::new(conn.clone(), 60);
    let object_store = ObjectStore::new(StorageConfig::for_minio(minio_endpoint(), "gdelt-it"))
        .await
        .unwrap();

    let download_dir = TempDir::new().unwrap();
    let config = manifest_config(addr);
    let http = download::build_http_client(&config).unwrap();
    let (event_bus, mut event_rx) = EventBus::new();
    let processor = ArchiveProcessor::new(
        download_dir.path().to_path_buf(),
        http.clone(),
        hash_store.clone(),
        object_store,
        event_bus,
    );
    let coordinator = Coordinator::new(http, config, hash_store.clone(), processor);

    // First tick: the archive is new and must flow all the way through.
    let summary = coordinator.tick().await.unwrap();
    assert_eq!(summary.listed, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);

    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.archive.file_name, archive_name);
    assert_eq!(event.file_urls.len(), 1);
    assert!(event.file_urls[0].ends_with(&member_name));

    assert_eq!(hash_store.stored(&archive_name).await.unwrap(), Some(hash));

    // No extraction scratch or archive file may survive the pipeline.
    let mut leftovers = tokio::fs::read_dir(download_dir.path()).await.unwrap();
    assert!(leftovers.next_entry().await.unwrap().is_none());

    // Second tick with an unchanged manifest is a no-op.
    let summary = coordinator.tick().await.unwrap();
    assert_eq!(summary.listed, 1);
    assert_eq!(summary.processed, 0);
    assert!(event_rx.try_recv().is_err());
}

#[tokio::test]
#[ignore = "requires a local Redis and MinIO"]
async fn test_integrity_failure_does_not_poison_siblings() {
    let stamp = run_stamp();
    let bad_name = format!("{stamp}.translation.export.CSV.zip");
    let good_name = format!("{stamp}.translation.mentions.CSV.zip");
    let bad_archive = zip_bytes(&[("bad.CSV", b"x".as_slice())]);
    let good_archive = zip_bytes(&[("good.CSV", b"y".as_slice())]);
    let good_hash = compute_md5(&good_archive);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // The export archive's manifest hash is wrong; the mentions one is right.
    let manifest = format!(
        "{} 999 http://{addr}/archives/{bad_name}\n{} {} http://{addr}/archives/{good_name}\n",
        bad_archive.len(),
        good_archive.len(),
        good_hash
    );
    spawn_fixture(
        listener,
        manifest,
        HashMap::from([(bad_name.clone(), bad_archive), (good_name.clone(), good_archive)]),
    )
    .await;

    let conn = redis_conn().await;
    let hash_store = HashStore::new(conn.clone(), 60);
    let object_store = ObjectStore::new(StorageConfig::for_minio(minio_endpoint(), "gdelt-it"))
        .await
        .unwrap();

    let download_dir = TempDir::new().unwrap();
    let config = manifest_config(addr);
    let http = download::build_http_client(&config).unwrap();
    let (event_bus, mut event_rx) = EventBus::new();
    let processor = ArchiveProcessor::new(
        download_dir.path().to_path_buf(),
        http.clone(),
        hash_store.clone(),
        object_store,
        event_bus,
    );
    let coordinator = Coordinator::new(http, config, hash_store.clone(), processor);

    let summary = coordinator.tick().await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    // Only the verified archive commits and announces.
    assert_eq!(hash_store.stored(&bad_name).await.unwrap(), None);
    assert_eq!(
        hash_store.stored(&good_name).await.unwrap(),
        Some(good_hash)
    );
    let event = event_rx.recv().await.unwrap();
    assert_eq!(event.archive.file_name, good_name);
    assert!(event_rx.try_recv().is_err());
}
