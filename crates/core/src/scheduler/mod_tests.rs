// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::cache::InMemoryCache;
use crate::inference_client::FixedInferenceClient;
use crate::object_store::InMemoryObjectStore;
use crate::store::memory::InMemoryStore;

#[tokio::test]
async fn spawn_all_starts_without_panicking_and_stops_on_cancel() {
    let store: Arc<dyn StoreGateway> = Arc::new(InMemoryStore::new());
    let cache = Arc::new(InMemoryCache::new());
    let inference = Arc::new(FixedInferenceClient::matching());
    let session_engine =
        Arc::new(SessionEngine::new(
        store.clone(),
        cache,
        inference,
        Arc::new(crate::realtime::RealtimeHub::new()),
        Duration::from_secs(900),
    ));
    let objects: Arc<dyn ObjectStore> = Arc::new(InMemoryObjectStore::new());
    let cancel = CancellationToken::new();

    spawn_all(
        store,
        session_engine,
        objects,
        SchedulerConfig {
            exam_status_interval: Duration::from_millis(10),
            auto_submit_interval: Duration::from_millis(10),
            stale_session_interval: Duration::from_millis(10),
            stale_session_cutoff: Duration::from_secs(900),
            content_expiry_interval: Duration::from_millis(10),
            snapshot_retention: chrono::Duration::days(30),
        },
        cancel.clone(),
    );

    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();
}

#[tokio::test]
async fn retry_on_concurrent_modification_succeeds_after_two_retries() {
    let attempts = std::sync::atomic::AtomicU32::new(0);
    let result = retry_on_concurrent_modification(|| {
        let n = attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move {
            if n < 2 {
                Err(EngineError::business(ErrorCode::ConcurrentModification, "RACE", "version mismatch"))
            } else {
                Ok(())
            }
        }
    })
    .await;
    assert!(result.is_ok());
    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_on_concurrent_modification_gives_up_after_three_attempts() {
    let attempts = std::sync::atomic::AtomicU32::new(0);
    let result = retry_on_concurrent_modification(|| {
        attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move { Err(EngineError::business(ErrorCode::ConcurrentModification, "RACE", "version mismatch")) }
    })
    .await;
    assert!(result.is_err());
    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_on_concurrent_modification_does_not_retry_other_errors() {
    let attempts = std::sync::atomic::AtomicU32::new(0);
    let result = retry_on_concurrent_modification(|| {
        attempts.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        async move { Err(EngineError::not_found("gone")) }
    })
    .await;
    assert!(result.is_err());
    assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
}
