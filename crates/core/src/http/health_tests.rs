// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use super::*;
use crate::bus::InMemoryBus;
use crate::cache::InMemoryCache;
use crate::http::{build_health_router, build_router};
use crate::inference_client::FixedInferenceClient;
use crate::ingestion::IngestionService;
use crate::object_store::InMemoryObjectStore;
use crate::realtime::RealtimeHub;
use crate::session::SessionEngine;
use crate::store::memory::InMemoryStore;
use crate::token::TokenService;

fn test_app_state() -> Arc<AppState> {
    let store = Arc::new(InMemoryStore::new());
    let store_dyn: Arc<dyn crate::store::StoreGateway> = store;
    let cache: Arc<dyn crate::cache::Cache> = Arc::new(InMemoryCache::new());
    let hub = Arc::new(RealtimeHub::new());
    let inference = Arc::new(FixedInferenceClient::matching());
    let session_engine = Arc::new(SessionEngine::new(
        store_dyn.clone(),
        cache.clone(),
        inference,
        hub.clone(),
        Duration::from_secs(900),
    ));
    let bus = Arc::new(InMemoryBus::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let ingestion = Arc::new(IngestionService::new(store_dyn.clone(), bus, objects, session_engine.clone(), hub.clone()));
    let token_service = Arc::new(TokenService::new(
        "test-secret-at-least-16-bytes",
        Duration::from_secs(3600),
        Duration::from_secs(86400),
        cache.clone(),
    ));

    Arc::new(AppState {
        token_service,
        store: store_dyn,
        cache,
        session_engine,
        ingestion,
        hub,
        refresh_rate_limit_per_minute: 10,
        rate_limit_window: Duration::from_secs(60),
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let server = axum_test::TestServer::new(build_router(test_app_state())).unwrap();
    let resp = server.get("/api/v1/health").await;
    resp.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn ready_reports_ready_when_the_store_answers() {
    let server = axum_test::TestServer::new(build_router(test_app_state())).unwrap();
    let resp = server.get("/api/v1/ready").await;
    resp.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn the_standalone_health_router_does_not_require_auth() {
    let server = axum_test::TestServer::new(build_health_router(test_app_state())).unwrap();
    let resp = server.get("/api/v1/health").await;
    resp.assert_status(StatusCode::OK);
}
