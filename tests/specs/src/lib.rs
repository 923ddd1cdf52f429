// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process end-to-end harness for the exam session engine.
//!
//! Builds a real [`examcore::http::state::AppState`] wired to the crate's
//! in-memory fakes (no live Postgres/Redis/AMQP/S3) and serves it through
//! `axum-test`, so these specs exercise the actual router, auth layer, and
//! domain services together rather than one handler at a time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use examcore::bus::InMemoryBus;
use examcore::cache::{Cache, InMemoryCache};
use examcore::http::state::AppState;
use examcore::http::build_router;
use examcore::inference_client::FixedInferenceClient;
use examcore::ingestion::IngestionService;
use examcore::model::{Exam, ExamStatus, Id, Role};
use examcore::object_store::InMemoryObjectStore;
use examcore::realtime::RealtimeHub;
use examcore::session::SessionEngine;
use examcore::store::memory::InMemoryStore;
use examcore::store::StoreGateway;
use examcore::token::TokenService;

/// A fully-wired, in-process stand-in for the production service.
pub struct Harness {
    pub state: Arc<AppState>,
    pub store: Arc<InMemoryStore>,
}

impl Harness {
    /// Build a harness whose identity-verification calls always match, so
    /// specs that don't care about that path don't need to stage one.
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let store_dyn: Arc<dyn StoreGateway> = store.clone();
        let cache: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
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
        let ingestion = Arc::new(IngestionService::new(
            store_dyn.clone(),
            bus,
            objects,
            session_engine.clone(),
            hub.clone(),
        ));
        let token_service = Arc::new(TokenService::new(
            "specs-harness-secret-at-least-16-bytes",
            Duration::from_secs(3600),
            Duration::from_secs(86400),
            cache.clone(),
        ));

        let state = Arc::new(AppState {
            token_service,
            store: store_dyn,
            cache,
            session_engine,
            ingestion,
            hub,
            refresh_rate_limit_per_minute: 10,
            rate_limit_window: Duration::from_secs(60),
        });

        Self { state, store }
    }

    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    pub async fn issue_token(&self, user_id: Id, role: Role) -> String {
        self.state.token_service.issue(user_id, role).await.unwrap().access
    }

    /// Seed a running, unlimited-duration exam and return its id.
    pub fn seed_exam(&self) -> Id {
        let exam = Exam {
            id: Uuid::new_v4(),
            title: "Structures & Algorithms Final".into(),
            subject: "Computer Science".into(),
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            duration_minutes: 90,
            total_marks: 10.0,
            passing_marks: 5.0,
            shuffle_questions: false,
            shuffle_options: false,
            allow_late_entry: true,
            status: ExamStatus::Ongoing,
            is_deleted: false,
        };
        self.store.seed_exam(exam.clone());
        exam.id
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bearer(token: &str) -> axum::http::HeaderValue {
    axum::http::HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}
