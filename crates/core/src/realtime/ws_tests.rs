// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use super::*;
use crate::bus::InMemoryBus;
use crate::cache::InMemoryCache;
use crate::inference_client::FixedInferenceClient;
use crate::model::{EnrollmentStatus, Exam, ExamEnrollment, ExamStatus, Role};
use crate::object_store::InMemoryObjectStore;
use crate::store::memory::InMemoryStore;

async fn state_with_open_session() -> (Arc<RealtimeState>, Id, Id, Principal, Id, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let exam = Exam {
        id: Uuid::new_v4(),
        title: "Final".into(),
        subject: "Math".into(),
        start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        duration_minutes: 60,
        total_marks: 10.0,
        passing_marks: 5.0,
        shuffle_questions: false,
        shuffle_options: false,
        allow_late_entry: true,
        status: ExamStatus::Ongoing,
        is_deleted: false,
    };
    store.seed_exam(exam.clone());
    let user_id = Uuid::new_v4();
    store.seed_enrollment(ExamEnrollment {
        id: Uuid::new_v4(),
        exam_id: exam.id,
        user_id,
        status: EnrollmentStatus::Registered,
    });
    let student = Principal { user_id, role: Role::Student };

    let cache = Arc::new(InMemoryCache::new());
    let inference = Arc::new(FixedInferenceClient::matching());
    let store_dyn: Arc<dyn StoreGateway> = store.clone();
    let hub = Arc::new(RealtimeHub::new());
    let session_engine = Arc::new(SessionEngine::new(
        store_dyn.clone(),
        cache,
        inference,
        hub.clone(),
        Duration::from_secs(900),
    ));
    let start = session_engine.start_session(&student, exam.id).await.unwrap();

    let bus = Arc::new(InMemoryBus::new());
    let objects = Arc::new(InMemoryObjectStore::new());
    let ingestion = Arc::new(IngestionService::new(store_dyn.clone(), bus, objects, session_engine.clone(), hub.clone()));
    let token_service = Arc::new(TokenService::new(
        "test-secret-at-least-16-bytes",
        Duration::from_secs(3600),
        Duration::from_secs(86400),
        Arc::new(InMemoryCache::new()),
    ));

    let state = Arc::new(RealtimeState {
        token_service,
        hub,
        store: store_dyn,
        session_engine,
        ingestion,
        cache: Arc::new(InMemoryCache::new()),
        ws_inbound_rate_limit: 120,
    });

    (state, exam.id, start.session.id, student, user_id, store)
}

#[test]
fn parse_leading_segment_extracts_a_uuid_immediately_after_the_prefix() {
    let id = Uuid::new_v4();
    let destination = format!("/queue/exam/{id}/suspend");
    assert_eq!(parse_leading_segment(&destination, "/queue/exam/"), Some(id));
}

#[test]
fn parse_leading_segment_rejects_a_non_uuid_suffix() {
    assert_eq!(parse_leading_segment("/queue/exam/not-a-uuid/suspend", "/queue/exam/"), None);
}

#[tokio::test]
async fn owner_is_authorized_for_their_own_exam_queue() {
    let (state, _exam_id, session_id, student, _user_id, _store) = state_with_open_session().await;
    let subscribe = format!("/queue/exam/{session_id}/suspend");
    let topics = authorize_subscriptions(&state, &student, &subscribe).await.unwrap();
    assert_eq!(topics, vec![subscribe]);
}

#[tokio::test]
async fn a_stranger_is_forbidden_from_another_students_exam_queue() {
    let (state, _exam_id, session_id, _student, _user_id, _store) = state_with_open_session().await;
    let stranger = Principal { user_id: Uuid::new_v4(), role: Role::Student };
    let subscribe = format!("/queue/exam/{session_id}/warning");
    let result = authorize_subscriptions(&state, &stranger, &subscribe).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn an_unassigned_proctor_is_forbidden_from_the_exam_proctor_topic() {
    let (state, exam_id, _session_id, _student, _user_id, _store) = state_with_open_session().await;
    let proctor = Principal { user_id: Uuid::new_v4(), role: Role::Proctor };
    let subscribe = format!("/topic/proctor/exam/{exam_id}");
    let result = authorize_subscriptions(&state, &proctor, &subscribe).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn an_assigned_proctor_is_authorized_for_the_exam_proctor_topic() {
    let (state, exam_id, _session_id, _student, _user_id, store) = state_with_open_session().await;
    let proctor_id = Uuid::new_v4();
    store.seed_proctor_assignment(proctor_id, exam_id);
    let proctor = Principal { user_id: proctor_id, role: Role::Proctor };
    let subscribe = format!("/topic/proctor/exam/{exam_id}");
    let topics = authorize_subscriptions(&state, &proctor, &subscribe).await.unwrap();
    assert_eq!(topics, vec![proctor_topic(exam_id)]);
}

#[tokio::test]
async fn a_non_admin_is_forbidden_from_the_admin_topic() {
    let (state, _exam_id, _session_id, student, _user_id, _store) = state_with_open_session().await;
    let result = authorize_subscriptions(&state, &student, "/topic/admin").await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unrecognized_destinations_are_silently_dropped() {
    let (state, _exam_id, _session_id, student, _user_id, _store) = state_with_open_session().await;
    let topics = authorize_subscriptions(&state, &student, "/nonsense/path").await.unwrap();
    assert!(topics.is_empty());
}

#[test]
fn an_access_claim_is_admitted() {
    let claim = Claim {
        user_id: Uuid::new_v4(),
        role: Role::Student,
        kind: crate::token::TokenKind::Access,
        jti: "jti".into(),
        expires_at_secs: 0,
    };
    assert!(principal_from_access_claim(&claim).is_ok());
}

#[test]
fn a_refresh_claim_is_rejected() {
    let claim = Claim {
        user_id: Uuid::new_v4(),
        role: Role::Student,
        kind: crate::token::TokenKind::Refresh,
        jti: "jti".into(),
        expires_at_secs: 0,
    };
    assert_eq!(principal_from_access_claim(&claim).unwrap_err(), axum::http::StatusCode::UNAUTHORIZED);
}
