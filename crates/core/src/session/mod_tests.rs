// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use super::*;
use crate::cache::InMemoryCache;
use crate::inference_client::FixedInferenceClient;
use crate::model::{Exam, ExamStatus, ExamEnrollment, EnrollmentStatus, McqOption, Role};
use crate::store::memory::InMemoryStore;

fn engine(store: Arc<InMemoryStore>, inference: Arc<dyn InferenceClient>) -> SessionEngine {
    SessionEngine::new(
        store,
        Arc::new(InMemoryCache::new()),
        inference,
        Arc::new(crate::realtime::RealtimeHub::new()),
        Duration::from_secs(900),
    )
}

fn active_exam(shuffle_questions: bool) -> Exam {
    Exam {
        id: Uuid::new_v4(),
        title: "Midterm".into(),
        subject: "CS101".into(),
        start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        duration_minutes: 60,
        total_marks: 10.0,
        passing_marks: 5.0,
        shuffle_questions,
        shuffle_options: false,
        allow_late_entry: true,
        status: ExamStatus::Ongoing,
        is_deleted: false,
    }
}

fn mcq_question(exam_id: Id, order_index: i32, correct: &str) -> Question {
    Question {
        id: Uuid::new_v4(),
        exam_id,
        question_type: QuestionType::Mcq,
        options: vec![
            McqOption { key: "A".into(), text: "alpha".into() },
            McqOption { key: "B".into(), text: "beta".into() },
        ],
        correct_answer: Some(correct.to_owned()),
        marks: 5.0,
        negative_marks: 0.0,
        order_index,
    }
}

async fn setup_enrolled_student() -> (Arc<InMemoryStore>, Exam, Principal) {
    let store = Arc::new(InMemoryStore::new());
    let exam = active_exam(false);
    store.seed_exam(exam.clone());
    let user_id = Uuid::new_v4();
    store.seed_enrollment(ExamEnrollment {
        id: Uuid::new_v4(),
        exam_id: exam.id,
        user_id,
        status: EnrollmentStatus::Registered,
    });
    let principal = Principal { user_id, role: Role::Student };
    (store, exam, principal)
}

#[tokio::test]
async fn start_session_rejects_unenrolled_student() {
    let store = Arc::new(InMemoryStore::new());
    let exam = active_exam(false);
    store.seed_exam(exam.clone());
    let principal = Principal { user_id: Uuid::new_v4(), role: Role::Student };
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let result = engine.start_session(&principal, exam.id).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn start_session_creates_a_session_with_every_question() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    store.seed_question(mcq_question(exam.id, 1, "B"));
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    assert_eq!(start.questions.len(), 2);
    assert_eq!(start.session.version, 0);
    assert!(start.session.is_open());
}

#[tokio::test]
async fn start_session_is_idempotent_while_open() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let first = engine.start_session(&principal, exam.id).await.unwrap();
    let second = engine.start_session(&principal, exam.id).await.unwrap();
    assert_eq!(first.session.id, second.session.id);
}

#[tokio::test]
async fn save_answer_grades_mcq_immediately() {
    let (store, exam, principal) = setup_enrolled_student().await;
    let q = mcq_question(exam.id, 0, "A");
    store.seed_question(q.clone());
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    let answer = engine
        .save_answer(&principal, start.session.id, q.id, Some("A".into()), None)
        .await
        .unwrap();
    assert_eq!(answer.marks_awarded, Some(5.0));
}

#[tokio::test]
async fn save_answer_rejects_a_question_from_another_exam() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let foreign_question = mcq_question(Uuid::new_v4(), 0, "A");
    store.seed_question(foreign_question.clone());
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    let result = engine
        .save_answer(&principal, start.session.id, foreign_question.id, Some("A".into()), None)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn submit_session_computes_final_score_and_pass_flag() {
    let (store, exam, principal) = setup_enrolled_student().await;
    let q1 = mcq_question(exam.id, 0, "A");
    let q2 = mcq_question(exam.id, 1, "B");
    store.seed_question(q1.clone());
    store.seed_question(q2.clone());
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine.save_answer(&principal, start.session.id, q1.id, Some("A".into()), None).await.unwrap();
    engine.save_answer(&principal, start.session.id, q2.id, Some("A".into()), None).await.unwrap();

    let submitted = engine.submit_session(&principal, start.session.id).await.unwrap();
    assert_eq!(submitted.score, Some(5.0));
    assert_eq!(submitted.is_passed, Some(true));
    assert!(!submitted.is_open());
}

#[tokio::test]
async fn submit_session_twice_fails_on_the_second_call() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine.submit_session(&principal, start.session.id).await.unwrap();
    let result = engine.submit_session(&principal, start.session.id).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn suspended_session_cannot_be_submitted_until_reinstated() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store.clone(), Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine.suspend_session(start.session.id, "rolling risk window exceeded").await.unwrap();

    let submit_result = engine.submit_session(&principal, start.session.id).await;
    assert!(submit_result.is_err());

    let proctor_id = Uuid::new_v4();
    let proctor = Principal { user_id: proctor_id, role: Role::Proctor };
    store.seed_proctor_assignment(proctor_id, exam.id);
    let reinstated = engine
        .reinstate_session(&proctor, start.session.id, Some("cleared after review".into()))
        .await
        .unwrap();
    assert!(!reinstated.is_suspended);
    assert!(reinstated.extended_end_at.is_some());

    let submitted = engine.submit_session(&principal, start.session.id).await.unwrap();
    assert!(!submitted.is_open());
}

#[tokio::test]
async fn auto_submit_session_finalizes_without_a_principal() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    let submitted = engine.auto_submit_session(start.session.id).await.unwrap();
    assert!(!submitted.is_open());

    // Idempotent: a second scheduler pass over an already-closed session
    // just returns it unchanged instead of erroring.
    let again = engine.auto_submit_session(start.session.id).await.unwrap();
    assert_eq!(again.submitted_at, submitted.submitted_at);
}

#[tokio::test]
async fn reinstate_session_rejects_an_unassigned_proctor() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store, Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine.suspend_session(start.session.id, "flagged").await.unwrap();

    let unassigned_proctor = Principal { user_id: Uuid::new_v4(), role: Role::Proctor };
    let result = engine.reinstate_session(&unassigned_proctor, start.session.id, None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn verify_identity_marks_session_verified_on_match() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store.clone(), Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    let verdict = engine
        .verify_identity(&principal, start.session.id, "ref.jpg", "live.jpg")
        .await
        .unwrap();
    assert!(verdict.matched);

    let session = store.get_session(start.session.id).await.unwrap();
    assert!(session.identity_verified);
}

#[tokio::test]
async fn verify_identity_records_a_mismatch_event() {
    let (store, exam, principal) = setup_enrolled_student().await;
    store.seed_question(mcq_question(exam.id, 0, "A"));
    let engine = engine(store.clone(), Arc::new(FixedInferenceClient::mismatched()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    let verdict = engine
        .verify_identity(&principal, start.session.id, "ref.jpg", "live.jpg")
        .await
        .unwrap();
    assert!(!verdict.matched);

    let session = store.get_session(start.session.id).await.unwrap();
    assert!(!session.identity_verified);
}

#[tokio::test]
async fn grade_short_answer_recomputes_score_after_submission() {
    let (store, exam, principal) = setup_enrolled_student().await;
    let short = Question {
        id: Uuid::new_v4(),
        exam_id: exam.id,
        question_type: QuestionType::ShortAnswer,
        options: vec![],
        correct_answer: None,
        marks: 5.0,
        negative_marks: 0.0,
        order_index: 0,
    };
    store.seed_question(short.clone());
    let engine = engine(store.clone(), Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine
        .save_answer(&principal, start.session.id, short.id, None, Some("my essay".into()))
        .await
        .unwrap();
    let submitted = engine.submit_session(&principal, start.session.id).await.unwrap();
    assert_eq!(submitted.score, Some(0.0));

    let proctor_id = Uuid::new_v4();
    store.seed_proctor_assignment(proctor_id, exam.id);
    let proctor = Principal { user_id: proctor_id, role: Role::Proctor };
    engine
        .grade_short_answer(&proctor, start.session.id, short.id, 4.5, Some("good effort".into()))
        .await
        .unwrap();

    let regraded = store.get_session(start.session.id).await.unwrap();
    assert_eq!(regraded.score, Some(4.5));
}

#[tokio::test]
async fn grade_short_answer_rejects_an_unsubmitted_session() {
    let (store, exam, principal) = setup_enrolled_student().await;
    let short = Question {
        id: Uuid::new_v4(),
        exam_id: exam.id,
        question_type: QuestionType::ShortAnswer,
        options: vec![],
        correct_answer: None,
        marks: 5.0,
        negative_marks: 0.0,
        order_index: 0,
    };
    store.seed_question(short.clone());
    let engine = engine(store.clone(), Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine
        .save_answer(&principal, start.session.id, short.id, None, Some("my essay".into()))
        .await
        .unwrap();

    let proctor_id = Uuid::new_v4();
    store.seed_proctor_assignment(proctor_id, exam.id);
    let proctor = Principal { user_id: proctor_id, role: Role::Proctor };
    let err = engine
        .grade_short_answer(&proctor, start.session.id, short.id, 4.5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Business { .. }));
}

#[tokio::test]
async fn grade_short_answer_rejects_marks_outside_the_question_range() {
    let (store, exam, principal) = setup_enrolled_student().await;
    let short = Question {
        id: Uuid::new_v4(),
        exam_id: exam.id,
        question_type: QuestionType::ShortAnswer,
        options: vec![],
        correct_answer: None,
        marks: 5.0,
        negative_marks: 0.0,
        order_index: 0,
    };
    store.seed_question(short.clone());
    let engine = engine(store.clone(), Arc::new(FixedInferenceClient::matching()));

    let start = engine.start_session(&principal, exam.id).await.unwrap();
    engine
        .save_answer(&principal, start.session.id, short.id, None, Some("my essay".into()))
        .await
        .unwrap();
    engine.submit_session(&principal, start.session.id).await.unwrap();

    let proctor_id = Uuid::new_v4();
    store.seed_proctor_assignment(proctor_id, exam.id);
    let proctor = Principal { user_id: proctor_id, role: Role::Proctor };
    let err = engine
        .grade_short_answer(&proctor, start.session.id, short.id, 5.1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Business { .. }));

    let err = engine
        .grade_short_answer(&proctor, start.session.id, short.id, -0.1, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Business { .. }));
}
