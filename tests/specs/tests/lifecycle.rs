// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end specs that drive the real router (auth layer, session
//! lifecycle, and proctoring surface together) against the in-memory
//! fakes, rather than one handler in isolation.

use axum::http::{header, StatusCode};
use examcore::model::{EnrollmentStatus, ExamEnrollment, McqOption, Question, QuestionType, Role};
use examcore_specs::{bearer, Harness};
use uuid::Uuid;

#[tokio::test]
async fn a_student_takes_an_exam_start_to_finish() {
    let harness = Harness::new();
    let exam_id = harness.seed_exam();
    let user_id = Uuid::new_v4();
    harness.store.seed_enrollment(ExamEnrollment {
        id: Uuid::new_v4(),
        exam_id,
        user_id,
        status: EnrollmentStatus::Registered,
    });
    let question_id = Uuid::new_v4();
    harness.store.seed_question(Question {
        id: question_id,
        exam_id,
        question_type: QuestionType::Mcq,
        options: vec![
            McqOption { key: "a".into(), text: "4".into() },
            McqOption { key: "b".into(), text: "5".into() },
        ],
        correct_answer: Some("a".into()),
        marks: 10.0,
        negative_marks: 0.0,
        order_index: 0,
    });

    let token = harness.issue_token(user_id, Role::Student).await;
    let server = axum_test::TestServer::new(harness.router()).unwrap();

    let start_resp = server
        .post(&format!("/api/sessions/start?examId={exam_id}"))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    start_resp.assert_status(StatusCode::OK);
    let start: examcore::session::SessionStart = start_resp.json();
    assert_eq!(start.questions.len(), 1);
    let session_id = start.session.id;

    server
        .post(&format!("/api/sessions/{session_id}/heartbeat"))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::OK);

    server
        .post(&format!("/api/sessions/{session_id}/answers"))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&serde_json::json!({ "questionId": question_id, "selectedAnswer": "a" }))
        .await
        .assert_status(StatusCode::OK);

    let submit_resp = server
        .post(&format!("/api/sessions/{session_id}/submit"))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    submit_resp.assert_status(StatusCode::OK);
    let submitted: examcore::model::ExamSession = submit_resp.json();
    assert!(submitted.submitted_at.is_some());
    assert_eq!(submitted.score, Some(10.0));
    assert_eq!(submitted.is_passed, Some(true));

    // A second start on a finished enrollment opens a fresh attempt rather
    // than resurrecting the submitted one.
    let restart_resp = server
        .post(&format!("/api/sessions/start?examId={exam_id}"))
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    restart_resp.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn a_proctor_flags_a_session_and_the_student_sees_it_reflected() {
    let harness = Harness::new();
    let exam_id = harness.seed_exam();
    let student_id = Uuid::new_v4();
    let proctor_id = Uuid::new_v4();
    harness.store.seed_enrollment(ExamEnrollment {
        id: Uuid::new_v4(),
        exam_id,
        user_id: student_id,
        status: EnrollmentStatus::Registered,
    });
    harness.store.seed_proctor_assignment(proctor_id, exam_id);

    let student_token = harness.issue_token(student_id, Role::Student).await;
    let proctor_token = harness.issue_token(proctor_id, Role::Proctor).await;
    let server = axum_test::TestServer::new(harness.router()).unwrap();

    let start_resp = server
        .post(&format!("/api/sessions/start?examId={exam_id}"))
        .add_header(header::AUTHORIZATION, bearer(&student_token))
        .await;
    let start: examcore::session::SessionStart = start_resp.json();
    let session_id = start.session.id;

    server
        .post(&format!("/api/proctoring/sessions/{session_id}/flag"))
        .add_header(header::AUTHORIZATION, bearer(&proctor_token))
        .json(&serde_json::json!({ "note": "looking off-screen repeatedly" }))
        .await
        .assert_status(StatusCode::OK);

    let suspend_resp = server
        .post(&format!("/api/sessions/{session_id}/suspend"))
        .add_header(header::AUTHORIZATION, bearer(&proctor_token))
        .json(&serde_json::json!({ "reason": "manual review" }))
        .await;
    suspend_resp.assert_status(StatusCode::OK);

    // A suspended session rejects further student activity.
    server
        .post(&format!("/api/sessions/{session_id}/heartbeat"))
        .add_header(header::AUTHORIZATION, bearer(&student_token))
        .await
        .assert_status(StatusCode::CONFLICT);

    let reinstate_resp = server
        .post(&format!("/api/sessions/{session_id}/reinstate"))
        .add_header(header::AUTHORIZATION, bearer(&proctor_token))
        .json(&serde_json::json!({ "reason": "cleared after review" }))
        .await;
    reinstate_resp.assert_status(StatusCode::OK);

    server
        .post(&format!("/api/sessions/{session_id}/heartbeat"))
        .add_header(header::AUTHORIZATION, bearer(&student_token))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn a_capability_pair_survives_refresh_but_not_reuse() {
    let harness = Harness::new();
    let user_id = Uuid::new_v4();
    let access_token = harness.issue_token(user_id, Role::Student).await;
    let server = axum_test::TestServer::new(harness.router()).unwrap();

    let refresh_token = harness.state.token_service.issue(user_id, Role::Student).await.unwrap().refresh;

    let resp = server
        .post("/api/auth/refresh")
        .add_header(header::AUTHORIZATION, bearer(&refresh_token))
        .await;
    resp.assert_status(StatusCode::OK);

    // The already-rotated capability can't be replayed.
    server
        .post("/api/auth/refresh")
        .add_header(header::AUTHORIZATION, bearer(&refresh_token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // An access capability is never accepted where a refresh is expected.
    server
        .post("/api/auth/refresh")
        .add_header(header::AUTHORIZATION, bearer(&access_token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
