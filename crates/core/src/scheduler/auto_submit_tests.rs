// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use super::*;
use crate::authz::Principal;
use crate::cache::InMemoryCache;
use crate::inference_client::FixedInferenceClient;
use crate::model::{EnrollmentStatus, Exam, ExamEnrollment, ExamStatus, Role};
use crate::store::memory::InMemoryStore;

#[tokio::test]
async fn tick_auto_submits_every_session_whose_deadline_has_passed() {
    let store = Arc::new(InMemoryStore::new());
    let exam = Exam {
        id: Uuid::new_v4(),
        title: "T".into(),
        subject: "S".into(),
        start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2026, 1, 1, 1, 0, 0).unwrap(),
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
    let principal = Principal { user_id, role: Role::Student };

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
    let start = session_engine.start_session(&principal, exam.id).await.unwrap();

    tick(&*store, &session_engine).await.unwrap();

    let session = store.get_session(start.session.id).await.unwrap();
    assert!(!session.is_open());
}
