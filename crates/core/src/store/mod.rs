// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relational Store Gateway (C1): typed access to every persisted entity,
//! with batch reads for the scheduler and inference consumer and
//! optimistic-concurrency writes for `ExamSession` (spec §4.1).
//!
//! Each method is its own atomicity boundary. The session engine composes
//! gateway calls rather than threading a shared transaction handle through
//! business logic, so `suspend_session` committing independently of a
//! caller's broader unit of work (spec §4.9) falls out of the method
//! boundary rather than an explicit `WithNewTx` combinator — see
//! `DESIGN.md` for why that shape was chosen over a generic transaction
//! combinator on a `dyn` gateway.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::model::{
    Answer, BehaviorEvent, Exam, ExamEnrollment, ExamSession, ExamStatus, EnrollmentStatus, Id, ProctoringEvent,
    Question, User, ViolationSummary,
};

#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn get_user(&self, id: Id) -> Result<User, EngineError>;

    async fn get_exam(&self, id: Id) -> Result<Exam, EngineError>;

    async fn list_exams_by_status(&self, status: ExamStatus) -> Result<Vec<Exam>, EngineError>;

    async fn update_exam_status(&self, exam_id: Id, status: ExamStatus) -> Result<(), EngineError>;

    async fn list_questions(&self, exam_id: Id) -> Result<Vec<Question>, EngineError>;

    async fn count_questions(&self, exam_id: Id) -> Result<i64, EngineError>;

    async fn find_questions_by_ids(&self, ids: &[Id]) -> Result<Vec<Question>, EngineError>;

    async fn get_enrollment(&self, id: Id) -> Result<ExamEnrollment, EngineError>;

    async fn find_enrollment_by_exam_and_user(
        &self,
        exam_id: Id,
        user_id: Id,
    ) -> Result<Option<ExamEnrollment>, EngineError>;

    async fn is_proctor_assigned(&self, user_id: Id, exam_id: Id) -> Result<bool, EngineError>;

    async fn update_enrollment_status(&self, enrollment_id: Id, status: EnrollmentStatus) -> Result<(), EngineError>;

    async fn get_session(&self, id: Id) -> Result<ExamSession, EngineError>;

    async fn find_active_session(&self, enrollment_id: Id) -> Result<Option<ExamSession>, EngineError>;

    async fn insert_session(&self, session: ExamSession) -> Result<ExamSession, EngineError>;

    /// Compare-and-swap on `session.version`. Returns
    /// `EngineError::concurrent_modification` if the stored row's version no
    /// longer matches `session.version`.
    async fn update_session(&self, session: ExamSession) -> Result<ExamSession, EngineError>;

    async fn list_sessions_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<ExamSession>, EngineError>;

    async fn list_stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExamSession>, EngineError>;

    async fn save_answer(&self, answer: Answer) -> Result<Answer, EngineError>;

    async fn list_answers(&self, session_id: Id) -> Result<Vec<Answer>, EngineError>;

    async fn get_violation_summary(&self, session_id: Id) -> Result<ViolationSummary, EngineError>;

    async fn upsert_violation_summary(&self, summary: ViolationSummary) -> Result<(), EngineError>;

    async fn find_violation_summaries_by_sessions(
        &self,
        session_ids: &[Id],
    ) -> Result<Vec<ViolationSummary>, EngineError>;

    async fn insert_proctoring_event(&self, event: ProctoringEvent) -> Result<(), EngineError>;

    /// Newest-first page of proctoring events for a session, for the
    /// behavior-events endpoint.
    async fn list_proctoring_events(
        &self,
        session_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProctoringEvent>, EngineError>;

    /// Object keys (bucket-relative) for violation snapshots/audio clips
    /// older than `cutoff`, walked by the daily content-expiry sweep.
    async fn list_expired_object_keys(&self, cutoff: DateTime<Utc>) -> Result<Vec<(String, String)>, EngineError>;

    async fn insert_behavior_event(&self, event: BehaviorEvent) -> Result<(), EngineError>;

    /// Newest-first page of raw behavior events for a session, independent
    /// of whether a quick rule or the inference consumer ever turned one
    /// into a `ProctoringEvent`.
    async fn list_behavior_events(
        &self,
        session_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BehaviorEvent>, EngineError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
