// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `StoreGateway` used by session-engine, ingestion, and
//! HTTP-surface tests. Mirrors the optimistic-concurrency and batch-read
//! contracts of [`super::postgres::PostgresStore`] without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::StoreGateway;
use crate::error::EngineError;
use crate::model::{
    Answer, BehaviorEvent, Exam, ExamEnrollment, ExamSession, ExamStatus, EnrollmentStatus, Id, ProctoringEvent,
    Question, User, ViolationSummary,
};

#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: HashMap<Id, User>,
    exams: HashMap<Id, Exam>,
    questions: HashMap<Id, Question>,
    enrollments: HashMap<Id, ExamEnrollment>,
    proctor_assignments: std::collections::HashSet<(Id, Id)>,
    sessions: HashMap<Id, ExamSession>,
    answers: HashMap<Id, Answer>,
    violation_summaries: HashMap<Id, ViolationSummary>,
    proctoring_events: Vec<ProctoringEvent>,
    behavior_events: Vec<BehaviorEvent>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    pub fn seed_exam(&self, exam: Exam) {
        self.inner.lock().unwrap().exams.insert(exam.id, exam);
    }

    pub fn seed_question(&self, question: Question) {
        self.inner.lock().unwrap().questions.insert(question.id, question);
    }

    pub fn seed_enrollment(&self, enrollment: ExamEnrollment) {
        self.inner.lock().unwrap().enrollments.insert(enrollment.id, enrollment);
    }

    pub fn seed_proctor_assignment(&self, user_id: Id, exam_id: Id) {
        self.inner.lock().unwrap().proctor_assignments.insert((user_id, exam_id));
    }
}

#[async_trait]
impl StoreGateway for InMemoryStore {
    async fn get_user(&self, id: Id) -> Result<User, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("user {id} not found")))
    }

    async fn get_exam(&self, id: Id) -> Result<Exam, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .exams
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("exam {id} not found")))
    }

    async fn list_exams_by_status(&self, status: ExamStatus) -> Result<Vec<Exam>, EngineError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .exams
            .values()
            .filter(|e| e.status == status && !e.is_deleted)
            .cloned()
            .collect())
    }

    async fn update_exam_status(&self, exam_id: Id, status: ExamStatus) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().unwrap();
        let exam = guard
            .exams
            .get_mut(&exam_id)
            .ok_or_else(|| EngineError::not_found(format!("exam {exam_id} not found")))?;
        exam.status = status;
        Ok(())
    }

    async fn list_questions(&self, exam_id: Id) -> Result<Vec<Question>, EngineError> {
        let mut questions: Vec<Question> = self
            .inner
            .lock()
            .unwrap()
            .questions
            .values()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn count_questions(&self, exam_id: Id) -> Result<i64, EngineError> {
        Ok(self.list_questions(exam_id).await?.len() as i64)
    }

    async fn find_questions_by_ids(&self, ids: &[Id]) -> Result<Vec<Question>, EngineError> {
        let guard = self.inner.lock().unwrap();
        Ok(ids.iter().filter_map(|id| guard.questions.get(id).cloned()).collect())
    }

    async fn get_enrollment(&self, id: Id) -> Result<ExamEnrollment, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .enrollments
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("enrollment {id} not found")))
    }

    async fn find_enrollment_by_exam_and_user(
        &self,
        exam_id: Id,
        user_id: Id,
    ) -> Result<Option<ExamEnrollment>, EngineError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .enrollments
            .values()
            .find(|e| e.exam_id == exam_id && e.user_id == user_id)
            .cloned())
    }

    async fn is_proctor_assigned(&self, user_id: Id, exam_id: Id) -> Result<bool, EngineError> {
        Ok(self.inner.lock().unwrap().proctor_assignments.contains(&(user_id, exam_id)))
    }

    async fn update_enrollment_status(&self, enrollment_id: Id, status: EnrollmentStatus) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().unwrap();
        let enrollment = guard
            .enrollments
            .get_mut(&enrollment_id)
            .ok_or_else(|| EngineError::not_found(format!("enrollment {enrollment_id} not found")))?;
        enrollment.status = status;
        Ok(())
    }

    async fn get_session(&self, id: Id) -> Result<ExamSession, EngineError> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(format!("session {id} not found")))
    }

    async fn find_active_session(&self, enrollment_id: Id) -> Result<Option<ExamSession>, EngineError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sessions
            .values()
            .find(|s| s.enrollment_id == enrollment_id && s.is_open())
            .cloned())
    }

    async fn insert_session(&self, session: ExamSession) -> Result<ExamSession, EngineError> {
        let mut guard = self.inner.lock().unwrap();
        guard.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn update_session(&self, mut session: ExamSession) -> Result<ExamSession, EngineError> {
        let mut guard = self.inner.lock().unwrap();
        let existing = guard
            .sessions
            .get(&session.id)
            .ok_or_else(|| EngineError::not_found(format!("session {} not found", session.id)))?;
        if existing.version != session.version {
            return Err(EngineError::concurrent_modification(format!(
                "session {} has version {} but caller expected {}",
                session.id, existing.version, session.version
            )));
        }
        session.version += 1;
        guard.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn list_sessions_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<ExamSession>, EngineError> {
        let guard = self.inner.lock().unwrap();
        let mut out = Vec::new();
        for session in guard.sessions.values().filter(|s| s.is_open()) {
            if let Some(exam) = guard.exams.get(&session.exam_id) {
                if now >= session.effective_deadline(exam.end_time) {
                    out.push(session.clone());
                }
            }
        }
        Ok(out)
    }

    async fn list_stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExamSession>, EngineError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sessions
            .values()
            .filter(|s| s.is_open() && s.last_heartbeat_at < cutoff)
            .cloned()
            .collect())
    }

    async fn save_answer(&self, answer: Answer) -> Result<Answer, EngineError> {
        let mut guard = self.inner.lock().unwrap();
        if let Some(existing) = guard
            .answers
            .values_mut()
            .find(|a| a.session_id == answer.session_id && a.question_id == answer.question_id)
        {
            *existing = answer.clone();
            return Ok(answer);
        }
        guard.answers.insert(answer.id, answer.clone());
        Ok(answer)
    }

    async fn list_answers(&self, session_id: Id) -> Result<Vec<Answer>, EngineError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .answers
            .values()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn get_violation_summary(&self, session_id: Id) -> Result<ViolationSummary, EngineError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .violation_summaries
            .get(&session_id)
            .cloned()
            .unwrap_or_else(|| ViolationSummary::empty(session_id)))
    }

    async fn upsert_violation_summary(&self, summary: ViolationSummary) -> Result<(), EngineError> {
        self.inner.lock().unwrap().violation_summaries.insert(summary.session_id, summary);
        Ok(())
    }

    async fn find_violation_summaries_by_sessions(
        &self,
        session_ids: &[Id],
    ) -> Result<Vec<ViolationSummary>, EngineError> {
        let guard = self.inner.lock().unwrap();
        Ok(session_ids
            .iter()
            .map(|id| {
                guard
                    .violation_summaries
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| ViolationSummary::empty(*id))
            })
            .collect())
    }

    async fn insert_proctoring_event(&self, event: ProctoringEvent) -> Result<(), EngineError> {
        self.inner.lock().unwrap().proctoring_events.push(event);
        Ok(())
    }

    async fn list_proctoring_events(
        &self,
        session_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProctoringEvent>, EngineError> {
        let guard = self.inner.lock().unwrap();
        let mut events: Vec<ProctoringEvent> =
            guard.proctoring_events.iter().filter(|e| e.session_id == session_id).cloned().collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events.into_iter().skip(offset.max(0) as usize).take(limit.max(0) as usize).collect())
    }

    async fn list_expired_object_keys(&self, cutoff: DateTime<Utc>) -> Result<Vec<(String, String)>, EngineError> {
        let guard = self.inner.lock().unwrap();
        Ok(guard
            .proctoring_events
            .iter()
            .filter(|e| e.created_at < cutoff)
            .filter_map(|e| e.snapshot_path.clone().map(|path| (crate::object_store::VIOLATION_SNAPSHOTS_BUCKET.to_owned(), path)))
            .collect())
    }

    async fn insert_behavior_event(&self, event: BehaviorEvent) -> Result<(), EngineError> {
        self.inner.lock().unwrap().behavior_events.push(event);
        Ok(())
    }

    async fn list_behavior_events(
        &self,
        session_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BehaviorEvent>, EngineError> {
        let guard = self.inner.lock().unwrap();
        let mut events: Vec<BehaviorEvent> =
            guard.behavior_events.iter().filter(|e| e.session_id == session_id).cloned().collect();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events.into_iter().skip(offset.max(0) as usize).take(limit.max(0) as usize).collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
