// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session Engine (C7): the eight student/proctor-facing operations that
//! drive an `ExamSession` through its lifecycle (spec §4.7). Every mutating
//! call ends in `StoreGateway::update_session`'s compare-and-swap, so a
//! heartbeat racing a suspend (for example) fails loudly with
//! `CONCURRENT_MODIFICATION` instead of silently clobbering the other
//! writer.

pub mod scoring;
pub mod shuffle;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::authz::{self, Principal};
use crate::cache::Cache;
use crate::error::EngineError;
use crate::inference_client::{IdentityVerdict, InferenceClient};
use crate::model::{Answer, ExamSession, Id, ProctoringEvent, Question, QuestionType, Severity};
use crate::realtime::{exam_queue_topic, proctor_topic, publish_event, RealtimeHub};
use crate::store::StoreGateway;

/// A started or resumed session plus the question order the student should
/// be shown, already filtered through the per-student shuffle.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStart {
    pub session: ExamSession,
    pub questions: Vec<Question>,
}

pub struct SessionEngine {
    store: Arc<dyn StoreGateway>,
    cache: Arc<dyn Cache>,
    inference: Arc<dyn InferenceClient>,
    hub: Arc<RealtimeHub>,
    heartbeat_timeout: Duration,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        cache: Arc<dyn Cache>,
        inference: Arc<dyn InferenceClient>,
        hub: Arc<RealtimeHub>,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self { store, cache, inference, hub, heartbeat_timeout }
    }

    async fn owned_open_session(&self, principal: &Principal, session_id: Id) -> Result<ExamSession, EngineError> {
        let session = self.store.get_session(session_id).await?;
        let proctor_assigned = self.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
        if !authz::is_owner(principal, &session, proctor_assigned) {
            return Err(EngineError::forbidden("not authorized for this session"));
        }
        Ok(session)
    }

    /// `startSession` — idempotent: a second call while a session is still
    /// open returns the same session and its cached question order rather
    /// than minting a duplicate attempt.
    pub async fn start_session(&self, principal: &Principal, exam_id: Id) -> Result<SessionStart, EngineError> {
        let exam = self.store.get_exam(exam_id).await?;
        let now = Utc::now();
        if !exam.is_active_for_entry(now) {
            return Err(EngineError::exam_not_active(format!("exam {exam_id} is not open for entry")));
        }

        let enrollment = self
            .store
            .find_enrollment_by_exam_and_user(exam_id, principal.user_id)
            .await?
            .ok_or_else(|| EngineError::forbidden("not enrolled in this exam"))?;
        if enrollment.status == crate::model::EnrollmentStatus::Flagged {
            return Err(EngineError::suspension_sticky("enrollment is flagged; a proctor must clear it first"));
        }
        if enrollment.status == crate::model::EnrollmentStatus::Completed {
            return Err(EngineError::session_conflict("enrollment has already completed this exam"));
        }

        if let Some(existing) = self.store.find_active_session(enrollment.id).await? {
            if existing.is_suspended {
                return Err(EngineError::suspension_sticky(
                    "session is suspended; a proctor must reinstate it before resuming",
                ));
            }
            let questions = self.ordered_questions(exam_id, principal.user_id, exam.shuffle_questions).await?;
            return Ok(SessionStart { session: existing, questions });
        }

        let questions_ttl = Duration::from_secs((exam.duration_minutes.max(0) as u64) * 60 + 3600);
        let all_questions = self.store.list_questions(exam_id).await?;
        let order = shuffle::question_order(exam_id, principal.user_id, &all_questions, exam.shuffle_questions);
        self.cache
            .set_question_order_if_absent(exam_id, principal.user_id, &order, questions_ttl)
            .await?;
        let questions = self.ordered_questions(exam_id, principal.user_id, exam.shuffle_questions).await?;

        let session = ExamSession {
            id: Id::new_v4(),
            enrollment_id: enrollment.id,
            exam_id,
            user_id: principal.user_id,
            started_at: now,
            submitted_at: None,
            last_heartbeat_at: now,
            identity_verified: false,
            is_suspended: false,
            suspension_reason: None,
            suspended_at: None,
            extended_end_at: None,
            ip_address: None,
            user_agent: None,
            score: None,
            is_passed: None,
            version: 0,
        };
        let session = self.store.insert_session(session).await?;
        self.cache.mark_session_active(session.id, self.heartbeat_timeout).await?;
        self.store
            .update_enrollment_status(enrollment.id, crate::model::EnrollmentStatus::Ongoing)
            .await?;

        Ok(SessionStart { session, questions })
    }

    async fn ordered_questions(
        &self,
        exam_id: Id,
        user_id: Id,
        shuffle_questions: bool,
    ) -> Result<Vec<Question>, EngineError> {
        let all_questions = self.store.list_questions(exam_id).await?;
        let order = match self.cache.get_question_order(exam_id, user_id).await? {
            Some(order) => order,
            None => shuffle::question_order(exam_id, user_id, &all_questions, shuffle_questions),
        };
        let by_id: std::collections::HashMap<Id, Question> =
            all_questions.into_iter().map(|q| (q.id, q)).collect();
        Ok(order.into_iter().filter_map(|id| by_id.get(&id).cloned()).collect())
    }

    /// `heartbeat` — the stale-session closer uses `last_heartbeat_at`
    /// staleness to find abandoned attempts, so every liveness signal from
    /// the client must land here.
    pub async fn heartbeat(&self, principal: &Principal, session_id: Id) -> Result<ExamSession, EngineError> {
        let mut session = self.owned_open_session(principal, session_id).await?;
        if !session.is_open() {
            return Err(EngineError::session_conflict("session has already been submitted"));
        }
        if session.is_suspended {
            return Err(EngineError::session_suspended("session is suspended"));
        }
        session.last_heartbeat_at = Utc::now();
        let session = self.store.update_session(session).await?;
        self.cache.mark_session_active(session.id, self.heartbeat_timeout).await?;
        Ok(session)
    }

    /// `saveAnswer` — MCQs grade immediately (spec §4.7.1); short answers
    /// are stored ungraded and wait for `grade_short_answer`.
    pub async fn save_answer(
        &self,
        principal: &Principal,
        session_id: Id,
        question_id: Id,
        selected_answer: Option<String>,
        text_answer: Option<String>,
    ) -> Result<Answer, EngineError> {
        let session = self.owned_open_session(principal, session_id).await?;
        if !session.is_open() {
            return Err(EngineError::session_conflict("session has already been submitted"));
        }
        if session.is_suspended {
            return Err(EngineError::session_suspended("session is suspended"));
        }

        let question = self.question_in_exam(session.exam_id, question_id).await?;

        let marks_awarded = scoring::grade_mcq(&question, selected_answer.as_deref());
        let answer = Answer {
            id: Id::new_v4(),
            session_id,
            question_id,
            selected_answer,
            text_answer,
            marks_awarded,
            grading_comment: None,
        };
        self.store.save_answer(answer).await
    }

    async fn question_in_exam(&self, exam_id: Id, question_id: Id) -> Result<Question, EngineError> {
        let questions = self.store.find_questions_by_ids(&[question_id]).await?;
        let question = questions
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::not_found(format!("question {question_id} not found")))?;
        if question.exam_id != exam_id {
            return Err(EngineError::question_not_in_exam(format!(
                "question {question_id} does not belong to exam {exam_id}"
            )));
        }
        Ok(question)
    }

    /// `submitSession` — finalizes the score from whatever is graded so
    /// far; a still-ungraded short answer simply doesn't contribute until
    /// `grade_short_answer` runs.
    pub async fn submit_session(&self, principal: &Principal, session_id: Id) -> Result<ExamSession, EngineError> {
        let mut session = self.owned_open_session(principal, session_id).await?;
        if !session.is_open() {
            return Err(EngineError::session_conflict("session has already been submitted"));
        }
        if session.is_suspended {
            return Err(EngineError::session_suspended(
                "session is suspended; a proctor must reinstate it before it can be submitted",
            ));
        }

        let exam = self.store.get_exam(session.exam_id).await?;
        let answers = self.store.list_answers(session_id).await?;
        let score = scoring::total_score(&answers);

        session.submitted_at = Some(Utc::now());
        session.score = Some(score);
        session.is_passed = Some(scoring::is_passed(score, exam.passing_marks));
        let session = self.store.update_session(session).await?;

        self.cache.clear_session_active(session.id).await?;
        self.cache.risk_window_clear(session.id).await?;
        self.store
            .update_enrollment_status(session.enrollment_id, crate::model::EnrollmentStatus::Completed)
            .await?;
        publish_event(
            &self.hub,
            &proctor_topic(session.exam_id),
            "SESSION_SUBMITTED",
            session.id,
            serde_json::json!({ "score": session.score, "isPassed": session.is_passed }),
        );
        Ok(session)
    }

    /// System-triggered submit used by the end-of-exam and stale-session
    /// scheduled transitioners: same finalization as `submit_session`, minus
    /// the ownership check since there is no principal behind a scheduler
    /// tick. A session a scheduler decides to close is, by construction,
    /// already past its deadline or abandoned.
    pub async fn auto_submit_session(&self, session_id: Id) -> Result<ExamSession, EngineError> {
        let mut session = self.store.get_session(session_id).await?;
        if !session.is_open() {
            return Ok(session);
        }

        let exam = self.store.get_exam(session.exam_id).await?;
        let answers = self.store.list_answers(session_id).await?;
        let score = scoring::total_score(&answers);

        session.submitted_at = Some(Utc::now());
        session.score = Some(score);
        session.is_passed = Some(scoring::is_passed(score, exam.passing_marks));
        let session = self.store.update_session(session).await?;

        self.cache.clear_session_active(session.id).await?;
        self.cache.risk_window_clear(session.id).await?;
        self.store
            .update_enrollment_status(session.enrollment_id, crate::model::EnrollmentStatus::Completed)
            .await?;
        publish_event(
            &self.hub,
            &proctor_topic(session.exam_id),
            "SESSION_SUBMITTED",
            session.id,
            serde_json::json!({ "score": session.score, "isPassed": session.is_passed }),
        );
        Ok(session)
    }

    /// `suspendSession` — committed as its own unit of work so it survives
    /// even if the caller (the rolling-window auto-suspend trigger inside
    /// the inference consumer) later rolls back the rest of its processing
    /// (spec §4.9 step 7).
    pub async fn suspend_session(&self, session_id: Id, reason: impl Into<String>) -> Result<ExamSession, EngineError> {
        let mut session = self.store.get_session(session_id).await?;
        if session.is_suspended {
            return Ok(session);
        }
        session.is_suspended = true;
        let reason = reason.into();
        session.suspension_reason = Some(reason.clone());
        session.suspended_at = Some(Utc::now());
        let session = self.store.update_session(session).await?;
        self.cache.risk_window_clear(session.id).await?;
        self.store
            .update_enrollment_status(session.enrollment_id, crate::model::EnrollmentStatus::Flagged)
            .await?;
        publish_event(
            &self.hub,
            &exam_queue_topic(session.id, "suspend"),
            "SESSION_SUSPENDED",
            session.id,
            serde_json::json!({ "reason": reason }),
        );
        publish_event(
            &self.hub,
            &proctor_topic(session.exam_id),
            "SESSION_SUSPENDED",
            session.id,
            serde_json::json!({ "severity": "CRITICAL", "reason": reason }),
        );
        Ok(session)
    }

    /// `reinstateSession` — an assigned proctor or admin action. Refuses a
    /// session whose *original* deadline has already passed; an extension
    /// only ever grows from `exam.endTime`, never from a deadline that was
    /// itself already an extension (spec §4.7 Open Questions: the current
    /// model does not allow reinstating past the original end time).
    pub async fn reinstate_session(
        &self,
        principal: &Principal,
        session_id: Id,
        reason: Option<String>,
    ) -> Result<ExamSession, EngineError> {
        let mut session = self.store.get_session(session_id).await?;
        let proctor_assigned = self.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
        if !authz::is_assigned_proctor(principal, proctor_assigned) {
            return Err(EngineError::forbidden("only an assigned proctor or admin may reinstate a session"));
        }
        if !session.is_suspended {
            return Err(EngineError::business(
                crate::error::ErrorCode::Precondition,
                "NOT_SUSPENDED",
                "session is not currently suspended",
            ));
        }
        if session.submitted_at.is_some() {
            return Err(EngineError::session_conflict("session has already been submitted"));
        }
        let exam = self.store.get_exam(session.exam_id).await?;
        let now = Utc::now();
        if now >= exam.end_time {
            return Err(EngineError::exam_not_active("exam has already ended; a suspended session cannot be reinstated"));
        }

        let suspended_since = session.suspended_at.unwrap_or(session.last_heartbeat_at);
        let suspended_duration = now - suspended_since;
        let extended_end_at = exam.end_time + suspended_duration;

        session.is_suspended = false;
        session.suspension_reason = None;
        session.suspended_at = None;
        session.extended_end_at = Some(extended_end_at);
        let session = self.store.update_session(session).await?;

        let presence_ttl = (extended_end_at - now)
            .to_std()
            .unwrap_or_default()
            .max(Duration::from_secs(300));
        self.cache.mark_session_active(session.id, presence_ttl).await?;
        self.cache.risk_window_clear(session.id).await?;
        self.store
            .update_enrollment_status(session.enrollment_id, crate::model::EnrollmentStatus::Ongoing)
            .await?;

        let note = serde_json::json!({ "extendedEndAt": extended_end_at, "reason": reason });
        publish_event(&self.hub, &exam_queue_topic(session.id, "suspend"), "SESSION_REINSTATED", session.id, note.clone());
        publish_event(&self.hub, &proctor_topic(session.exam_id), "SESSION_REINSTATED", session.id, note);
        Ok(session)
    }

    /// `verifySession` (identity check) — the one inference call the
    /// session engine makes synchronously; everything else arrives later
    /// over the message bus via [`crate::inference_consumer`].
    pub async fn verify_identity(
        &self,
        principal: &Principal,
        session_id: Id,
        reference_photo_key: &str,
        live_capture_key: &str,
    ) -> Result<IdentityVerdict, EngineError> {
        let mut session = self.owned_open_session(principal, session_id).await?;
        let verdict = self
            .inference
            .verify_identity(session_id, reference_photo_key, live_capture_key)
            .await?;

        session.identity_verified = verdict.matched;
        self.store.update_session(session).await?;

        if !verdict.matched {
            self.store
                .insert_proctoring_event(ProctoringEvent {
                    id: Id::new_v4(),
                    session_id,
                    event_type: crate::model::EventType::IdentityMismatch,
                    severity: Severity::High,
                    confidence: Some(verdict.confidence),
                    description: Some("live capture did not match the enrolled reference photo".into()),
                    snapshot_path: Some(live_capture_key.to_owned()),
                    source: crate::model::EventSource::System,
                    metadata: serde_json::Value::Null,
                    created_at: Utc::now(),
                })
                .await?;
            publish_event(
                &self.hub,
                &proctor_topic(session.exam_id),
                "IDENTITY_MISMATCH",
                session_id,
                serde_json::json!({ "severity": "CRITICAL", "confidence": verdict.confidence }),
            );
        }

        Ok(verdict)
    }

    /// `gradeShortAnswer` — proctor/admin manual grading. Only valid once a
    /// session has been submitted; recomputes the session's score in place
    /// once graded.
    pub async fn grade_short_answer(
        &self,
        principal: &Principal,
        session_id: Id,
        question_id: Id,
        marks_awarded: f64,
        comment: Option<String>,
    ) -> Result<Answer, EngineError> {
        let session = self.store.get_session(session_id).await?;
        let proctor_assigned = self.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
        if !authz::is_assigned_proctor(principal, proctor_assigned) {
            return Err(EngineError::forbidden("only an assigned proctor or admin may grade answers"));
        }

        if session.is_open() {
            return Err(EngineError::validation("a session must be submitted before its answers can be graded"));
        }

        let question = self.question_in_exam(session.exam_id, question_id).await?;
        if question.question_type != QuestionType::ShortAnswer {
            return Err(EngineError::validation("only short-answer questions require manual grading"));
        }
        if !(0.0..=question.marks).contains(&marks_awarded) {
            return Err(EngineError::validation(format!(
                "marks_awarded must be between 0 and {}",
                question.marks
            )));
        }

        let answers = self.store.list_answers(session_id).await?;
        let mut answer = answers
            .into_iter()
            .find(|a| a.question_id == question_id)
            .ok_or_else(|| EngineError::not_found("no answer submitted for this question"))?;
        answer.marks_awarded = Some(marks_awarded);
        answer.grading_comment = comment;
        let answer = self.store.save_answer(answer).await?;
        self.recompute_score_if_submitted(session).await?;
        Ok(answer)
    }

    async fn recompute_score_if_submitted(&self, mut session: ExamSession) -> Result<(), EngineError> {
        let exam = self.store.get_exam(session.exam_id).await?;
        let answers = self.store.list_answers(session.id).await?;
        let score = scoring::total_score(&answers);
        session.score = Some(score);
        session.is_passed = Some(scoring::is_passed(score, exam.passing_marks));
        self.store.update_session(session).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
