// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Postgres-backed `StoreGateway`. Queries run against plain `TEXT` row
//! representations of the domain's closed-vocabulary enums and are mapped
//! into typed entities at the boundary, so `model.rs` stays free of
//! persistence-specific derives.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};

use super::StoreGateway;
use crate::error::EngineError;
use crate::model::{
    Answer, BehaviorEvent, Exam, ExamEnrollment, ExamSession, ExamStatus, ExamStatus as Status, Id,
    ProctoringEvent, Question, User, ViolationSummary,
};

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(e: sqlx::Error) -> EngineError {
    EngineError::Store(e.to_string())
}

fn parse_exam_status(raw: &str) -> ExamStatus {
    match raw {
        "published" => Status::Published,
        "ongoing" => Status::Ongoing,
        "completed" => Status::Completed,
        _ => Status::Draft,
    }
}

fn exam_status_str(status: ExamStatus) -> &'static str {
    match status {
        Status::Draft => "draft",
        Status::Published => "published",
        Status::Ongoing => "ongoing",
        Status::Completed => "completed",
    }
}

fn enrollment_status_str(status: crate::model::EnrollmentStatus) -> &'static str {
    use crate::model::EnrollmentStatus::*;
    match status {
        Registered => "registered",
        Ongoing => "ongoing",
        Completed => "completed",
        Flagged => "flagged",
        Absent => "absent",
    }
}

#[derive(FromRow)]
struct ExamRow {
    id: Id,
    title: String,
    subject: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i32,
    total_marks: f64,
    passing_marks: f64,
    shuffle_questions: bool,
    shuffle_options: bool,
    allow_late_entry: bool,
    status: String,
    is_deleted: bool,
}

impl From<ExamRow> for Exam {
    fn from(row: ExamRow) -> Self {
        Exam {
            id: row.id,
            title: row.title,
            subject: row.subject,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_minutes: row.duration_minutes,
            total_marks: row.total_marks,
            passing_marks: row.passing_marks,
            shuffle_questions: row.shuffle_questions,
            shuffle_options: row.shuffle_options,
            allow_late_entry: row.allow_late_entry,
            status: parse_exam_status(&row.status),
            is_deleted: row.is_deleted,
        }
    }
}

#[async_trait]
impl StoreGateway for PostgresStore {
    async fn get_user(&self, id: Id) -> Result<User, EngineError> {
        let row = sqlx::query("SELECT id, email, role, deactivated FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| EngineError::not_found(format!("user {id} not found")))?;

        let role_raw: String = row.try_get("role").map_err(store_err)?;
        Ok(User {
            id: row.try_get("id").map_err(store_err)?,
            email: row.try_get("email").map_err(store_err)?,
            role: match role_raw.as_str() {
                "proctor" => crate::model::Role::Proctor,
                "admin" => crate::model::Role::Admin,
                _ => crate::model::Role::Student,
            },
            deactivated: row.try_get("deactivated").map_err(store_err)?,
        })
    }

    async fn get_exam(&self, id: Id) -> Result<Exam, EngineError> {
        sqlx::query_as::<_, ExamRow>(
            "SELECT id, title, subject, start_time, end_time, duration_minutes, total_marks, \
             passing_marks, shuffle_questions, shuffle_options, allow_late_entry, status, is_deleted \
             FROM exams WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?
        .map(Exam::from)
        .ok_or_else(|| EngineError::not_found(format!("exam {id} not found")))
    }

    async fn list_exams_by_status(&self, status: ExamStatus) -> Result<Vec<Exam>, EngineError> {
        let rows = sqlx::query_as::<_, ExamRow>(
            "SELECT id, title, subject, start_time, end_time, duration_minutes, total_marks, \
             passing_marks, shuffle_questions, shuffle_options, allow_late_entry, status, is_deleted \
             FROM exams WHERE status = $1 AND is_deleted = false",
        )
        .bind(exam_status_str(status))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(Exam::from).collect())
    }

    async fn update_exam_status(&self, exam_id: Id, status: ExamStatus) -> Result<(), EngineError> {
        sqlx::query("UPDATE exams SET status = $1 WHERE id = $2")
            .bind(exam_status_str(status))
            .bind(exam_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn list_questions(&self, exam_id: Id) -> Result<Vec<Question>, EngineError> {
        self.find_questions_for_exam(exam_id).await
    }

    async fn count_questions(&self, exam_id: Id) -> Result<i64, EngineError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions WHERE exam_id = $1")
            .bind(exam_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        row.try_get("n").map_err(store_err)
    }

    async fn find_questions_by_ids(&self, ids: &[Id]) -> Result<Vec<Question>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, exam_id, question_type, options, correct_answer, marks, negative_marks, \
             order_index FROM questions WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(row_to_question).collect()
    }

    async fn get_enrollment(&self, id: Id) -> Result<ExamEnrollment, EngineError> {
        let row = sqlx::query("SELECT id, exam_id, user_id, status FROM exam_enrollments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| EngineError::not_found(format!("enrollment {id} not found")))?;
        row_to_enrollment(row)
    }

    async fn find_enrollment_by_exam_and_user(
        &self,
        exam_id: Id,
        user_id: Id,
    ) -> Result<Option<ExamEnrollment>, EngineError> {
        let row = sqlx::query(
            "SELECT id, exam_id, user_id, status FROM exam_enrollments WHERE exam_id = $1 AND user_id = $2",
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.map(row_to_enrollment).transpose()
    }

    async fn update_enrollment_status(
        &self,
        enrollment_id: Id,
        status: crate::model::EnrollmentStatus,
    ) -> Result<(), EngineError> {
        sqlx::query("UPDATE exam_enrollments SET status = $1 WHERE id = $2")
            .bind(enrollment_status_str(status))
            .bind(enrollment_id)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn is_proctor_assigned(&self, user_id: Id, exam_id: Id) -> Result<bool, EngineError> {
        let row = sqlx::query(
            "SELECT EXISTS(SELECT 1 FROM exam_proctors WHERE user_id = $1 AND exam_id = $2) AS assigned",
        )
        .bind(user_id)
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row.try_get("assigned").map_err(store_err)
    }

    async fn get_session(&self, id: Id) -> Result<ExamSession, EngineError> {
        let row = sqlx::query(SESSION_COLUMNS_SELECT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| EngineError::not_found(format!("session {id} not found")))?;
        row_to_session(row)
    }

    async fn find_active_session(&self, enrollment_id: Id) -> Result<Option<ExamSession>, EngineError> {
        let sql = "SELECT id, enrollment_id, exam_id, user_id, started_at, submitted_at, \
                    last_heartbeat_at, identity_verified, is_suspended, suspension_reason, \
                    suspended_at, extended_end_at, ip_address, user_agent, score, is_passed, version \
                    FROM exam_sessions WHERE enrollment_id = $1 AND submitted_at IS NULL";
        let row = sqlx::query(sql)
            .bind(enrollment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(row_to_session).transpose()
    }

    async fn insert_session(&self, session: ExamSession) -> Result<ExamSession, EngineError> {
        sqlx::query(
            "INSERT INTO exam_sessions (id, enrollment_id, exam_id, user_id, started_at, \
             last_heartbeat_at, identity_verified, is_suspended, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(session.id)
        .bind(session.enrollment_id)
        .bind(session.exam_id)
        .bind(session.user_id)
        .bind(session.started_at)
        .bind(session.last_heartbeat_at)
        .bind(session.identity_verified)
        .bind(session.is_suspended)
        .bind(session.version)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(session)
    }

    async fn update_session(&self, mut session: ExamSession) -> Result<ExamSession, EngineError> {
        let result = sqlx::query(
            "UPDATE exam_sessions SET submitted_at = $1, last_heartbeat_at = $2, identity_verified = $3, \
             is_suspended = $4, suspension_reason = $5, suspended_at = $6, extended_end_at = $7, \
             ip_address = $8, user_agent = $9, score = $10, is_passed = $11, version = version + 1 \
             WHERE id = $12 AND version = $13",
        )
        .bind(session.submitted_at)
        .bind(session.last_heartbeat_at)
        .bind(session.identity_verified)
        .bind(session.is_suspended)
        .bind(&session.suspension_reason)
        .bind(session.suspended_at)
        .bind(session.extended_end_at)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.score)
        .bind(session.is_passed)
        .bind(session.id)
        .bind(session.version)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(EngineError::concurrent_modification(format!(
                "session {} was modified by another writer",
                session.id
            )));
        }
        session.version += 1;
        Ok(session)
    }

    async fn list_sessions_past_deadline(&self, now: DateTime<Utc>) -> Result<Vec<ExamSession>, EngineError> {
        let sql = "SELECT s.id, s.enrollment_id, s.exam_id, s.user_id, s.started_at, s.submitted_at, \
                    s.last_heartbeat_at, s.identity_verified, s.is_suspended, s.suspension_reason, \
                    s.suspended_at, s.extended_end_at, s.ip_address, s.user_agent, s.score, s.is_passed, \
                    s.version FROM exam_sessions s JOIN exams e ON e.id = s.exam_id \
                    WHERE s.submitted_at IS NULL AND $1 >= COALESCE(s.extended_end_at, e.end_time)";
        let rows = sqlx::query(sql).bind(now).fetch_all(&self.pool).await.map_err(store_err)?;
        rows.into_iter().map(row_to_session).collect()
    }

    async fn list_stale_sessions(&self, cutoff: DateTime<Utc>) -> Result<Vec<ExamSession>, EngineError> {
        let sql = format!(
            "{} FROM exam_sessions WHERE submitted_at IS NULL AND last_heartbeat_at < $1",
            "SELECT id, enrollment_id, exam_id, user_id, started_at, submitted_at, last_heartbeat_at, \
             identity_verified, is_suspended, suspension_reason, suspended_at, extended_end_at, \
             ip_address, user_agent, score, is_passed, version"
        );
        let rows = sqlx::query(&sql).bind(cutoff).fetch_all(&self.pool).await.map_err(store_err)?;
        rows.into_iter().map(row_to_session).collect()
    }

    async fn save_answer(&self, answer: Answer) -> Result<Answer, EngineError> {
        sqlx::query(
            "INSERT INTO answers (id, session_id, question_id, selected_answer, text_answer) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (session_id, question_id) \
             DO UPDATE SET selected_answer = EXCLUDED.selected_answer, text_answer = EXCLUDED.text_answer",
        )
        .bind(answer.id)
        .bind(answer.session_id)
        .bind(answer.question_id)
        .bind(&answer.selected_answer)
        .bind(&answer.text_answer)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(answer)
    }

    async fn list_answers(&self, session_id: Id) -> Result<Vec<Answer>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, session_id, question_id, selected_answer, text_answer, marks_awarded, \
             grading_comment FROM answers WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(row_to_answer).collect()
    }

    async fn get_violation_summary(&self, session_id: Id) -> Result<ViolationSummary, EngineError> {
        let row = sqlx::query("SELECT payload FROM violation_summaries WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        match row {
            Some(row) => {
                let payload: serde_json::Value = row.try_get("payload").map_err(store_err)?;
                serde_json::from_value(payload)
                    .map_err(|e| EngineError::Store(format!("corrupt violation summary: {e}")))
            }
            None => Ok(ViolationSummary::empty(session_id)),
        }
    }

    async fn upsert_violation_summary(&self, summary: ViolationSummary) -> Result<(), EngineError> {
        let payload = serde_json::to_value(&summary)
            .map_err(|e| EngineError::Store(format!("could not serialize violation summary: {e}")))?;
        sqlx::query(
            "INSERT INTO violation_summaries (session_id, payload) VALUES ($1, $2) \
             ON CONFLICT (session_id) DO UPDATE SET payload = EXCLUDED.payload",
        )
        .bind(summary.session_id)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn find_violation_summaries_by_sessions(
        &self,
        session_ids: &[Id],
    ) -> Result<Vec<ViolationSummary>, EngineError> {
        let rows = sqlx::query("SELECT session_id, payload FROM violation_summaries WHERE session_id = ANY($1)")
            .bind(session_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        let mut found: std::collections::HashMap<Id, ViolationSummary> = std::collections::HashMap::new();
        for row in rows {
            let session_id: Id = row.try_get("session_id").map_err(store_err)?;
            let payload: serde_json::Value = row.try_get("payload").map_err(store_err)?;
            let summary = serde_json::from_value(payload)
                .map_err(|e| EngineError::Store(format!("corrupt violation summary: {e}")))?;
            found.insert(session_id, summary);
        }
        Ok(session_ids
            .iter()
            .map(|id| found.remove(id).unwrap_or_else(|| ViolationSummary::empty(*id)))
            .collect())
    }

    async fn insert_proctoring_event(&self, event: ProctoringEvent) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO proctoring_events (id, session_id, event_type, severity, confidence, \
             description, snapshot_path, source, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(event.id)
        .bind(event.session_id)
        .bind(event.event_type.as_str())
        .bind(format!("{:?}", event.severity).to_uppercase())
        .bind(event.confidence)
        .bind(&event.description)
        .bind(&event.snapshot_path)
        .bind(format!("{:?}", event.source).to_lowercase())
        .bind(&event.metadata)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_proctoring_events(
        &self,
        session_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProctoringEvent>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, session_id, event_type, severity, confidence, description, snapshot_path, \
             source, metadata, created_at FROM proctoring_events WHERE session_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(session_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(row_to_proctoring_event).collect()
    }

    async fn list_expired_object_keys(&self, cutoff: DateTime<Utc>) -> Result<Vec<(String, String)>, EngineError> {
        let rows = sqlx::query(
            "SELECT snapshot_path FROM proctoring_events WHERE created_at < $1 AND snapshot_path IS NOT NULL",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter()
            .map(|row| {
                let path: String = row.try_get("snapshot_path").map_err(store_err)?;
                Ok((crate::object_store::VIOLATION_SNAPSHOTS_BUCKET.to_owned(), path))
            })
            .collect()
    }

    async fn insert_behavior_event(&self, event: BehaviorEvent) -> Result<(), EngineError> {
        sqlx::query(
            "INSERT INTO behavior_events (id, session_id, event_type, metadata, timestamp) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event.id)
        .bind(event.session_id)
        .bind(&event.event_type)
        .bind(&event.metadata)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn list_behavior_events(
        &self,
        session_id: Id,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BehaviorEvent>, EngineError> {
        let rows = sqlx::query_as::<_, BehaviorEventRow>(
            "SELECT id, session_id, event_type, metadata, timestamp FROM behavior_events \
             WHERE session_id = $1 ORDER BY timestamp DESC LIMIT $2 OFFSET $3",
        )
        .bind(session_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.into_iter().map(BehaviorEvent::from).collect())
    }
}

#[derive(FromRow)]
struct BehaviorEventRow {
    id: Id,
    session_id: Id,
    event_type: String,
    metadata: serde_json::Value,
    timestamp: DateTime<Utc>,
}

impl From<BehaviorEventRow> for BehaviorEvent {
    fn from(row: BehaviorEventRow) -> Self {
        BehaviorEvent {
            id: row.id,
            session_id: row.session_id,
            event_type: row.event_type,
            metadata: row.metadata,
            timestamp: row.timestamp,
        }
    }
}

const SESSION_COLUMNS_SELECT: &str = "SELECT id, enrollment_id, exam_id, user_id, started_at, submitted_at, \
     last_heartbeat_at, identity_verified, is_suspended, suspension_reason, suspended_at, \
     extended_end_at, ip_address, user_agent, score, is_passed, version FROM exam_sessions WHERE id = $1";

impl PostgresStore {
    async fn find_questions_for_exam(&self, exam_id: Id) -> Result<Vec<Question>, EngineError> {
        let rows = sqlx::query(
            "SELECT id, exam_id, question_type, options, correct_answer, marks, negative_marks, \
             order_index FROM questions WHERE exam_id = $1 ORDER BY order_index",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(row_to_question).collect()
    }
}

fn row_to_question(row: sqlx::postgres::PgRow) -> Result<Question, EngineError> {
    let question_type: String = row.try_get("question_type").map_err(store_err)?;
    let options_json: serde_json::Value = row.try_get("options").map_err(store_err)?;
    Ok(Question {
        id: row.try_get("id").map_err(store_err)?,
        exam_id: row.try_get("exam_id").map_err(store_err)?,
        question_type: if question_type == "short_answer" {
            crate::model::QuestionType::ShortAnswer
        } else {
            crate::model::QuestionType::Mcq
        },
        options: serde_json::from_value(options_json).unwrap_or_default(),
        correct_answer: row.try_get("correct_answer").map_err(store_err)?,
        marks: row.try_get("marks").map_err(store_err)?,
        negative_marks: row.try_get("negative_marks").map_err(store_err)?,
        order_index: row.try_get("order_index").map_err(store_err)?,
    })
}

fn row_to_enrollment(row: sqlx::postgres::PgRow) -> Result<ExamEnrollment, EngineError> {
    let status: String = row.try_get("status").map_err(store_err)?;
    Ok(ExamEnrollment {
        id: row.try_get("id").map_err(store_err)?,
        exam_id: row.try_get("exam_id").map_err(store_err)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        status: match status.as_str() {
            "ongoing" => crate::model::EnrollmentStatus::Ongoing,
            "completed" => crate::model::EnrollmentStatus::Completed,
            "flagged" => crate::model::EnrollmentStatus::Flagged,
            "absent" => crate::model::EnrollmentStatus::Absent,
            _ => crate::model::EnrollmentStatus::Registered,
        },
    })
}

fn row_to_session(row: sqlx::postgres::PgRow) -> Result<ExamSession, EngineError> {
    Ok(ExamSession {
        id: row.try_get("id").map_err(store_err)?,
        enrollment_id: row.try_get("enrollment_id").map_err(store_err)?,
        exam_id: row.try_get("exam_id").map_err(store_err)?,
        user_id: row.try_get("user_id").map_err(store_err)?,
        started_at: row.try_get("started_at").map_err(store_err)?,
        submitted_at: row.try_get("submitted_at").map_err(store_err)?,
        last_heartbeat_at: row.try_get("last_heartbeat_at").map_err(store_err)?,
        identity_verified: row.try_get("identity_verified").map_err(store_err)?,
        is_suspended: row.try_get("is_suspended").map_err(store_err)?,
        suspension_reason: row.try_get("suspension_reason").map_err(store_err)?,
        suspended_at: row.try_get("suspended_at").map_err(store_err)?,
        extended_end_at: row.try_get("extended_end_at").map_err(store_err)?,
        ip_address: row.try_get("ip_address").map_err(store_err)?,
        user_agent: row.try_get("user_agent").map_err(store_err)?,
        score: row.try_get("score").map_err(store_err)?,
        is_passed: row.try_get("is_passed").map_err(store_err)?,
        version: row.try_get("version").map_err(store_err)?,
    })
}

fn row_to_proctoring_event(row: sqlx::postgres::PgRow) -> Result<ProctoringEvent, EngineError> {
    let event_type: String = row.try_get("event_type").map_err(store_err)?;
    let severity: String = row.try_get("severity").map_err(store_err)?;
    let source: String = row.try_get("source").map_err(store_err)?;
    Ok(ProctoringEvent {
        id: row.try_get("id").map_err(store_err)?,
        session_id: row.try_get("session_id").map_err(store_err)?,
        event_type: crate::model::EventType::parse(&event_type)
            .ok_or_else(|| EngineError::Store(format!("corrupt event type: {event_type}")))?,
        severity: match severity.as_str() {
            "LOW" => crate::model::Severity::Low,
            "HIGH" => crate::model::Severity::High,
            "CRITICAL" => crate::model::Severity::Critical,
            _ => crate::model::Severity::Medium,
        },
        confidence: row.try_get("confidence").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        snapshot_path: row.try_get("snapshot_path").map_err(store_err)?,
        source: match source.as_str() {
            "ai" => crate::model::EventSource::Ai,
            "browser" => crate::model::EventSource::Browser,
            "manual" => crate::model::EventSource::Manual,
            _ => crate::model::EventSource::System,
        },
        metadata: row.try_get("metadata").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

fn row_to_answer(row: sqlx::postgres::PgRow) -> Result<Answer, EngineError> {
    Ok(Answer {
        id: row.try_get("id").map_err(store_err)?,
        session_id: row.try_get("session_id").map_err(store_err)?,
        question_id: row.try_get("question_id").map_err(store_err)?,
        selected_answer: row.try_get("selected_answer").map_err(store_err)?,
        text_answer: row.try_get("text_answer").map_err(store_err)?,
        marks_awarded: row.try_get("marks_awarded").map_err(store_err)?,
        grading_comment: row.try_get("grading_comment").map_err(store_err)?,
    })
}
