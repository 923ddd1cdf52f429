// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proctoring dashboard routes (spec §6): manual flagging, the violation
//! summary, and the paginated behavior-event feed a proctor or admin reads
//! for a session. All three require the caller be an admin or a proctor
//! assigned to the session's exam.

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::authz::{self, Principal};
use crate::error::EngineError;
use crate::http::state::AppState;
use crate::model::{BehaviorEvent, EventSource, EventType, Id, ProctoringEvent, Severity, ViolationSummary};
use crate::realtime::{proctor_topic, publish_event};

async fn require_assigned_proctor(state: &AppState, principal: &Principal, session_id: Id) -> Result<crate::model::ExamSession, EngineError> {
    let session = state.store.get_session(session_id).await?;
    let proctor_assigned = state.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
    if !authz::is_assigned_proctor(principal, proctor_assigned) {
        return Err(EngineError::forbidden("only an assigned proctor or admin may access this session's proctoring data"));
    }
    Ok(session)
}

#[derive(Debug, Deserialize)]
pub struct FlagRequest {
    #[serde(default)]
    note: Option<String>,
}

/// `POST /api/proctoring/sessions/{id}/flag` — appends a MANUAL_FLAG event
/// and folds it into the session's violation summary (spec §6 table).
pub async fn flag(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
    Json(body): Json<FlagRequest>,
) -> Result<Json<ProctoringEvent>, EngineError> {
    let session = require_assigned_proctor(&state, &principal, session_id).await?;

    let event = ProctoringEvent {
        id: Id::new_v4(),
        session_id,
        event_type: EventType::ManualFlag,
        severity: Severity::High,
        confidence: None,
        description: body.note.clone(),
        snapshot_path: None,
        source: EventSource::Manual,
        metadata: serde_json::Value::Null,
        created_at: chrono::Utc::now(),
    };
    state.store.insert_proctoring_event(event.clone()).await?;

    let mut summary = state.store.get_violation_summary(session_id).await?;
    summary.counters.increment(EventType::ManualFlag);
    summary.proctor_flag = true;
    if body.note.is_some() {
        summary.proctor_note = body.note;
    }
    state.store.upsert_violation_summary(summary).await?;

    publish_event(
        &state.hub,
        &proctor_topic(session.exam_id),
        "MANUAL_FLAG",
        session_id,
        serde_json::json!({ "severity": "HIGH" }),
    );

    Ok(Json(event))
}

/// `GET /api/proctoring/sessions/{id}/summary`
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
) -> Result<Json<ViolationSummary>, EngineError> {
    require_assigned_proctor(&state, &principal, session_id).await?;
    let summary = state.store.get_violation_summary(session_id).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct BehaviorEventPage {
    events: Vec<BehaviorEvent>,
}

/// `GET /api/proctoring/sessions/{id}/behavior-events` — newest-first page
/// over the raw browser- and manual-origin event log a student's client
/// reported, independent of whatever AI-scored `ProctoringEvent` rows a
/// quick rule or the inference consumer later derived from it.
pub async fn behavior_events(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
    Query(page): Query<PageQuery>,
) -> Result<Json<BehaviorEventPage>, EngineError> {
    require_assigned_proctor(&state, &principal, session_id).await?;
    let events = state.store.list_behavior_events(session_id, page.limit, page.offset).await?;
    Ok(Json(BehaviorEventPage { events }))
}

#[cfg(test)]
#[path = "proctoring_tests.rs"]
mod tests;
