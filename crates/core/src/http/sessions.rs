// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle routes (spec §6): thin adapters over
//! [`crate::session::SessionEngine`] and [`crate::ingestion::IngestionService`].

use std::sync::Arc;

use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::authz::Principal;
use crate::error::EngineError;
use crate::http::state::AppState;
use crate::model::{Answer, ExamSession, Id};
use crate::session::SessionStart;

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    #[serde(rename = "examId")]
    exam_id: Id,
}

/// `POST /api/sessions/start?examId=…`
pub async fn start(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<StartQuery>,
) -> Result<Json<SessionStart>, EngineError> {
    let start = state.session_engine.start_session(&principal, query.exam_id).await?;
    Ok(Json(start))
}

/// `POST /api/sessions/{id}/heartbeat`
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
) -> Result<Json<ExamSession>, EngineError> {
    let session = state.ingestion.dispatch_heartbeat(&principal, session_id).await?;
    Ok(Json(session))
}

/// `POST /api/sessions/{id}/submit`
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
) -> Result<Json<ExamSession>, EngineError> {
    let session = state.session_engine.submit_session(&principal, session_id).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct SaveAnswerRequest {
    #[serde(rename = "questionId")]
    question_id: Id,
    #[serde(default, rename = "selectedAnswer")]
    selected_answer: Option<String>,
    #[serde(default, rename = "textAnswer")]
    text_answer: Option<String>,
}

/// `POST /api/sessions/{id}/answers`
pub async fn save_answer(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
    Json(body): Json<SaveAnswerRequest>,
) -> Result<Json<Answer>, EngineError> {
    let answer = state
        .session_engine
        .save_answer(&principal, session_id, body.question_id, body.selected_answer, body.text_answer)
        .await?;
    Ok(Json(answer))
}

#[derive(Debug, Deserialize)]
pub struct VerifyIdentityRequest {
    #[serde(rename = "referencePhotoKey")]
    reference_photo_key: String,
    #[serde(rename = "liveCaptureKey")]
    live_capture_key: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyIdentityResponse {
    #[serde(rename = "match")]
    matched: bool,
    confidence: f64,
}

/// `POST /api/sessions/{id}/verify-identity`
pub async fn verify_identity(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
    Json(body): Json<VerifyIdentityRequest>,
) -> Result<Json<VerifyIdentityResponse>, EngineError> {
    let verdict = state
        .session_engine
        .verify_identity(&principal, session_id, &body.reference_photo_key, &body.live_capture_key)
        .await?;
    Ok(Json(VerifyIdentityResponse { matched: verdict.matched, confidence: verdict.confidence }))
}

#[derive(Debug, Deserialize)]
pub struct SuspendRequest {
    reason: String,
}

/// `POST /api/sessions/{id}/suspend`
pub async fn suspend(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
    Json(body): Json<SuspendRequest>,
) -> Result<Json<ExamSession>, EngineError> {
    let session = state.store.get_session(session_id).await?;
    let proctor_assigned = state.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
    if !crate::authz::is_assigned_proctor(&principal, proctor_assigned) {
        return Err(EngineError::forbidden("only an assigned proctor or admin may suspend a session"));
    }
    let session = state.session_engine.suspend_session(session_id, body.reason).await?;
    Ok(Json(session))
}

#[derive(Debug, Deserialize)]
pub struct ReinstateRequest {
    #[serde(default)]
    reason: Option<String>,
}

/// `POST /api/sessions/{id}/reinstate`
pub async fn reinstate(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Path(session_id): Path<Id>,
    Json(body): Json<ReinstateRequest>,
) -> Result<Json<ExamSession>, EngineError> {
    let session = state.session_engine.reinstate_session(&principal, session_id, body.reason).await?;
    Ok(Json(session))
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
