// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator probes (SPEC_FULL §B.1). `health` is a pure liveness check;
//! `ready` additionally confirms the store is reachable, matching the
//! teacher's split between the two.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::http::state::AppState;
use crate::model::Id;

/// `GET /api/v1/health` — process is up, nothing more.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `GET /api/v1/ready` — the store answers a cheap lookup. A miss on a
/// random id is the expected, healthy outcome; only a gateway error means
/// the dependency is actually down.
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.get_user(Id::nil()).await {
        Ok(_) => Json(serde_json::json!({ "status": "ready" })).into_response(),
        Err(crate::error::EngineError::Business { .. }) => Json(serde_json::json!({ "status": "ready" })).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (axum::http::StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "status": "not_ready" })))
                .into_response()
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
