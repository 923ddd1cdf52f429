// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP Surface (C12): the routes enumerated in spec §6, assembled behind
//! the ACCESS-capability auth layer, request tracing, and a permissive CORS
//! policy — mirroring the teacher's `transport::build_router` layering
//! order. Inbound frame/audio/event ingestion has no HTTP route; it travels
//! over the realtime channel only (see [`crate::realtime::ws`]).

pub mod auth;
pub mod health;
pub mod proctoring;
pub mod sessions;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// The full router: every protected route plus health/readiness, with the
/// auth layer applied last so it wraps every route above it.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/sessions/start", post(sessions::start))
        .route("/api/sessions/{id}/heartbeat", post(sessions::heartbeat))
        .route("/api/sessions/{id}/submit", post(sessions::submit))
        .route("/api/sessions/{id}/answers", post(sessions::save_answer))
        .route("/api/sessions/{id}/verify-identity", post(sessions::verify_identity))
        .route("/api/sessions/{id}/suspend", post(sessions::suspend))
        .route("/api/sessions/{id}/reinstate", post(sessions::reinstate))
        .route("/api/proctoring/sessions/{id}/flag", post(proctoring::flag))
        .route("/api/proctoring/sessions/{id}/summary", get(proctoring::summary))
        .route("/api/proctoring/sessions/{id}/behavior-events", get(proctoring::behavior_events))
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/ready", get(health::ready))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_layer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// A health-only router for the separate probe listener
/// (`Config::health_port`), mirroring the teacher's dedicated health server.
pub fn build_health_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/ready", get(health::ready))
        .with_state(state)
}
