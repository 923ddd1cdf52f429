// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single WebSocket endpoint: connect-time auth, per-subscription
//! authorization against the three destination families
//! (`/queue/exam/*`, `/topic/proctor/*`, `/topic/admin`), and inbound
//! `/app/exam/*` client commands (spec §4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::authz::{self, Principal};
use crate::cache::Cache;
use crate::ingestion::IngestionService;
use crate::model::Id;
use crate::realtime::{admin_topic, proctor_topic, RealtimeHub, CONNECTION_QUEUE_CAPACITY};
use crate::session::SessionEngine;
use crate::store::StoreGateway;
use crate::token::{Claim, TokenKind, TokenService};

pub struct RealtimeState {
    pub token_service: Arc<TokenService>,
    pub hub: Arc<RealtimeHub>,
    pub store: Arc<dyn StoreGateway>,
    pub session_engine: Arc<SessionEngine>,
    pub ingestion: Arc<IngestionService>,
    pub cache: Arc<dyn Cache>,
    /// Inbound `/app/exam/*` frames allowed per connection per rate-limit
    /// window before later frames in the window are dropped (SPEC_FULL §B.3).
    pub ws_inbound_rate_limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
    /// Comma-separated destination strings the client wants to subscribe
    /// to, e.g. `/queue/exam/<id>,/topic/proctor/<examId>`.
    #[serde(default)]
    pub subscribe: String,
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    destination: String,
    #[serde(default)]
    body: serde_json::Value,
}

/// `GET /ws` — upgrade after validating the connect-time capability.
/// Destination authorization happens per requested topic rather than
/// once for the whole connection, since a single socket may legitimately
/// mix a student's own exam queue with nothing else, while a proctor's
/// socket may span several `/topic/proctor/*` destinations at once.
pub async fn handler(
    State(state): State<Arc<RealtimeState>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let claim = match state.token_service.validate(&query.token).await {
        Ok(c) => c,
        Err(_) => return axum::http::StatusCode::UNAUTHORIZED.into_response(),
    };
    let principal = match principal_from_access_claim(&claim) {
        Ok(p) => p,
        Err(status) => return status.into_response(),
    };

    let authorized_topics = match authorize_subscriptions(&state, &principal, &query.subscribe).await {
        Ok(topics) => topics,
        Err(_) => return axum::http::StatusCode::FORBIDDEN.into_response(),
    };

    ws.on_upgrade(move |socket| handle_connection(state, principal, authorized_topics, socket))
        .into_response()
}

/// Resolves each requested destination string to a topic this principal is
/// allowed to read. Unrecognized destinations are dropped rather than
/// rejecting the whole connection; only a recognized-but-forbidden
/// destination fails the upgrade outright.
async fn authorize_subscriptions(
    state: &RealtimeState,
    principal: &Principal,
    subscribe: &str,
) -> Result<Vec<String>, crate::error::EngineError> {
    let mut topics = Vec::new();
    for destination in subscribe.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Some(session_id) = parse_leading_segment(destination, "/queue/exam/") {
            let session = state.store.get_session(session_id).await?;
            let proctor_assigned = state.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
            if !authz::is_owner(principal, &session, proctor_assigned) {
                return Err(crate::error::EngineError::forbidden("not authorized for this session's queue"));
            }
            topics.push(destination.to_owned());
        } else if let Some(exam_id) = parse_leading_segment(destination, "/topic/proctor/exam/") {
            let proctor_assigned = state.store.is_proctor_assigned(principal.user_id, exam_id).await?;
            if !authz::is_assigned_proctor(principal, proctor_assigned) {
                return Err(crate::error::EngineError::forbidden("not authorized for this exam's proctor topic"));
            }
            topics.push(proctor_topic(exam_id));
        } else if destination == "/topic/admin" || destination.starts_with("/topic/admin/") {
            if !authz::is_admin(principal) {
                return Err(crate::error::EngineError::forbidden("admin topic requires an admin capability"));
            }
            topics.push(admin_topic());
        }
    }
    Ok(topics)
}

/// Admission requires an ACCESS capability; a REFRESH capability is
/// rejected here the same way `http::auth::auth_layer` rejects it on every
/// REST route other than `/api/auth/refresh` (spec §4.5, §8.6).
fn principal_from_access_claim(claim: &Claim) -> Result<Principal, axum::http::StatusCode> {
    if claim.kind != TokenKind::Access {
        return Err(axum::http::StatusCode::UNAUTHORIZED);
    }
    Ok(Principal { user_id: claim.user_id, role: claim.role })
}

/// Extracts the UUID immediately following `prefix`, ignoring any further
/// `/`-separated segments (e.g. the `{warning|suspend}` kind suffix on a
/// `/queue/exam/{sessionId}/...` destination).
fn parse_leading_segment(destination: &str, prefix: &str) -> Option<Id> {
    let rest = destination.strip_prefix(prefix)?;
    rest.split('/').next()?.parse().ok()
}

/// Matches [`crate::config::Config::rate_limit_window`]; kept as a
/// constant here rather than threaded through so every counter in the
/// process shares one fixed window.
const RATE_LIMIT_WINDOW: std::time::Duration = std::time::Duration::from_secs(60);

async fn handle_connection(
    state: Arc<RealtimeState>,
    principal: Principal,
    topics: Vec<String>,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (queue_tx, mut queue_rx) = mpsc::channel::<String>(CONNECTION_QUEUE_CAPACITY);
    let cancel = CancellationToken::new();
    let overflowed = Arc::new(AtomicBool::new(false));

    for topic in topics {
        let mut receiver = state.hub.subscribe(&topic);
        let queue_tx = queue_tx.clone();
        let cancel = cancel.clone();
        let overflowed = Arc::clone(&overflowed);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    message = receiver.recv() => {
                        match message {
                            Ok(payload) => {
                                if queue_tx.try_send(payload).is_err() {
                                    overflowed.store(true, Ordering::Relaxed);
                                    cancel.cancel();
                                    break;
                                }
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });
    }
    drop(queue_tx);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            outbound = queue_rx.recv() => {
                match outbound {
                    Some(payload) => {
                        if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&state, &principal, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    cancel.cancel();
    if overflowed.load(Ordering::Relaxed) {
        tracing::debug!(user_id = %principal.user_id, "websocket dropped: connection could not keep up");
    }
    let _ = ws_tx.close().await;
}

#[derive(Debug, Deserialize)]
struct FramePayloadBody {
    payload: String,
    #[serde(default, rename = "capturedAt")]
    captured_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct EventBody {
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(default)]
    metadata: serde_json::Value,
    #[serde(default, rename = "capturedAt")]
    captured_at: Option<i64>,
}

/// Dispatches one `/app/exam/{sessionId}/{frame|audio|event|heartbeat}`
/// client command (spec §4.8), having first cross-checked ownership.
async fn handle_inbound(state: &RealtimeState, principal: &Principal, text: &str) {
    let rate_limit_key = format!("ratelimit:ws:{}", principal.user_id);
    match state.cache.rate_limit_incr(&rate_limit_key, RATE_LIMIT_WINDOW).await {
        Ok(count) if count > state.ws_inbound_rate_limit => {
            tracing::debug!(user_id = %principal.user_id, count, "realtime frame dropped: rate limit exceeded");
            return;
        }
        Err(e) => {
            tracing::warn!(error = %e, "rate limit check failed, allowing frame through");
        }
        _ => {}
    }

    let Ok(frame) = serde_json::from_str::<InboundFrame>(text) else { return };
    let Some((session_id, kind)) = split_session_and_kind(&frame.destination) else { return };

    if let Err(e) = ensure_owns_session(state, principal, session_id).await {
        tracing::debug!(session_id = %session_id, error = %e, "realtime command rejected: not the session owner");
        return;
    }

    let result = match kind {
        "heartbeat" => state.ingestion.dispatch_heartbeat(principal, session_id).await.map(|_| ()),
        "frame" => dispatch_snapshot(state, session_id, frame.body, true).await,
        "audio" => dispatch_snapshot(state, session_id, frame.body, false).await,
        "event" => dispatch_event(state, session_id, frame.body).await,
        _ => return,
    };
    if let Err(e) = result {
        tracing::debug!(session_id = %session_id, kind, error = %e, "realtime command rejected");
    }
}

fn split_session_and_kind(destination: &str) -> Option<(Id, &str)> {
    let rest = destination.strip_prefix("/app/exam/")?;
    let (id_str, kind) = rest.split_once('/')?;
    Some((id_str.parse().ok()?, kind))
}

async fn ensure_owns_session(
    state: &RealtimeState,
    principal: &Principal,
    session_id: Id,
) -> Result<(), crate::error::EngineError> {
    let session = state.store.get_session(session_id).await?;
    let proctor_assigned = state.store.is_proctor_assigned(principal.user_id, session.exam_id).await?;
    if !authz::is_owner(principal, &session, proctor_assigned) {
        return Err(crate::error::EngineError::forbidden("not authorized for this session"));
    }
    Ok(())
}

async fn dispatch_snapshot(
    state: &RealtimeState,
    session_id: Id,
    body: serde_json::Value,
    is_frame: bool,
) -> Result<(), crate::error::EngineError> {
    let parsed: FramePayloadBody = serde_json::from_value(body)
        .map_err(|e| crate::error::EngineError::validation(format!("malformed payload: {e}")))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(parsed.payload)
        .map_err(|e| crate::error::EngineError::validation(format!("payload is not valid base64: {e}")))?;
    if is_frame {
        state.ingestion.ingest_frame(session_id, bytes, parsed.captured_at).await
    } else {
        state.ingestion.ingest_audio_clip(session_id, bytes, parsed.captured_at).await
    }
}

async fn dispatch_event(
    state: &RealtimeState,
    session_id: Id,
    body: serde_json::Value,
) -> Result<(), crate::error::EngineError> {
    let parsed: EventBody = serde_json::from_value(body)
        .map_err(|e| crate::error::EngineError::validation(format!("malformed payload: {e}")))?;
    state
        .ingestion
        .ingest_behavior_event(session_id, &parsed.event_type, parsed.metadata, parsed.captured_at)
        .await
}

#[cfg(test)]
#[path = "ws_tests.rs"]
mod tests;
