// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bearer-token auth middleware and the `/api/auth/refresh` handler.
//! Grounded on the teacher's `transport/auth.rs` Bearer-validation layer;
//! reimplemented against signed ACCESS/REFRESH capabilities instead of a
//! single shared secret (spec §4.5, §6).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, ErrorCode};
use crate::http::state::AppState;
use crate::token::TokenKind;

/// Paths that never carry an ACCESS capability: health/readiness probes
/// predate any login, and `/api/auth/refresh` is instead presented a
/// REFRESH capability, validated inside its own handler.
const UNAUTHENTICATED_PATHS: [&str; 3] = ["/api/v1/health", "/api/v1/ready", "/api/auth/refresh"];

fn bearer_token(headers: &HeaderMap) -> Result<&str, EngineError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| EngineError::business(ErrorCode::Unauthenticated, "MISSING_TOKEN", "missing Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| EngineError::business(ErrorCode::Unauthenticated, "MALFORMED_AUTH_HEADER", "Authorization header must be a Bearer token"))
}

/// Validates the caller's ACCESS capability and inserts the resolved
/// [`crate::authz::Principal`] into the request so handlers can extract it.
/// A REFRESH capability presented here (anywhere other than the refresh
/// endpoint) is rejected per spec §7's UNAUTHENTICATED case.
pub async fn auth_layer(State(state): State<Arc<AppState>>, req: Request<Body>, next: Next) -> Response {
    if UNAUTHENTICATED_PATHS.contains(&req.uri().path()) {
        return next.run(req).await;
    }

    let token = match bearer_token(req.headers()) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let claim = match state.token_service.validate(token).await {
        Ok(claim) => claim,
        Err(e) => return e.into_response(),
    };
    if claim.kind != TokenKind::Access {
        return EngineError::business(
            ErrorCode::Unauthenticated,
            "NOT_AN_ACCESS_TOKEN",
            "a refresh capability may not be used outside the refresh endpoint",
        )
        .into_response();
    }

    let mut req = req;
    req.extensions_mut().insert(crate::authz::Principal { user_id: claim.user_id, role: claim.role });
    next.run(req).await
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPairResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

/// `POST /api/auth/refresh` — rotates a REFRESH capability. Rate-limited
/// per caller since a stolen refresh token otherwise lets an attacker mint
/// capabilities as fast as the signing call allows.
pub async fn refresh(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<TokenPairResponse>, EngineError> {
    let token = bearer_token(&headers)?;
    let claim = state.token_service.validate(token).await?;

    let rate_limit_key = format!("ratelimit:refresh:{}", claim.user_id);
    let count = state.cache.rate_limit_incr(&rate_limit_key, state.rate_limit_window).await?;
    if count > state.refresh_rate_limit_per_minute {
        return Err(EngineError::business(
            ErrorCode::Transient,
            "RATE_LIMITED",
            "too many refresh attempts, try again shortly",
        ));
    }

    let pair = state.token_service.rotate(token).await?;
    Ok(Json(TokenPairResponse { access_token: pair.access, refresh_token: pair.refresh }))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
