// SPDX-License-Identifier: BUSL-1.1
// Copyright 2026 Alfred Jean LLC

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Unified, transport-neutral error kinds shared across HTTP, realtime,
/// and background-worker paths (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    Precondition,
    ConcurrentModification,
    Transient,
    InferenceUnavailable,
    DlqRoute,
    Fatal,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Precondition => 409,
            Self::ConcurrentModification => 409,
            Self::Transient => 503,
            Self::InferenceUnavailable => 503,
            Self::DlqRoute => 422,
            Self::Fatal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Precondition => "PRECONDITION",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Transient => "TRANSIENT",
            Self::InferenceUnavailable => "INFERENCE_UNAVAILABLE",
            Self::DlqRoute => "DLQ_ROUTE",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A specific, named failure for one of the operations in §4.7/§4.9/§4.10.
///
/// Carries its `ErrorCode` plus a human-readable detail and, for named
/// business-rule failures, a stable machine-readable reason distinct from
/// the transport-level code (e.g. `SESSION_CONFLICT`, `EXAM_NOT_ACTIVE`).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{reason}: {detail}")]
    Business { code: ErrorCode, reason: &'static str, detail: String },
    #[error("gateway error: {0}")]
    Store(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("bus error: {0}")]
    Bus(String),
    #[error("object store error: {0}")]
    ObjectStore(String),
    #[error("inference service unavailable: {0}")]
    Inference(String),
}

impl EngineError {
    pub fn business(code: ErrorCode, reason: &'static str, detail: impl Into<String>) -> Self {
        Self::Business { code, reason, detail: detail.into() }
    }

    pub fn session_conflict(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Conflict, "SESSION_CONFLICT", detail)
    }

    pub fn exam_not_active(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Precondition, "EXAM_NOT_ACTIVE", detail)
    }

    pub fn suspension_sticky(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Precondition, "SUSPENSION_STICKY", detail)
    }

    pub fn session_suspended(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Conflict, "SESSION_SUSPENDED", detail)
    }

    pub fn question_not_in_exam(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Precondition, "QUESTION_NOT_IN_EXAM", detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::NotFound, "NOT_FOUND", detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Forbidden, "FORBIDDEN", detail)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::Validation, "VALIDATION", detail)
    }

    pub fn concurrent_modification(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::ConcurrentModification, "CONCURRENT_MODIFICATION", detail)
    }

    pub fn dlq_route(detail: impl Into<String>) -> Self {
        Self::business(ErrorCode::DlqRoute, "UNKNOWN_EVENT_TYPE", detail)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Business { code, .. } => *code,
            Self::Store(_) => ErrorCode::Transient,
            Self::Cache(_) => ErrorCode::Transient,
            Self::Bus(_) => ErrorCode::Transient,
            Self::ObjectStore(_) => ErrorCode::Transient,
            Self::Inference(_) => ErrorCode::InferenceUnavailable,
        }
    }

    /// Stable machine-readable reason for business failures; falls back to
    /// the transport code's string form for infrastructure failures.
    pub fn reason(&self) -> &str {
        match self {
            Self::Business { reason, .. } => reason,
            other => other.code().as_str(),
        }
    }
}

/// Top-level error response envelope shared across transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorCode {
    pub fn to_error_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str().to_owned(), message: message.into() }
    }
}

impl From<&EngineError> for ErrorBody {
    fn from(err: &EngineError) -> Self {
        ErrorBody { code: err.reason().to_owned(), message: err.to_string() }
    }
}

/// Lets every HTTP handler `?`-propagate an `EngineError` straight into a
/// response without a per-route `match`.
impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code().http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorResponse { error: ErrorBody::from(&self) };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
