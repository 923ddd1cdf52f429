// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the external vision/audio/identity inference service's
//! synchronous identity check (spec §4.7 `verifySession`). The bulk of
//! inference (frame/audio analysis) arrives asynchronously over the
//! message bus and is handled by [`crate::inference_consumer`]; this is the
//! one call the session engine makes inline and must bound with a timeout.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Serialize)]
struct VerifyIdentityRequest<'a> {
    session_id: crate::model::Id,
    reference_photo_key: &'a str,
    live_capture_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyIdentityResponse {
    matched: bool,
    confidence: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct IdentityVerdict {
    pub matched: bool,
    pub confidence: f64,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn verify_identity(
        &self,
        session_id: crate::model::Id,
        reference_photo_key: &str,
        live_capture_key: &str,
    ) -> Result<IdentityVerdict, EngineError>;
}

pub struct HttpInferenceClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInferenceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Inference(e.to_string()))?;
        Ok(Self { client, base_url: base_url.into() })
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn verify_identity(
        &self,
        session_id: crate::model::Id,
        reference_photo_key: &str,
        live_capture_key: &str,
    ) -> Result<IdentityVerdict, EngineError> {
        let url = format!("{}/ai/verify-identity", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&VerifyIdentityRequest { session_id, reference_photo_key, live_capture_key })
            .send()
            .await
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Inference(format!(
                "inference service responded with {}",
                response.status()
            )));
        }

        let body: VerifyIdentityResponse =
            response.json().await.map_err(|e| EngineError::Inference(e.to_string()))?;
        Ok(IdentityVerdict { matched: body.matched, confidence: body.confidence })
    }
}

/// Fixed-answer fake used by session-engine tests.
pub struct FixedInferenceClient {
    pub verdict: IdentityVerdict,
}

impl FixedInferenceClient {
    pub fn matching() -> Self {
        Self { verdict: IdentityVerdict { matched: true, confidence: 0.97 } }
    }

    pub fn mismatched() -> Self {
        Self { verdict: IdentityVerdict { matched: false, confidence: 0.12 } }
    }
}

#[async_trait]
impl InferenceClient for FixedInferenceClient {
    async fn verify_identity(
        &self,
        _session_id: crate::model::Id,
        _reference_photo_key: &str,
        _live_capture_key: &str,
    ) -> Result<IdentityVerdict, EngineError> {
        Ok(self.verdict)
    }
}

#[cfg(test)]
#[path = "inference_client_tests.rs"]
mod tests;
