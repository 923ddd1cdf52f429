// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inference Result Consumer (C9): scores every result the external vision
//! and audio models publish back on `proctoring.results` — one per frame
//! or audio clip submitted via [`crate::ingestion`] — and decides, per
//! rolling window, whether a session has crossed from "flagged" into
//! "must stop" (spec §4.9).
//!
//! Steps 3-6 below (persist the event, fold it into the violation summary,
//! record it in the rolling window) are one unit of work against the
//! store. Step 7 — the auto-suspend — calls
//! [`crate::session::SessionEngine::suspend_session`], which commits on its
//! own regardless of anything else in this function, so a suspension that
//! should happen always happens even if a later step here were to fail.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bus::{Bus, Delivery, PROCTORING_RESULTS_QUEUE};
use crate::cache::Cache;
use crate::error::{EngineError, ErrorCode};
use crate::model::{EventType, Id, ProctoringEvent, Severity};
use crate::realtime::{exam_queue_topic, proctor_topic, publish_event, RealtimeHub};
use crate::session::SessionEngine;
use crate::store::StoreGateway;
use futures_util::StreamExt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResultMessage {
    pub session_id: Id,
    pub event_type: String,
    pub severity: String,
    pub confidence: Option<f64>,
    /// The model's own risk score for this result, distinct from
    /// `confidence` (how sure the model is about the label) — this is what
    /// drives the rolling-window auto-suspend trigger when present.
    #[serde(rename = "riskScore")]
    pub risk_score: Option<f64>,
    pub description: Option<String>,
    pub snapshot_path: Option<String>,
    pub metadata: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

fn parse_severity(raw: &str) -> Severity {
    match raw.to_ascii_uppercase().as_str() {
        "CRITICAL" => Severity::Critical,
        "HIGH" => Severity::High,
        "MEDIUM" => Severity::Medium,
        _ => Severity::Low,
    }
}

fn base_risk_for_severity(severity: Severity) -> f64 {
    match severity {
        Severity::Low => 0.25,
        Severity::Medium => 0.5,
        Severity::High => 0.75,
        Severity::Critical => 0.95,
    }
}

pub struct RiskThresholds {
    pub high_risk_threshold: f64,
    pub critical_risk_threshold: f64,
    pub window: Duration,
    pub window_ttl: Duration,
    pub min_frames_in_window: u64,
    pub critical_ratio_threshold: f64,
}

pub struct InferenceConsumer {
    store: Arc<dyn StoreGateway>,
    cache: Arc<dyn Cache>,
    session_engine: Arc<SessionEngine>,
    hub: Arc<RealtimeHub>,
    thresholds: RiskThresholds,
}

impl InferenceConsumer {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        cache: Arc<dyn Cache>,
        session_engine: Arc<SessionEngine>,
        hub: Arc<RealtimeHub>,
        thresholds: RiskThresholds,
    ) -> Self {
        Self { store, cache, session_engine, hub, thresholds }
    }

    /// Processes one decoded inference result. Returns `Ok(())` for
    /// messages about sessions that are no longer open — there is nothing
    /// left to score, and re-delivering them would just spin forever.
    pub async fn process_message(&self, message: InferenceResultMessage) -> Result<(), EngineError> {
        // Step 1: interpret the wire vocabulary defensively.
        let event_type = EventType::parse(&message.event_type)
            .ok_or_else(|| EngineError::dlq_route(format!("unknown event type {}", message.event_type)))?;
        let severity = parse_severity(&message.severity);

        // Step 2: a session that has already ended has nothing left to score.
        let session = self.store.get_session(message.session_id).await?;
        if !session.is_open() || session.is_suspended {
            return Ok(());
        }

        let candidate_risk = message.risk_score.unwrap_or_else(|| base_risk_for_severity(severity));
        let is_critical = candidate_risk >= self.thresholds.critical_risk_threshold
            || severity == Severity::Critical;

        // Steps 3-5: persist the event, fold it into the running summary.
        self.store
            .insert_proctoring_event(ProctoringEvent {
                id: Id::new_v4(),
                session_id: message.session_id,
                event_type,
                severity,
                confidence: message.confidence,
                description: message.description.clone(),
                snapshot_path: message.snapshot_path.clone(),
                source: event_type.source(),
                metadata: message.metadata.clone(),
                created_at: message.captured_at,
            })
            .await?;

        let mut summary = self.store.get_violation_summary(message.session_id).await?;
        summary.counters.increment(event_type);
        summary.bump_risk(candidate_risk);
        self.store.upsert_violation_summary(summary.clone()).await?;

        // Step 6: record this result in the rolling window used by the
        // auto-suspend trigger below.
        let (frame_count, critical_count) = self
            .cache
            .risk_window_record(
                message.session_id,
                message.captured_at.timestamp_millis(),
                self.thresholds.window,
                self.thresholds.window_ttl,
                is_critical,
            )
            .await?;

        if summary.risk_score >= self.thresholds.high_risk_threshold {
            tracing::warn!(
                session_id = %message.session_id,
                risk_score = summary.risk_score,
                "session crossed the high-risk threshold"
            );
            let warning = serde_json::json!({ "riskScore": summary.risk_score, "eventType": event_type.as_str() });
            publish_event(&self.hub, &exam_queue_topic(message.session_id, "warning"), "RISK_WARNING", message.session_id, warning.clone());
            publish_event(&self.hub, &proctor_topic(session.exam_id), "RISK_WARNING", message.session_id, warning);
        }

        // Step 7: rolling-window auto-suspend, committed independently of
        // everything above.
        if frame_count >= self.thresholds.min_frames_in_window {
            let ratio = critical_count as f64 / frame_count as f64;
            if ratio >= self.thresholds.critical_ratio_threshold {
                self.session_engine
                    .suspend_session(
                        message.session_id,
                        format!(
                            "rolling window flagged {critical_count}/{frame_count} results as critical \
                             (ratio {ratio:.2} >= threshold {:.2})",
                            self.thresholds.critical_ratio_threshold
                        ),
                    )
                    .await?;
            }
        }

        Ok(())
    }

    /// Drains one of the three AI-result queues, acking successfully
    /// processed messages and routing permanently-malformed ones to the
    /// dead-letter queue instead of requeuing them forever.
    pub async fn run(&self, bus: Arc<dyn Bus>, queue: &str) -> Result<(), EngineError> {
        let mut stream = bus.consume(queue).await?;
        while let Some(delivery) = stream.next().await {
            self.handle_delivery(delivery).await;
        }
        Ok(())
    }

    async fn handle_delivery(&self, delivery: Box<dyn Delivery>) {
        let parsed: Result<InferenceResultMessage, _> = serde_json::from_slice(delivery.payload());
        match parsed {
            Ok(message) => match self.process_message(message).await {
                Ok(()) => {
                    if let Err(e) = delivery.ack().await {
                        tracing::error!(error = %e, "failed to ack inference result");
                    }
                }
                Err(e) if e.code() == ErrorCode::DlqRoute => {
                    tracing::warn!(error = %e, "unprocessable inference result, routing to dead-letter queue");
                    if let Err(e) = delivery.nack(false).await {
                        tracing::error!(error = %e, "failed to dead-letter inference result");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "transient failure processing inference result, requeueing");
                    if let Err(e) = delivery.nack(true).await {
                        tracing::error!(error = %e, "failed to nack inference result");
                    }
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "malformed inference result, routing to dead-letter queue");
                if let Err(e) = delivery.nack(false).await {
                    tracing::error!(error = %e, "failed to dead-letter inference result");
                }
            }
        }
    }
}

/// The one inbound queue an [`InferenceConsumer`] worker pool should drain;
/// `frame.analysis`/`audio.analysis`/`behavior.events` are outbound to the
/// external inference service, not consumed back by this process.
pub const INFERENCE_RESULT_QUEUES: [&str; 1] = [PROCTORING_RESULTS_QUEUE];

#[cfg(test)]
#[path = "inference_consumer_tests.rs"]
mod tests;
