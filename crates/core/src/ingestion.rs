// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proctoring Ingestion (C8): the front door for everything a student's
//! exam client streams while a session is open — camera frames, audio
//! clips, browser-origin behavior events, and heartbeats (spec §4.8).
//!
//! AI-graded signals (frames, audio, AI-sourced behavior events) are hashed
//! off to the message bus for [`crate::inference_consumer`] to score
//! asynchronously. Browser-origin events that don't need a model — tab
//! switches, fullscreen exits, copy/paste — are cheap enough to count and
//! react to inline, so a few "quick rules" run synchronously here instead
//! of waiting a round trip through the bus.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bus::{Bus, AUDIO_ANALYSIS_QUEUE, BEHAVIOR_EVENTS_QUEUE, FRAME_ANALYSIS_QUEUE};
use crate::error::EngineError;
use crate::model::{BehaviorEvent, EventSource, EventType, Id, ProctoringEvent, Severity};
use crate::object_store::{ObjectStore, AUDIO_CLIPS_BUCKET, VIOLATION_SNAPSHOTS_BUCKET};
use crate::realtime::{exam_queue_topic, publish_event, RealtimeHub};
use crate::session::SessionEngine;
use crate::store::StoreGateway;

/// Browser-origin events get an immediate counter bump; hitting this many
/// tab switches in a single session raises a synchronous warning instead of
/// waiting for the next AI-scored frame to push the risk score up.
const QUICK_RULE_TAB_SWITCH_THRESHOLD: i64 = 3;

#[derive(Debug, Serialize, Deserialize)]
pub struct FrameAnalysisMessage {
    pub session_id: Id,
    pub object_key: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AudioAnalysisMessage {
    pub session_id: Id,
    pub object_key: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BehaviorEventMessage {
    pub session_id: Id,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub captured_at: DateTime<Utc>,
}

pub struct IngestionService {
    store: Arc<dyn StoreGateway>,
    bus: Arc<dyn Bus>,
    objects: Arc<dyn ObjectStore>,
    session_engine: Arc<SessionEngine>,
    hub: Arc<RealtimeHub>,
}

impl IngestionService {
    pub fn new(
        store: Arc<dyn StoreGateway>,
        bus: Arc<dyn Bus>,
        objects: Arc<dyn ObjectStore>,
        session_engine: Arc<SessionEngine>,
        hub: Arc<RealtimeHub>,
    ) -> Self {
        Self { store, bus, objects, session_engine, hub }
    }

    async fn require_open_unsuspended(&self, session_id: Id) -> Result<(), EngineError> {
        let session = self.store.get_session(session_id).await?;
        if !session.is_open() {
            return Err(EngineError::session_conflict("session has already been submitted"));
        }
        if session.is_suspended {
            return Err(EngineError::session_suspended("session is suspended"));
        }
        Ok(())
    }

    pub async fn ingest_frame(
        &self,
        session_id: Id,
        frame_bytes: Vec<u8>,
        captured_at_ms: Option<i64>,
    ) -> Result<(), EngineError> {
        self.require_open_unsuspended(session_id).await?;
        let captured_at = parse_timestamp(captured_at_ms);
        let object_key = format!("{session_id}/{}.jpg", Uuid::new_v4());
        self.objects.put(VIOLATION_SNAPSHOTS_BUCKET, &object_key, frame_bytes).await?;

        let message = FrameAnalysisMessage { session_id, object_key, captured_at };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| EngineError::Bus(format!("could not encode frame message: {e}")))?;
        self.bus.publish(FRAME_ANALYSIS_QUEUE, &payload).await
    }

    pub async fn ingest_audio_clip(
        &self,
        session_id: Id,
        clip_bytes: Vec<u8>,
        captured_at_ms: Option<i64>,
    ) -> Result<(), EngineError> {
        self.require_open_unsuspended(session_id).await?;
        let captured_at = parse_timestamp(captured_at_ms);
        let object_key = format!("{session_id}/{}.webm", Uuid::new_v4());
        self.objects.put(AUDIO_CLIPS_BUCKET, &object_key, clip_bytes).await?;

        let message = AudioAnalysisMessage { session_id, object_key, captured_at };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| EngineError::Bus(format!("could not encode audio message: {e}")))?;
        self.bus.publish(AUDIO_ANALYSIS_QUEUE, &payload).await
    }

    /// Dispatches a browser- or manual-origin behavior event. AI-sourced
    /// event types are rejected here — they only ever arrive via the
    /// inference consumer, never directly from a client.
    pub async fn ingest_behavior_event(
        &self,
        session_id: Id,
        raw_event_type: &str,
        metadata: serde_json::Value,
        captured_at_ms: Option<i64>,
    ) -> Result<(), EngineError> {
        self.require_open_unsuspended(session_id).await?;
        let event_type = EventType::parse(raw_event_type)
            .ok_or_else(|| EngineError::validation(format!("unknown event type {raw_event_type}")))?;
        if event_type.source() == EventSource::Ai {
            return Err(EngineError::validation("AI-sourced event types may not be reported directly"));
        }
        let captured_at = parse_timestamp(captured_at_ms);

        self.store
            .insert_behavior_event(BehaviorEvent {
                id: Id::new_v4(),
                session_id,
                event_type: event_type.as_str().to_owned(),
                timestamp: captured_at,
                metadata: metadata.clone(),
            })
            .await?;

        let message = BehaviorEventMessage {
            session_id,
            event_type: event_type.as_str().to_owned(),
            metadata: metadata.clone(),
            captured_at,
        };
        let payload = serde_json::to_vec(&message)
            .map_err(|e| EngineError::Bus(format!("could not encode behavior event: {e}")))?;
        self.bus.publish(BEHAVIOR_EVENTS_QUEUE, &payload).await?;

        self.apply_quick_rules(session_id, event_type, metadata, captured_at).await
    }

    async fn apply_quick_rules(
        &self,
        session_id: Id,
        event_type: EventType,
        metadata: serde_json::Value,
        captured_at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let mut summary = self.store.get_violation_summary(session_id).await?;
        summary.counters.increment(event_type);
        self.store.upsert_violation_summary(summary.clone()).await?;

        if event_type == EventType::TabSwitch && summary.counters.tab_switch_count == QUICK_RULE_TAB_SWITCH_THRESHOLD {
            self.store
                .insert_proctoring_event(ProctoringEvent {
                    id: Id::new_v4(),
                    session_id,
                    event_type: EventType::TabSwitch,
                    severity: Severity::Medium,
                    confidence: None,
                    description: Some(format!(
                        "student has switched tabs {QUICK_RULE_TAB_SWITCH_THRESHOLD} times during this session"
                    )),
                    snapshot_path: None,
                    source: EventSource::Browser,
                    metadata,
                    created_at: captured_at,
                })
                .await?;
            publish_event(
                &self.hub,
                &exam_queue_topic(session_id, "warning"),
                "QUICK_RULE_WARNING",
                session_id,
                serde_json::json!({ "eventType": EventType::TabSwitch.as_str(), "count": summary.counters.tab_switch_count }),
            );
        }

        Ok(())
    }

    /// `heartbeat` dispatch — forwards to the session engine so liveness
    /// accounting has a single implementation shared by HTTP and realtime
    /// transports.
    pub async fn dispatch_heartbeat(
        &self,
        principal: &crate::authz::Principal,
        session_id: Id,
    ) -> Result<crate::model::ExamSession, EngineError> {
        self.session_engine.heartbeat(principal, session_id).await
    }
}

/// Defensive timestamp parsing (spec §4.8): a missing or out-of-range
/// client-supplied epoch millisecond value falls back to server receipt
/// time rather than rejecting the whole payload.
fn parse_timestamp(captured_at_ms: Option<i64>) -> DateTime<Utc> {
    captured_at_ms
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
#[path = "ingestion_tests.rs"]
mod tests;
