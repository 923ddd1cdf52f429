// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime Channel (C6): a single WebSocket endpoint fanning out to
//! per-session, per-exam, and admin-wide destinations (spec §4.6).
//! Grounded on the teacher's aggregated mux WebSocket
//! (`transport/ws_mux.rs`) for the upgrade/event-loop shape; reworked
//! here around named topic strings and a bounded per-connection queue
//! instead of one global broadcast channel, since a slow proctor
//! dashboard must not be able to starve other connections sharing the
//! student's exam topic.

pub mod ws;

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::model::Id;

/// Capacity of each topic's broadcast channel. A receiver that falls this
/// far behind silently drops the oldest messages (`RecvError::Lagged`) —
/// destinations only ever carry best-effort live status, never anything a
/// client must not miss.
const TOPIC_CAPACITY: usize = 256;

/// Capacity of a connection's outbound mpsc queue. Exceeding this marks
/// the client as unable to keep up and the connection is dropped rather
/// than buffered without bound.
pub const CONNECTION_QUEUE_CAPACITY: usize = 64;

/// A session's student-facing destination: `/queue/exam/{sessionId}/{kind}`
/// where `kind` is `"warning"` or `"suspend"` (spec §4.6).
pub fn exam_queue_topic(session_id: Id, kind: &str) -> String {
    format!("/queue/exam/{session_id}/{kind}")
}

pub fn proctor_topic(exam_id: Id) -> String {
    format!("/topic/proctor/exam/{exam_id}")
}

pub fn admin_topic() -> String {
    "/topic/admin".to_owned()
}

/// Serializes a tagged envelope and publishes it to `topic`, logging (never
/// panicking) on a serialization failure — a malformed outbound message
/// must not take down the caller's own unit of work.
pub fn publish_event(hub: &RealtimeHub, topic: &str, kind: &'static str, session_id: Id, data: impl serde::Serialize) {
    let envelope = serde_json::json!({ "type": kind, "sessionId": session_id, "data": data });
    match serde_json::to_string(&envelope) {
        Ok(payload) => hub.publish(topic, payload),
        Err(e) => tracing::error!(error = %e, kind, "failed to serialize realtime message"),
    }
}

/// Registry of named topics, each backed by its own broadcast channel.
/// Created lazily on first publish or subscribe.
#[derive(Default)]
pub struct RealtimeHub {
    topics: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, topic: &str) -> broadcast::Sender<String> {
        let mut topics = self.topics.lock().unwrap();
        topics
            .entry(topic.to_owned())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Publish a pre-serialized payload to every current subscriber of
    /// `topic`. A topic with no subscribers just drops the send.
    pub fn publish(&self, topic: &str, payload: String) {
        let _ = self.sender_for(topic).send(payload);
    }

    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        self.sender_for(topic).subscribe()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
