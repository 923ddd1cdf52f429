// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-Value Cache (C2): session presence, refresh-token index, revoked
//! capabilities, shuffled-question order, rolling risk windows, and fixed
//! window rate-limit counters (spec §4.2).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::EngineError;
use crate::model::Id;

/// One entry in a risk-window ordered set: an inference result's arrival
/// time (epoch-ms), used as the sort key so pruning is a simple range-trim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct WindowMember(pub i64);

#[async_trait]
pub trait Cache: Send + Sync {
    /// `session:active:{id}` — set with a rolling TTL; returns whether the
    /// key was freshly created (vs. refreshed).
    async fn mark_session_active(&self, session_id: Id, ttl: Duration) -> Result<(), EngineError>;

    async fn session_active(&self, session_id: Id) -> Result<bool, EngineError>;

    async fn clear_session_active(&self, session_id: Id) -> Result<(), EngineError>;

    /// `exam:questions:{examId}:{userId}` — set-if-absent; returns `true`
    /// if this call's value won (no existing sequence).
    async fn set_question_order_if_absent(
        &self,
        exam_id: Id,
        user_id: Id,
        order: &[Id],
        ttl: Duration,
    ) -> Result<bool, EngineError>;

    async fn get_question_order(
        &self,
        exam_id: Id,
        user_id: Id,
    ) -> Result<Option<Vec<Id>>, EngineError>;

    /// `refresh:{userId}` — opaque refresh-capability index.
    async fn set_refresh_jti(&self, user_id: Id, jti: &str, ttl: Duration) -> Result<(), EngineError>;

    async fn get_refresh_jti(&self, user_id: Id) -> Result<Option<String>, EngineError>;

    /// `blacklist:jwt:{jti}` — revoked capability, TTL == its remaining life.
    async fn revoke_jti(&self, jti: &str, ttl: Duration) -> Result<(), EngineError>;

    async fn is_revoked(&self, jti: &str) -> Result<bool, EngineError>;

    /// Risk window: insert a scored member into `frames` and, when
    /// `critical` is true, also into `critical`; prune members older than
    /// `now - window`; refresh both keys' TTL to `window_ttl`. Returns
    /// `(frame_count, critical_count)` after insert+prune.
    async fn risk_window_record(
        &self,
        session_id: Id,
        now_ms: i64,
        window: Duration,
        window_ttl: Duration,
        critical: bool,
    ) -> Result<(u64, u64), EngineError>;

    /// Delete both risk-window keys for a session (on trigger, submit, or
    /// suspend/reinstate).
    async fn risk_window_clear(&self, session_id: Id) -> Result<(), EngineError>;

    /// Fixed-window rate-limit counter; returns the count after increment.
    async fn rate_limit_incr(&self, key: &str, window: Duration) -> Result<u64, EngineError>;
}

/// In-memory `Cache` used by unit and router-level tests so the Session
/// Engine and Inference Result Consumer are exercisable without a live
/// Redis instance.
#[derive(Default)]
pub struct InMemoryCache {
    inner: Mutex<InMemoryState>,
}

#[derive(Default)]
struct InMemoryState {
    active: HashMap<Id, std::time::Instant>,
    question_orders: HashMap<(Id, Id), Vec<Id>>,
    refresh_jti: HashMap<Id, String>,
    revoked: HashMap<String, std::time::Instant>,
    frames: HashMap<Id, Vec<i64>>,
    critical: HashMap<Id, Vec<i64>>,
    rate_limits: HashMap<String, (u64, std::time::Instant)>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn mark_session_active(&self, session_id: Id, _ttl: Duration) -> Result<(), EngineError> {
        self.inner.lock().unwrap().active.insert(session_id, std::time::Instant::now());
        Ok(())
    }

    async fn session_active(&self, session_id: Id) -> Result<bool, EngineError> {
        Ok(self.inner.lock().unwrap().active.contains_key(&session_id))
    }

    async fn clear_session_active(&self, session_id: Id) -> Result<(), EngineError> {
        self.inner.lock().unwrap().active.remove(&session_id);
        Ok(())
    }

    async fn set_question_order_if_absent(
        &self,
        exam_id: Id,
        user_id: Id,
        order: &[Id],
        _ttl: Duration,
    ) -> Result<bool, EngineError> {
        let mut guard = self.inner.lock().unwrap();
        let key = (exam_id, user_id);
        if guard.question_orders.contains_key(&key) {
            return Ok(false);
        }
        guard.question_orders.insert(key, order.to_vec());
        Ok(true)
    }

    async fn get_question_order(
        &self,
        exam_id: Id,
        user_id: Id,
    ) -> Result<Option<Vec<Id>>, EngineError> {
        Ok(self.inner.lock().unwrap().question_orders.get(&(exam_id, user_id)).cloned())
    }

    async fn set_refresh_jti(&self, user_id: Id, jti: &str, _ttl: Duration) -> Result<(), EngineError> {
        self.inner.lock().unwrap().refresh_jti.insert(user_id, jti.to_owned());
        Ok(())
    }

    async fn get_refresh_jti(&self, user_id: Id) -> Result<Option<String>, EngineError> {
        Ok(self.inner.lock().unwrap().refresh_jti.get(&user_id).cloned())
    }

    async fn revoke_jti(&self, jti: &str, _ttl: Duration) -> Result<(), EngineError> {
        self.inner.lock().unwrap().revoked.insert(jti.to_owned(), std::time::Instant::now());
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, EngineError> {
        Ok(self.inner.lock().unwrap().revoked.contains_key(jti))
    }

    async fn risk_window_record(
        &self,
        session_id: Id,
        now_ms: i64,
        window: Duration,
        _window_ttl: Duration,
        critical: bool,
    ) -> Result<(u64, u64), EngineError> {
        let mut guard = self.inner.lock().unwrap();
        let cutoff = now_ms - window.as_millis() as i64;

        let frames = guard.frames.entry(session_id).or_default();
        frames.push(now_ms);
        frames.retain(|&t| t >= cutoff);
        let frame_count = frames.len() as u64;

        if critical {
            let crit = guard.critical.entry(session_id).or_default();
            crit.push(now_ms);
            crit.retain(|&t| t >= cutoff);
        }
        if let Some(crit) = guard.critical.get_mut(&session_id) {
            crit.retain(|&t| t >= cutoff);
        }
        let critical_count = guard.critical.get(&session_id).map(|v| v.len()).unwrap_or(0) as u64;

        Ok((frame_count, critical_count))
    }

    async fn risk_window_clear(&self, session_id: Id) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().unwrap();
        guard.frames.remove(&session_id);
        guard.critical.remove(&session_id);
        Ok(())
    }

    async fn rate_limit_incr(&self, key: &str, window: Duration) -> Result<u64, EngineError> {
        let mut guard = self.inner.lock().unwrap();
        let now = std::time::Instant::now();
        let entry = guard.rate_limits.entry(key.to_owned()).or_insert((0, now));
        if now.duration_since(entry.1) > window {
            *entry = (0, now);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}

fn session_active_key(session_id: Id) -> String {
    format!("session:active:{session_id}")
}

fn question_order_key(exam_id: Id, user_id: Id) -> String {
    format!("exam:questions:{exam_id}:{user_id}")
}

fn refresh_key(user_id: Id) -> String {
    format!("refresh:{user_id}")
}

fn blacklist_key(jti: &str) -> String {
    format!("blacklist:jwt:{jti}")
}

fn risk_frames_key(session_id: Id) -> String {
    format!("risk:frames:{session_id}")
}

fn risk_critical_key(session_id: Id) -> String {
    format!("risk:critical:{session_id}")
}

fn cache_err(e: redis::RedisError) -> EngineError {
    EngineError::Cache(e.to_string())
}

/// Redis-backed `Cache` (spec §4.2). Session presence and the rate-limit and
/// risk-window counters live as plain strings/sorted sets with their own
/// TTLs; the shuffled question order is a JSON blob written with set-if-absent
/// semantics so two concurrent `start_session` calls never interleave.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, EngineError> {
        let client = redis::Client::open(redis_url).map_err(cache_err)?;
        let conn = ConnectionManager::new(client).await.map_err(cache_err)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn mark_session_active(&self, session_id: Id, ttl: Duration) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(session_active_key(session_id), 1, ttl.as_secs().max(1))
            .await
            .map_err(cache_err)
    }

    async fn session_active(&self, session_id: Id) -> Result<bool, EngineError> {
        let mut conn = self.conn.clone();
        conn.exists(session_active_key(session_id)).await.map_err(cache_err)
    }

    async fn clear_session_active(&self, session_id: Id) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(session_active_key(session_id)).await.map_err(cache_err)
    }

    async fn set_question_order_if_absent(
        &self,
        exam_id: Id,
        user_id: Id,
        order: &[Id],
        ttl: Duration,
    ) -> Result<bool, EngineError> {
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(order)
            .map_err(|e| EngineError::Cache(format!("question order serialization: {e}")))?;
        let opts = redis::SetOptions::new()
            .conditional_set(redis::ExistenceCheck::NX)
            .with_expiration(redis::SetExpiry::EX(ttl.as_secs().max(1) as usize));
        let set: Option<String> = conn
            .set_options(question_order_key(exam_id, user_id), payload, opts)
            .await
            .map_err(cache_err)?;
        Ok(set.is_some())
    }

    async fn get_question_order(
        &self,
        exam_id: Id,
        user_id: Id,
    ) -> Result<Option<Vec<Id>>, EngineError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(question_order_key(exam_id, user_id)).await.map_err(cache_err)?;
        raw.map(|s| {
            serde_json::from_str(&s).map_err(|e| EngineError::Cache(format!("question order parse: {e}")))
        })
        .transpose()
    }

    async fn set_refresh_jti(&self, user_id: Id, jti: &str, ttl: Duration) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(refresh_key(user_id), jti, ttl.as_secs().max(1)).await.map_err(cache_err)
    }

    async fn get_refresh_jti(&self, user_id: Id) -> Result<Option<String>, EngineError> {
        let mut conn = self.conn.clone();
        conn.get(refresh_key(user_id)).await.map_err(cache_err)
    }

    async fn revoke_jti(&self, jti: &str, ttl: Duration) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(blacklist_key(jti), 1, ttl.as_secs().max(1)).await.map_err(cache_err)
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, EngineError> {
        let mut conn = self.conn.clone();
        conn.exists(blacklist_key(jti)).await.map_err(cache_err)
    }

    async fn risk_window_record(
        &self,
        session_id: Id,
        now_ms: i64,
        window: Duration,
        window_ttl: Duration,
        critical: bool,
    ) -> Result<(u64, u64), EngineError> {
        let mut conn = self.conn.clone();
        let cutoff = now_ms - window.as_millis() as i64;
        let member = format!("{now_ms}:{}", rand::random::<u32>());
        let ttl_secs = window_ttl.as_secs().max(1) as i64;

        let frames_key = risk_frames_key(session_id);
        conn.zadd::<_, _, _, ()>(&frames_key, &member, now_ms).await.map_err(cache_err)?;
        conn.zrembyscore::<_, _, _, ()>(&frames_key, i64::MIN, cutoff - 1).await.map_err(cache_err)?;
        conn.expire::<_, ()>(&frames_key, ttl_secs).await.map_err(cache_err)?;
        let frame_count: u64 = conn.zcard(&frames_key).await.map_err(cache_err)?;

        let critical_key = risk_critical_key(session_id);
        if critical {
            conn.zadd::<_, _, _, ()>(&critical_key, &member, now_ms).await.map_err(cache_err)?;
        }
        conn.zrembyscore::<_, _, _, ()>(&critical_key, i64::MIN, cutoff - 1).await.map_err(cache_err)?;
        if critical {
            conn.expire::<_, ()>(&critical_key, ttl_secs).await.map_err(cache_err)?;
        }
        let critical_count: u64 = conn.zcard(&critical_key).await.map_err(cache_err)?;

        Ok((frame_count, critical_count))
    }

    async fn risk_window_clear(&self, session_id: Id) -> Result<(), EngineError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>((risk_frames_key(session_id), risk_critical_key(session_id))).await.map_err(cache_err)
    }

    async fn rate_limit_incr(&self, key: &str, window: Duration) -> Result<u64, EngineError> {
        let mut conn = self.conn.clone();
        let count: u64 = conn.incr(key, 1u64).await.map_err(cache_err)?;
        if count == 1 {
            conn.expire::<_, ()>(key, window.as_secs().max(1) as i64).await.map_err(cache_err)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
