// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled Transitioners (C10): four background ticks that move exams
//! and sessions through states no client request ever triggers directly
//! (spec §4.10). Grounded on the teacher's upstream pollers
//! (`upstream/poller.rs`) for the spawn/interval/cancellation shape.

pub mod auto_submit;
pub mod content_expiry;
pub mod exam_status;
pub mod stale_closer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{EngineError, ErrorCode};
use crate::object_store::ObjectStore;
use crate::session::SessionEngine;
use crate::store::StoreGateway;

/// Retries `op` up to twice more (three attempts total) while it keeps
/// failing with `CONCURRENT_MODIFICATION` — a tick racing a student's own
/// heartbeat/answer write should win the retry rather than drop the
/// session for that whole tick (spec §5, §7).
pub(crate) async fn retry_on_concurrent_modification<T, F, Fut>(mut op: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    const MAX_ATTEMPTS: u32 = 3;
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.code() == ErrorCode::ConcurrentModification && attempt < MAX_ATTEMPTS => continue,
            Err(e) => return Err(e),
        }
    }
}

pub struct SchedulerConfig {
    pub exam_status_interval: Duration,
    pub auto_submit_interval: Duration,
    pub stale_session_interval: Duration,
    pub stale_session_cutoff: Duration,
    pub content_expiry_interval: Duration,
    pub snapshot_retention: chrono::Duration,
}

/// Spawns all four transitioner loops. Each runs until `cancel` fires;
/// callers join nothing back — these are fire-and-forget background tasks
/// for the lifetime of the process.
pub fn spawn_all(
    store: Arc<dyn StoreGateway>,
    session_engine: Arc<SessionEngine>,
    objects: Arc<dyn ObjectStore>,
    config: SchedulerConfig,
    cancel: CancellationToken,
) {
    exam_status::spawn(store.clone(), config.exam_status_interval, cancel.clone());
    auto_submit::spawn(store.clone(), session_engine.clone(), config.auto_submit_interval, cancel.clone());
    stale_closer::spawn(
        store.clone(),
        session_engine,
        config.stale_session_interval,
        config.stale_session_cutoff,
        cancel.clone(),
    );
    content_expiry::spawn(store, objects, config.content_expiry_interval, config.snapshot_retention, cancel);
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
