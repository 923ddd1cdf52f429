// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale-session closer: a client that stops sending heartbeats (closed
//! laptop, crashed tab, lost network) leaves an open session behind
//! forever unless something force-closes it. Runs every 5 minutes by
//! default and auto-submits anything whose last heartbeat is older than
//! `cutoff`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::scheduler::retry_on_concurrent_modification;
use crate::session::SessionEngine;
use crate::store::StoreGateway;

pub fn spawn(
    store: Arc<dyn StoreGateway>,
    session_engine: Arc<SessionEngine>,
    interval: Duration,
    cutoff: Duration,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = tick(&*store, &session_engine, cutoff).await {
                tracing::error!(error = %e, "stale session closer tick failed");
            }
        }
    });
}

async fn tick(store: &dyn StoreGateway, session_engine: &SessionEngine, cutoff: Duration) -> Result<(), EngineError> {
    let deadline = Utc::now() - chrono::Duration::from_std(cutoff).unwrap_or(chrono::Duration::zero());
    let stale = store.list_stale_sessions(deadline).await?;
    for session in stale {
        let result = retry_on_concurrent_modification(|| session_engine.auto_submit_session(session.id)).await;
        if let Err(e) = result {
            tracing::warn!(session_id = %session.id, error = %e, "could not close stale session");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "stale_closer_tests.rs"]
mod tests;
