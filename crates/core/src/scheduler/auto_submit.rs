// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-of-exam auto-submit: a student who never clicks "submit" still gets
//! graded on whatever they answered once the exam's effective deadline
//! passes.

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

            if let Err(e) = tick(&*store, &session_engine).await {
                tracing::error!(error = %e, "auto-submit tick failed");
            }
        }
    });
}

async fn tick(store: &dyn StoreGateway, session_engine: &SessionEngine) -> Result<(), EngineError> {
    let due = store.list_sessions_past_deadline(Utc::now()).await?;
    for session in due {
        let result = retry_on_concurrent_modification(|| session_engine.auto_submit_session(session.id)).await;
        if let Err(e) = result {
            tracing::warn!(session_id = %session.id, error = %e, "could not auto-submit past-deadline session");
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "auto_submit_tests.rs"]
mod tests;
