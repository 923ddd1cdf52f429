// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daily content-expiry sweep: violation snapshots and audio clips older
//! than the retention window are purged from object storage. The store
//! only ever returns keys tied to events older than `cutoff`; deletion
//! itself is best-effort per key so one bad object doesn't stall the rest
//! of the sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::object_store::ObjectStore;
use crate::store::StoreGateway;

pub fn spawn(
    store: Arc<dyn StoreGateway>,
    objects: Arc<dyn ObjectStore>,
    interval: Duration,
    retention: chrono::Duration,
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

            if let Err(e) = tick(&*store, &*objects, retention).await {
                tracing::error!(error = %e, "content expiry sweep failed");
            }
        }
    });
}

async fn tick(store: &dyn StoreGateway, objects: &dyn ObjectStore, retention: chrono::Duration) -> Result<(), EngineError> {
    let cutoff = Utc::now() - retention;
    let expired = store.list_expired_object_keys(cutoff).await?;
    let mut purged = 0usize;
    for (bucket, key) in expired {
        match objects.delete(&bucket, &key).await {
            Ok(()) => purged += 1,
            Err(e) => tracing::warn!(bucket = %bucket, key = %key, error = %e, "could not purge expired object"),
        }
    }
    tracing::info!(purged, "content expiry sweep complete");
    Ok(())
}

#[cfg(test)]
#[path = "content_expiry_tests.rs"]
mod tests;
