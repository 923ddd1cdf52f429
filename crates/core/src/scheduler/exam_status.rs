// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exam-status ticker: `Published -> Ongoing` at `start_time`, `Ongoing ->
//! Completed` at `end_time`. Runs every `interval` (60s by default).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::model::{Exam, ExamStatus};
use crate::store::StoreGateway;

/// Pure decision function kept separate from the I/O loop so the four
/// status-transition rules are unit-testable without a store.
pub fn due_transition(exam: &Exam, now: DateTime<Utc>) -> Option<ExamStatus> {
    match exam.status {
        ExamStatus::Published if now >= exam.start_time => Some(ExamStatus::Ongoing),
        ExamStatus::Ongoing if now >= exam.end_time => Some(ExamStatus::Completed),
        _ => None,
    }
}

pub fn spawn(store: Arc<dyn StoreGateway>, interval: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = tick(&*store).await {
                tracing::error!(error = %e, "exam status tick failed");
            }
        }
    });
}

async fn tick(store: &dyn StoreGateway) -> Result<(), crate::error::EngineError> {
    let now = Utc::now();
    for status in [ExamStatus::Published, ExamStatus::Ongoing] {
        for exam in store.list_exams_by_status(status).await? {
            if let Some(next) = due_transition(&exam, now) {
                store.update_exam_status(exam.id, next).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "exam_status_tests.rs"]
mod tests;
