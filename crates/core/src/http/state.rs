// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::ingestion::IngestionService;
use crate::realtime::RealtimeHub;
use crate::session::SessionEngine;
use crate::store::StoreGateway;
use crate::token::TokenService;

/// Everything an HTTP handler needs, assembled once at startup in `run.rs`
/// and shared behind an `Arc` across every request.
pub struct AppState {
    pub token_service: Arc<TokenService>,
    pub store: Arc<dyn StoreGateway>,
    pub cache: Arc<dyn Cache>,
    pub session_engine: Arc<SessionEngine>,
    pub ingestion: Arc<IngestionService>,
    pub hub: Arc<RealtimeHub>,
    /// Max `/api/auth/refresh` calls per caller per minute (spec §6).
    pub refresh_rate_limit_per_minute: u64,
    pub rate_limit_window: Duration,
}
