// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup wiring — shared by `main` and integration tests.
//!
//! Connects every adapter (C1-C4), assembles the Session Engine and
//! Ingestion Service, spawns the scheduled transitioners and the inference
//! result consumer, and serves the combined HTTP/WebSocket listener until
//! a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use lapin::ConnectionProperties;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bus::{AmqpBus, Bus, PROCTORING_RESULTS_QUEUE};
use crate::cache::{Cache, RedisCache};
use crate::config::Config;
use crate::http::state::AppState;
use crate::inference_client::HttpInferenceClient;
use crate::inference_consumer::{InferenceConsumer, RiskThresholds};
use crate::ingestion::IngestionService;
use crate::object_store::{ObjectStore, S3ObjectStore};
use crate::realtime::ws::RealtimeState;
use crate::realtime::RealtimeHub;
use crate::scheduler::{self, SchedulerConfig};
use crate::session::SessionEngine;
use crate::store::postgres::PostgresStore;
use crate::store::StoreGateway;
use crate::token::TokenService;

/// Build the S3-compatible object store client. `config.s3_endpoint` lets a
/// local MinIO stand in for AWS S3 in development; real AWS deployments
/// leave it unset and resolve credentials/region the normal SDK way.
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let shared_config = match &config.s3_endpoint {
        Some(endpoint) => {
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .endpoint_url(endpoint)
                .load()
                .await
        }
        None => aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await,
    };
    aws_sdk_s3::Client::new(&shared_config)
}

/// Prepare every adapter and service, spawn the background workers, and
/// serve HTTP/WebSocket traffic until `shutdown` is cancelled.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let pool = PgPoolOptions::new().max_connections(20).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let store: Arc<dyn StoreGateway> = Arc::new(PostgresStore::new(pool));

    let cache: Arc<dyn Cache> = Arc::new(RedisCache::connect(&config.redis_url).await?);

    let amqp_connection =
        lapin::Connection::connect(&config.amqp_url, ConnectionProperties::default()).await?;
    let bus: Arc<dyn Bus> = Arc::new(AmqpBus::new(amqp_connection));
    bus.bootstrap_topology().await?;

    let objects: Arc<dyn ObjectStore> = Arc::new(S3ObjectStore::new(build_s3_client(&config).await));
    objects.bootstrap_buckets().await?;

    let inference = Arc::new(HttpInferenceClient::new(
        config.inference_url.clone(),
        config.inference_timeout(),
    )?);

    let hub = Arc::new(RealtimeHub::new());
    let token_service = Arc::new(TokenService::new(
        &config.token_secret,
        config.access_ttl(),
        config.refresh_ttl(),
        cache.clone(),
    ));
    let session_engine = Arc::new(SessionEngine::new(
        store.clone(),
        cache.clone(),
        inference,
        hub.clone(),
        config.heartbeat_timeout(),
    ));
    let ingestion = Arc::new(IngestionService::new(
        store.clone(),
        bus.clone(),
        objects.clone(),
        session_engine.clone(),
        hub.clone(),
    ));

    let app_state = Arc::new(AppState {
        token_service: token_service.clone(),
        store: store.clone(),
        cache: cache.clone(),
        session_engine: session_engine.clone(),
        ingestion: ingestion.clone(),
        hub: hub.clone(),
        refresh_rate_limit_per_minute: config.refresh_rate_limit_per_minute,
        rate_limit_window: config.rate_limit_window(),
    });

    let realtime_state = Arc::new(RealtimeState {
        token_service,
        hub: hub.clone(),
        store: store.clone(),
        session_engine: session_engine.clone(),
        ingestion,
        cache: cache.clone(),
        ws_inbound_rate_limit: config.ws_inbound_rate_limit_per_minute,
    });

    // Spawn the inference result consumer — exactly one, since the
    // rolling-window auto-suspend trigger assumes a single reader per
    // session's ordered result stream.
    {
        let thresholds = RiskThresholds {
            high_risk_threshold: config.high_risk_threshold,
            critical_risk_threshold: config.critical_risk_threshold,
            window: config.window(),
            window_ttl: config.window_ttl(),
            min_frames_in_window: config.min_frames_in_window,
            critical_ratio_threshold: config.critical_ratio_threshold,
        };
        let consumer = InferenceConsumer::new(
            store.clone(),
            cache.clone(),
            session_engine.clone(),
            hub.clone(),
            thresholds,
        );
        let bus = bus.clone();
        tokio::spawn(async move {
            if let Err(e) = consumer.run(bus, PROCTORING_RESULTS_QUEUE).await {
                error!("inference result consumer exited: {e}");
            }
        });
    }

    scheduler::spawn_all(
        store.clone(),
        session_engine,
        objects,
        SchedulerConfig {
            exam_status_interval: Duration::from_secs(30),
            auto_submit_interval: Duration::from_secs(15),
            stale_session_interval: Duration::from_secs(60),
            stale_session_cutoff: config.heartbeat_timeout(),
            content_expiry_interval: Duration::from_secs(3600),
            snapshot_retention: chrono::Duration::days(config.snapshot_retention_days),
        },
        shutdown.clone(),
    );

    // Main listener combines the REST surface and the WebSocket endpoint;
    // both share the same `RealtimeHub` and store handles but are driven
    // by distinct extractor state, so they're built as separate routers
    // and merged rather than forced into one `AppState`.
    let app = crate::http::build_router(app_state.clone()).merge(
        Router::new().route("/ws", get(crate::realtime::ws::handler)).with_state(realtime_state),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP/WebSocket listening on {}", listener.local_addr()?);
    let sd = shutdown.clone();
    tokio::spawn(async move {
        let result = axum::serve(listener, app).with_graceful_shutdown(sd.cancelled_owned()).await;
        if let Err(e) = result {
            error!("HTTP server error: {e}");
        }
    });

    if let Some(health_port) = config.health_port {
        let health_router = crate::http::build_health_router(app_state);
        let addr = format!("{}:{}", config.host, health_port);
        let listener = TcpListener::bind(&addr).await?;
        info!("health probe listening on {addr}");
        let sd = shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, health_router)
                .with_graceful_shutdown(sd.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!("health server error: {e}");
            }
        });
    }

    // First signal triggers graceful shutdown; a second forces immediate exit.
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }
    shutdown.cancel();

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM again, forcing exit"),
        _ = sigint.recv() => info!("received SIGINT again, forcing exit"),
        _ = tokio::time::sleep(Duration::from_secs(10)) => info!("graceful shutdown window elapsed"),
    }

    Ok(())
}
