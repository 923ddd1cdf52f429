// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Deployment environment. A default/placeholder token-signing secret is
/// refused outside `Development` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Process-wide configuration, parsed from CLI flags with environment
/// variable fallbacks (mirrors the teacher's `Config` derive).
#[derive(Debug, Parser)]
#[command(name = "examcore", version, about = "Realtime exam-proctoring session engine")]
pub struct Config {
    /// HTTP port to listen on.
    #[arg(long, env = "EXAMCORE_PORT", default_value = "8080")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "EXAMCORE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Health-check-only HTTP port (for orchestrator probes).
    #[arg(long, env = "EXAMCORE_HEALTH_PORT")]
    pub health_port: Option<u16>,

    /// Deployment environment.
    #[arg(long, env = "EXAMCORE_ENV", value_enum, default_value = "development")]
    pub environment: Environment,

    /// Log format (json or text).
    #[arg(long, env = "EXAMCORE_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "EXAMCORE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Postgres connection string.
    #[arg(long, env = "EXAMCORE_DATABASE_URL")]
    pub database_url: String,

    /// Redis connection string.
    #[arg(long, env = "EXAMCORE_REDIS_URL")]
    pub redis_url: String,

    /// AMQP broker connection string.
    #[arg(long, env = "EXAMCORE_AMQP_URL")]
    pub amqp_url: String,

    /// S3-compatible object store endpoint (empty = default AWS resolution).
    #[arg(long, env = "EXAMCORE_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// Base URL of the external vision/audio/identity inference service.
    #[arg(long, env = "EXAMCORE_INFERENCE_URL")]
    pub inference_url: String,

    /// HMAC secret used to sign ACCESS/REFRESH capabilities. A default
    /// placeholder value is refused outside `development`.
    #[arg(long, env = "EXAMCORE_TOKEN_SECRET")]
    pub token_secret: String,

    /// ACCESS capability lifetime in seconds.
    #[arg(long, env = "EXAMCORE_ACCESS_TTL_SECS", default_value = "3600")]
    pub access_ttl_secs: u64,

    /// REFRESH capability lifetime in seconds.
    #[arg(long, env = "EXAMCORE_REFRESH_TTL_SECS", default_value = "604800")]
    pub refresh_ttl_secs: u64,

    /// Severity threshold (inclusive) at which a student-facing warning is
    /// sent immediately, expressed as a risk score.
    #[arg(long, env = "EXAMCORE_HIGH_RISK_THRESHOLD", default_value = "0.75")]
    pub high_risk_threshold: f64,

    /// Risk score above which a frame counts toward the rolling `critical`
    /// ordered set.
    #[arg(long, env = "EXAMCORE_CRITICAL_RISK_THRESHOLD", default_value = "0.90")]
    pub critical_risk_threshold: f64,

    /// Width of the rolling risk window, in seconds.
    #[arg(long, env = "EXAMCORE_WINDOW_SECONDS", default_value = "30")]
    pub window_seconds: u64,

    /// TTL applied to the risk-window cache keys (3x window by default).
    #[arg(long, env = "EXAMCORE_WINDOW_TTL_SECONDS", default_value = "90")]
    pub window_ttl_seconds: u64,

    /// Minimum frames required in the window before the ratio rule applies.
    #[arg(long, env = "EXAMCORE_MIN_FRAMES_IN_WINDOW", default_value = "5")]
    pub min_frames_in_window: u64,

    /// Critical/total ratio that triggers auto-suspension.
    #[arg(long, env = "EXAMCORE_CRITICAL_RATIO_THRESHOLD", default_value = "0.70")]
    pub critical_ratio_threshold: f64,

    /// Heartbeat staleness after which the stale-session closer submits.
    #[arg(long, env = "EXAMCORE_HEARTBEAT_TIMEOUT_SECS", default_value = "900")]
    pub heartbeat_timeout_secs: u64,

    /// Timeout for the synchronous identity-verification HTTP call.
    #[arg(long, env = "EXAMCORE_INFERENCE_TIMEOUT_SECS", default_value = "5")]
    pub inference_timeout_secs: u64,

    /// Days after which violation snapshots / audio clips are purged.
    #[arg(long, env = "EXAMCORE_SNAPSHOT_RETENTION_DAYS", default_value = "30")]
    pub snapshot_retention_days: i64,

    /// Max `/api/auth/refresh` calls per caller per minute before a 503
    /// is returned instead of rotating the capability.
    #[arg(long, env = "EXAMCORE_REFRESH_RATE_LIMIT_PER_MINUTE", default_value = "10")]
    pub refresh_rate_limit_per_minute: u64,

    /// Max inbound `/app/exam/*` realtime frames per connection per
    /// minute before later frames in the window are silently dropped.
    #[arg(long, env = "EXAMCORE_WS_INBOUND_RATE_LIMIT_PER_MINUTE", default_value = "120")]
    pub ws_inbound_rate_limit_per_minute: u64,
}

impl Config {
    /// Validate configuration invariants that `clap` cannot express,
    /// mirroring the teacher's fail-fast `Config::validate()`.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.environment != Environment::Development {
            let placeholder = self.token_secret.is_empty()
                || self.token_secret.eq_ignore_ascii_case("changeme")
                || self.token_secret.eq_ignore_ascii_case("secret")
                || self.token_secret.len() < 16;
            if placeholder {
                anyhow::bail!(
                    "refusing to start outside development with a missing or placeholder \
                     EXAMCORE_TOKEN_SECRET"
                );
            }
        }

        if self.critical_ratio_threshold < 0.0 || self.critical_ratio_threshold > 1.0 {
            anyhow::bail!("EXAMCORE_CRITICAL_RATIO_THRESHOLD must be within [0, 1]");
        }
        if self.high_risk_threshold < 0.0 || self.high_risk_threshold > 1.0 {
            anyhow::bail!("EXAMCORE_HIGH_RISK_THRESHOLD must be within [0, 1]");
        }
        if self.critical_risk_threshold < 0.0 || self.critical_risk_threshold > 1.0 {
            anyhow::bail!("EXAMCORE_CRITICAL_RISK_THRESHOLD must be within [0, 1]");
        }

        Ok(())
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn window_ttl(&self) -> Duration {
        Duration::from_secs(self.window_ttl_seconds)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    /// All `ratelimit:*` counters use the same fixed window (spec §4.2);
    /// only the per-key threshold varies by surface.
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(60)
    }
}

/// Initialize the global tracing subscriber, matching the teacher's
/// `init_tracing`: JSON by default, pretty text with `--log-format text`.
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    if let Err(e) = result {
        eprintln!("tracing subscriber already initialized: {e}");
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
