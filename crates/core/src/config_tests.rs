// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::{Config, Environment};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

fn base_args() -> Vec<&'static str> {
    vec![
        "examcore",
        "--database-url",
        "postgres://localhost/exams",
        "--redis-url",
        "redis://localhost",
        "--amqp-url",
        "amqp://localhost",
        "--inference-url",
        "http://inference.internal",
        "--token-secret",
        "a-sufficiently-long-dev-secret",
    ]
}

#[test]
fn defaults_are_populated() {
    let config = parse(&base_args());
    assert_eq!(config.port, 8080);
    assert_eq!(config.access_ttl_secs, 3600);
    assert_eq!(config.refresh_ttl_secs, 604_800);
    assert_eq!(config.window_seconds, 30);
    assert_eq!(config.min_frames_in_window, 5);
    assert!((config.critical_ratio_threshold - 0.70).abs() < f64::EPSILON);
}

#[test]
fn development_accepts_placeholder_secret() -> anyhow::Result<()> {
    let mut args = vec![
        "examcore",
        "--database-url",
        "postgres://localhost/exams",
        "--redis-url",
        "redis://localhost",
        "--amqp-url",
        "amqp://localhost",
        "--inference-url",
        "http://inference.internal",
        "--token-secret",
        "changeme",
    ];
    args.push("--env");
    args.push("development");
    let config = parse(&args);
    config.validate()
}

#[test]
fn production_refuses_placeholder_secret() {
    let mut args = base_args();
    // Replace the dev secret with a placeholder and switch environment.
    let secret_pos = args.iter().position(|a| *a == "a-sufficiently-long-dev-secret").unwrap();
    args[secret_pos] = "changeme";
    args.push("--env");
    args.push("production");
    let config = parse(&args);
    assert!(config.validate().is_err());
}

#[test]
fn production_accepts_real_secret() -> anyhow::Result<()> {
    let mut args = base_args();
    args.push("--env");
    args.push("production");
    let config = parse(&args);
    assert_eq!(config.environment, Environment::Production);
    config.validate()
}

#[test]
fn rejects_out_of_range_ratio_threshold() {
    let mut args = base_args();
    args.push("--critical-ratio-threshold");
    args.push("1.5");
    let config = parse(&args);
    assert!(config.validate().is_err());
}

#[test]
fn duration_helpers_convert_seconds() {
    let config = parse(&base_args());
    assert_eq!(config.window().as_secs(), 30);
    assert_eq!(config.access_ttl().as_secs(), 3600);
}
