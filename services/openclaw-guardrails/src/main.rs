// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! OpenClaw Guardrails Service
//!
//! Sidecar for the directory site's route handlers and page builders:
//!
//! - `POST /check`: sliding-window rate limit check for a caller-chosen key
//! - `POST /seo/evaluate`: indexability and canonical target for a page
//! - `GET /metrics`: Prometheus metrics
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT`: Default requests per window (default: 60)
//! - `RATE_WINDOW_MS`: Default window in milliseconds (default: 60000)
//! - `SWEEP_INTERVAL_SECS`: Idle key sweep interval (default: 60)
//! - `RATE_MAX_AGE_SECS`: Idle key max age (default: 120)
//! - `SEO_MIN_WORDS`: Thin-content threshold (default: 0, disabled)
//! - `SEO_NEAR_DISTANCE`: Near-duplicate SimHash distance (default: 0, exact only)
//! - `SEO_FAIL_OPEN`: Treat duplicate detector failures as unique content (default: false)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use openclaw_guardrails::{
    config::Config,
    detector::InMemoryDuplicateDetector,
    handlers::{router, AppState},
    limiter::{spawn_sweeper, RateLimiter},
    metrics::Metrics,
    seo::{DetectorFailurePolicy, GuardrailEngine},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        default_limit = config.rate_limit.default_limit,
        default_window_ms = config.rate_limit.default_window_ms,
        min_words = config.seo.min_words,
        near_distance = config.seo.near_distance,
        fail_open = config.seo.fail_open,
        "Starting OpenClaw guardrails"
    );

    let failure_policy = if config.seo.fail_open {
        DetectorFailurePolicy::FailOpen
    } else {
        DetectorFailurePolicy::Propagate
    };
    let engine = GuardrailEngine::new()
        .with_detector(Arc::new(InMemoryDuplicateDetector::new(config.seo.near_distance)))
        .with_failure_policy(failure_policy);

    let state = Arc::new(AppState {
        limiter: Arc::new(RateLimiter::new()),
        engine,
        metrics: Metrics::new()?,
        config: config.clone(),
    });

    let sweep_metrics = state.metrics.clone();
    let sweeper = spawn_sweeper(
        state.limiter.clone(),
        config.rate_limit.sweep_interval(),
        config.rate_limit.max_age(),
        move |removed| sweep_metrics.record_swept(removed),
    );

    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
