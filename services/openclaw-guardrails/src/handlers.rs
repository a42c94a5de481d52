// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the guardrails service.
//!
//! The site's route handlers and page-metadata builders call this service
//! before doing work (`/check`) and when rendering robots/canonical tags
//! (`/seo/evaluate`).

use crate::config::Config;
use crate::limiter::RateLimiter;
use crate::metrics::Metrics;
use crate::seo::{GuardrailEngine, GuardrailInput, GuardrailReason, RobotsDirective, SeoContent, SeoPolicy};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub engine: GuardrailEngine,
    pub metrics: Metrics,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Rate limit check request.
#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// Caller-chosen key, e.g. `"rate:10.0.0.1"`
    pub key: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub window_ms: Option<u64>,
}

/// Rate limit check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub remaining: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

/// Guardrail evaluation request; omitted fields fall back to service config.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub canonical_path: String,
    #[serde(default)]
    pub requested_indexable: Option<bool>,
    pub content: SeoContent,
    #[serde(default)]
    pub policy: Option<SeoPolicy>,
}

/// Guardrail evaluation response.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluateResponse {
    pub indexable: bool,
    pub canonical_path: String,
    pub reasons: Vec<GuardrailReason>,
    pub robots: RobotsDirective,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/check", post(check))
        .route("/seo/evaluate", post(evaluate));

    if state.config.metrics.enabled {
        app = app.route(&state.config.metrics.path, get(metrics));
    }

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "openclaw-guardrails",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Check and consume a rate limit slot.
///
/// Denials are answered with 200 so a fronting proxy can read the body.
pub async fn check(State(state): State<Arc<AppState>>, Json(req): Json<CheckRequest>) -> Response {
    if req.key.trim().is_empty() {
        warn!("Rate limit check without a key");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Rate limit key must not be empty".to_string(),
                code: "MISSING_KEY",
            }),
        )
            .into_response();
    }

    let limit = req.limit.unwrap_or(state.config.rate_limit.default_limit);
    let window_ms = req.window_ms.unwrap_or(state.config.rate_limit.default_window_ms);
    let outcome = state.limiter.check_and_consume(&req.key, limit, window_ms);
    state.metrics.record_rate_limit(&outcome);

    if outcome.success {
        debug!(key = %req.key, remaining = outcome.remaining, "Request allowed");
    } else {
        info!(
            key = %req.key,
            limit,
            window_ms,
            retry_after_ms = outcome.retry_after_ms,
            "Request rate limited"
        );
    }

    Json(CheckResponse {
        allowed: outcome.success,
        remaining: outcome.remaining,
        retry_after_ms: (!outcome.success).then_some(outcome.retry_after_ms),
    })
    .into_response()
}

/// Evaluate indexability and canonical target for a page.
pub async fn evaluate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EvaluateRequest>,
) -> Response {
    let policy = req
        .policy
        .unwrap_or_else(|| SeoPolicy::min_words(state.config.seo.min_words));
    let input = GuardrailInput::new(req.canonical_path, req.content)
        .with_requested_indexable(req.requested_indexable.unwrap_or(true))
        .with_policy(policy);

    match state.engine.evaluate(&input).await {
        Ok(result) => {
            state.metrics.record_evaluation(&result);
            let robots = result.robots();
            Json(EvaluateResponse {
                indexable: result.indexable,
                canonical_path: result.canonical_path,
                reasons: result.reasons,
                robots,
            })
            .into_response()
        }
        Err(err) => {
            state.metrics.record_detector_failure();
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "DUPLICATE_DETECTION_FAILED",
                }),
            )
                .into_response()
        }
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => body.into_response(),
        Err(err) => {
            warn!(error = %err, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
