// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for limiter and guardrail outcomes.

use crate::limiter::RateLimitOutcome;
use crate::seo::GuardrailResult;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Service metrics, registered on a private registry.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    rate_limit_checks: IntCounterVec,
    seo_evaluations: IntCounterVec,
    swept_keys: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let rate_limit_checks = IntCounterVec::new(
            Opts::new("guardrails_rate_limit_checks_total", "Rate limit checks by outcome"),
            &["outcome"],
        )?;
        let seo_evaluations = IntCounterVec::new(
            Opts::new("guardrails_seo_evaluations_total", "SEO guardrail evaluations by verdict"),
            &["verdict"],
        )?;
        let swept_keys = IntCounter::new(
            "guardrails_rate_limit_swept_keys_total",
            "Idle rate limit keys removed by the sweeper",
        )?;

        registry.register(Box::new(rate_limit_checks.clone()))?;
        registry.register(Box::new(seo_evaluations.clone()))?;
        registry.register(Box::new(swept_keys.clone()))?;

        Ok(Self {
            registry,
            rate_limit_checks,
            seo_evaluations,
            swept_keys,
        })
    }

    pub fn record_rate_limit(&self, outcome: &RateLimitOutcome) {
        let label = if outcome.success { "allowed" } else { "limited" };
        self.rate_limit_checks.with_label_values(&[label]).inc();
    }

    pub fn record_evaluation(&self, result: &GuardrailResult) {
        let label = if result.indexable { "index" } else { "noindex" };
        self.seo_evaluations.with_label_values(&[label]).inc();
    }

    pub fn record_detector_failure(&self) {
        self.seo_evaluations.with_label_values(&["error"]).inc();
    }

    pub fn record_swept(&self, removed: usize) {
        self.swept_keys.inc_by(removed as u64);
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
