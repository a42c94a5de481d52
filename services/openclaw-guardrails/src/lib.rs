// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! OpenClaw Guardrails
//!
//! Request throttling and search-index hygiene for the "Can it run
//! OpenClaw?" directory:
//!
//! - Sliding-window rate limiting keyed by arbitrary strings
//! - Idle-key sweeping on a cancellable background task
//! - Thin-content and duplicate-content gates for generated pages
//! - Canonical path and pSEO slug builders

pub mod config;
pub mod detector;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod paths;
pub mod seo;

pub use config::Config;
pub use detector::{DuplicateDetector, InMemoryDuplicateDetector};
pub use error::{ConfigError, DetectorError, GuardrailError};
pub use limiter::{spawn_sweeper, RateLimitOutcome, RateLimiter, SweepHandle};
pub use seo::{evaluate, GuardrailEngine, GuardrailInput, GuardrailReason, GuardrailResult};
