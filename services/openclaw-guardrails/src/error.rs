// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the guardrails service.

use thiserror::Error;

/// Failure reported by a duplicate detector backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetectorError {
    #[error("Duplicate index backend error: {0}")]
    Backend(String),

    #[error("Duplicate index unavailable: {0}")]
    Unavailable(String),
}

/// SEO guardrail evaluation errors.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// The duplicate detector could not answer; the content was not judged.
    #[error("Duplicate detection failed for {canonical_path}: {source}")]
    DuplicateDetection {
        canonical_path: String,
        #[source]
        source: DetectorError,
    },
}

/// Configuration loading errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
