// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SEO guardrails for generated directory pages.
//!
//! Every page passes two gates before its robots and canonical metadata are
//! emitted, always in this order:
//!
//! 1. Thin content: description + body shorter than `policy.min_words`
//!    words is not indexable.
//! 2. Duplicates: if a [`DuplicateDetector`] recognises the content as
//!    already published elsewhere, the page is not indexable and its
//!    canonical points at the first-seen path.
//!
//! The duplicate gate overrides indexability regardless of the thin gate;
//! canonical rewriting only ever comes from the duplicate gate.

use crate::detector::DuplicateDetector;
use crate::error::GuardrailError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Page text used to judge thinness and duplication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoContent {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h1: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl SeoContent {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_h1(mut self, h1: impl Into<String>) -> Self {
        self.h1 = Some(h1.into());
        self
    }

    pub fn with_headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headings = headings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whitespace-separated words across the description and body.
    pub fn word_count(&self) -> usize {
        let body = self.body.as_deref().unwrap_or("");
        self.description.split_whitespace().count() + body.split_whitespace().count()
    }
}

/// Thin-content policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoPolicy {
    /// Minimum word count; zero or negative disables the gate
    #[serde(default)]
    pub min_words: i64,
}

impl SeoPolicy {
    pub fn min_words(min_words: i64) -> Self {
        Self { min_words }
    }

    fn threshold(&self) -> usize {
        usize::try_from(self.min_words.max(0)).unwrap_or(usize::MAX)
    }
}

/// Content keyed by the path it is meant to be indexed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentFingerprint {
    pub canonical_path: String,
    pub content: SeoContent,
}

/// How closely a page matched previously seen content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    Exact,
    Near,
}

/// A duplicate detector hit: the content was first seen at `canonical_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateMatch {
    pub canonical_path: String,
    #[serde(rename = "type")]
    pub kind: DuplicateKind,
}

/// Why a page was judged non-indexable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardrailReason {
    ThinContent,
    DuplicateExact,
    DuplicateNear,
}

impl GuardrailReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThinContent => "thin_content",
            Self::DuplicateExact => "duplicate_exact",
            Self::DuplicateNear => "duplicate_near",
        }
    }
}

impl std::fmt::Display for GuardrailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DuplicateKind> for GuardrailReason {
    fn from(kind: DuplicateKind) -> Self {
        match kind {
            DuplicateKind::Exact => Self::DuplicateExact,
            DuplicateKind::Near => Self::DuplicateNear,
        }
    }
}

/// Input to a guardrail evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailInput {
    pub canonical_path: String,
    #[serde(default = "default_true")]
    pub requested_indexable: bool,
    pub content: SeoContent,
    #[serde(default)]
    pub policy: SeoPolicy,
}

fn default_true() -> bool {
    true
}

impl GuardrailInput {
    pub fn new(canonical_path: impl Into<String>, content: SeoContent) -> Self {
        Self {
            canonical_path: canonical_path.into(),
            requested_indexable: true,
            content,
            policy: SeoPolicy::default(),
        }
    }

    pub fn with_requested_indexable(mut self, indexable: bool) -> Self {
        self.requested_indexable = indexable;
        self
    }

    pub fn with_policy(mut self, policy: SeoPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn fingerprint(&self) -> ContentFingerprint {
        ContentFingerprint {
            canonical_path: self.canonical_path.clone(),
            content: self.content.clone(),
        }
    }
}

/// Final verdict for a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub indexable: bool,
    pub canonical_path: String,
    /// Reasons in the order the gates fired; empty when indexable
    pub reasons: Vec<GuardrailReason>,
}

/// Robots meta directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotsDirective {
    pub index: bool,
    pub follow: bool,
}

/// Robots and canonical link metadata for a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub robots: RobotsDirective,
    pub canonical_url: String,
}

impl GuardrailResult {
    /// Links are always followed; only indexing is withheld.
    pub fn robots(&self) -> RobotsDirective {
        RobotsDirective {
            index: self.indexable,
            follow: true,
        }
    }

    /// Metadata with the canonical path resolved against `site_url`.
    pub fn metadata(&self, site_url: &str) -> PageMetadata {
        PageMetadata {
            robots: self.robots(),
            canonical_url: format!("{}{}", site_url.trim_end_matches('/'), self.canonical_path),
        }
    }
}

/// What to do when the duplicate detector fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorFailurePolicy {
    /// Return [`GuardrailError::DuplicateDetection`] to the caller
    #[default]
    Propagate,
    /// Log and judge the page as if no duplicate was found
    FailOpen,
}

/// Evaluate `input`, propagating detector failures.
pub async fn evaluate(
    input: &GuardrailInput,
    detector: Option<&dyn DuplicateDetector>,
) -> Result<GuardrailResult, GuardrailError> {
    evaluate_with_policy(input, detector, DetectorFailurePolicy::Propagate).await
}

async fn evaluate_with_policy(
    input: &GuardrailInput,
    detector: Option<&dyn DuplicateDetector>,
    on_failure: DetectorFailurePolicy,
) -> Result<GuardrailResult, GuardrailError> {
    let mut reasons = Vec::new();
    let mut canonical_path = input.canonical_path.clone();

    let min_words = input.policy.threshold();
    if min_words > 0 {
        let words = input.content.word_count();
        if words < min_words {
            debug!(path = %input.canonical_path, words, min_words, "Thin content");
            reasons.push(GuardrailReason::ThinContent);
        }
    }

    if let Some(detector) = detector {
        match detector.find_duplicate(&input.fingerprint()).await {
            Ok(Some(found)) => {
                info!(
                    path = %input.canonical_path,
                    canonical = %found.canonical_path,
                    kind = ?found.kind,
                    "Duplicate content canonicalized"
                );
                if found.canonical_path != input.canonical_path {
                    canonical_path = found.canonical_path;
                }
                let reason = GuardrailReason::from(found.kind);
                if !reasons.contains(&reason) {
                    reasons.push(reason);
                }
            }
            Ok(None) => {}
            Err(err) => match on_failure {
                DetectorFailurePolicy::Propagate => {
                    warn!(path = %input.canonical_path, error = %err, "Duplicate detection failed");
                    return Err(GuardrailError::DuplicateDetection {
                        canonical_path: input.canonical_path.clone(),
                        source: err,
                    });
                }
                DetectorFailurePolicy::FailOpen => {
                    warn!(
                        path = %input.canonical_path,
                        error = %err,
                        "Duplicate detection failed, treating content as unique"
                    );
                }
            },
        }
    }

    let indexable = reasons.is_empty() && input.requested_indexable;
    Ok(GuardrailResult {
        indexable,
        canonical_path,
        reasons,
    })
}

/// Guardrail evaluator bound to a detector and a failure policy.
#[derive(Clone, Default)]
pub struct GuardrailEngine {
    detector: Option<Arc<dyn DuplicateDetector>>,
    on_failure: DetectorFailurePolicy,
}

impl GuardrailEngine {
    /// Engine with no duplicate detection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detector(mut self, detector: Arc<dyn DuplicateDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn with_failure_policy(mut self, on_failure: DetectorFailurePolicy) -> Self {
        self.on_failure = on_failure;
        self
    }

    pub fn failure_policy(&self) -> DetectorFailurePolicy {
        self.on_failure
    }

    pub async fn evaluate(&self, input: &GuardrailInput) -> Result<GuardrailResult, GuardrailError> {
        evaluate_with_policy(input, self.detector.as_deref(), self.on_failure).await
    }
}
