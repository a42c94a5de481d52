// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Duplicate content detection.
//!
//! A detector maps content to the path it was first seen at. Exact matches
//! are keyed by a BLAKE3 hash of the normalized content; near matches
//! compare 64-bit SimHash signatures by Hamming distance.

use crate::error::DetectorError;
use crate::seo::{ContentFingerprint, DuplicateKind, DuplicateMatch, SeoContent};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Content index capability used by the SEO guardrails.
///
/// `find_duplicate` must treat at most one of several concurrent callers
/// with identical unseen content as the first sighting.
#[async_trait]
pub trait DuplicateDetector: Send + Sync {
    /// Look up content seen at another path, recording it as first seen at
    /// `fingerprint.canonical_path` when there is no match.
    async fn find_duplicate(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<DuplicateMatch>, DetectorError>;

    /// Record `canonical_path` as the home of this content. The first
    /// registration for a given content wins.
    async fn register(
        &self,
        fingerprint: &ContentFingerprint,
        canonical_path: &str,
    ) -> Result<(), DetectorError>;
}

#[derive(Debug)]
struct IndexedContent {
    simhash: u64,
    canonical_path: String,
}

#[derive(Debug, Default)]
struct ContentIndex {
    /// Content hash -> position in `entries`
    by_hash: HashMap<String, usize>,
    entries: Vec<IndexedContent>,
}

impl ContentIndex {
    /// Insert unless the hash is already present; returns whether it was new.
    fn insert(&mut self, hash: String, simhash: u64, canonical_path: &str) -> bool {
        if self.by_hash.contains_key(&hash) {
            return false;
        }
        self.by_hash.insert(hash, self.entries.len());
        self.entries.push(IndexedContent {
            simhash,
            canonical_path: canonical_path.to_string(),
        });
        true
    }

    /// Closest entry at another path within `max_distance`; the earliest
    /// registered entry wins a tie.
    fn nearest(
        &self,
        signature: u64,
        path: &str,
        max_distance: u32,
    ) -> Option<(u32, &IndexedContent)> {
        self.entries
            .iter()
            .filter(|entry| entry.canonical_path != path)
            .map(|entry| ((entry.simhash ^ signature).count_ones(), entry))
            .filter(|(distance, _)| *distance <= max_distance)
            .min_by_key(|(distance, _)| *distance)
    }
}

/// Process-local detector, used in tests and single-instance deployments.
#[derive(Debug, Default)]
pub struct InMemoryDuplicateDetector {
    /// Maximum SimHash distance for a near match; 0 disables near matching
    near_distance: u32,
    index: Mutex<ContentIndex>,
}

impl InMemoryDuplicateDetector {
    pub fn new(near_distance: u32) -> Self {
        Self {
            near_distance,
            index: Mutex::new(ContentIndex::default()),
        }
    }

    /// Number of distinct contents recorded.
    pub async fn len(&self) -> usize {
        self.index.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DuplicateDetector for InMemoryDuplicateDetector {
    async fn find_duplicate(
        &self,
        fingerprint: &ContentFingerprint,
    ) -> Result<Option<DuplicateMatch>, DetectorError> {
        let hash = content_hash(&fingerprint.content);
        let signature = simhash(&fingerprint.content);
        let path = fingerprint.canonical_path.as_str();

        // Lookup and first-seen registration happen under one lock.
        let mut index = self.index.lock().await;

        if let Some(&pos) = index.by_hash.get(&hash) {
            let first_seen = &index.entries[pos].canonical_path;
            if first_seen == path {
                return Ok(None);
            }
            debug!(path, first_seen = %first_seen, "Exact duplicate");
            return Ok(Some(DuplicateMatch {
                canonical_path: first_seen.clone(),
                kind: DuplicateKind::Exact,
            }));
        }

        if self.near_distance > 0 {
            if let Some((distance, entry)) = index.nearest(signature, path, self.near_distance) {
                debug!(path, first_seen = %entry.canonical_path, distance, "Near duplicate");
                return Ok(Some(DuplicateMatch {
                    canonical_path: entry.canonical_path.clone(),
                    kind: DuplicateKind::Near,
                }));
            }
        }

        index.insert(hash, signature, path);
        Ok(None)
    }

    async fn register(
        &self,
        fingerprint: &ContentFingerprint,
        canonical_path: &str,
    ) -> Result<(), DetectorError> {
        let hash = content_hash(&fingerprint.content);
        let signature = simhash(&fingerprint.content);
        let mut index = self.index.lock().await;
        if !index.insert(hash, signature, canonical_path) {
            debug!(canonical_path, "Content already registered");
        }
        Ok(())
    }
}

/// Lowercase and collapse whitespace.
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalized_fields(content: &SeoContent) -> [String; 5] {
    [
        normalize_text(&content.title),
        normalize_text(&content.description),
        normalize_text(content.h1.as_deref().unwrap_or("")),
        normalize_text(&content.headings.join("\n")),
        normalize_text(content.body.as_deref().unwrap_or("")),
    ]
}

/// Stable hex BLAKE3 hash of normalized content.
///
/// Case and whitespace differences hash identically; moving text between
/// fields does not.
pub fn content_hash(content: &SeoContent) -> String {
    let mut hasher = blake3::Hasher::new();
    for field in normalized_fields(content) {
        hasher.update(field.as_bytes());
        hasher.update(&[0x1f]);
    }
    hex::encode(hasher.finalize().as_bytes())
}

/// 64-bit SimHash over the words of all content fields.
pub fn simhash(content: &SeoContent) -> u64 {
    let mut weights = [0i32; 64];
    let fields = normalized_fields(content);

    for token in fields.iter().flat_map(|f| f.split(' ')).filter(|t| !t.is_empty()) {
        let digest = blake3::hash(token.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        let bits = u64::from_le_bytes(bytes);
        for (i, weight) in weights.iter_mut().enumerate() {
            if bits & (1 << i) != 0 {
                *weight += 1;
            } else {
                *weight -= 1;
            }
        }
    }

    weights
        .iter()
        .enumerate()
        .filter(|(_, w)| **w > 0)
        .fold(0u64, |acc, (i, _)| acc | (1 << i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fingerprint(path: &str, content: SeoContent) -> ContentFingerprint {
        ContentFingerprint {
            canonical_path: path.to_string(),
            content,
        }
    }

    fn long_page() -> SeoContent {
        SeoContent::new(
            "Best mini PC for OpenClaw",
            "We benchmarked twelve mini PCs running OpenClaw agents for a week",
        )
        .with_body(
            "The Beelink SER5 handled local inference with the smallest fork while \
             staying under forty watts and the Intel NUC 13 was close behind with \
             better thermals but a higher price for the same memory configuration",
        )
    }

    #[test]
    fn test_hash_ignores_case_and_whitespace() {
        let a = SeoContent::new("Raspberry Pi 5", "Runs  OpenClaw\nfine");
        let b = SeoContent::new("raspberry pi 5", "runs openclaw fine");
        assert_eq!(content_hash(&a), content_hash(&b));
        assert_eq!(content_hash(&a).len(), 64);
    }

    #[test]
    fn test_hash_distinguishes_fields() {
        let a = SeoContent::new("Raspberry Pi", "5");
        let b = SeoContent::new("Raspberry", "Pi 5");
        assert_ne!(content_hash(&a), content_hash(&b));
    }

    #[test]
    fn test_simhash_similar_content_is_close() {
        let original = long_page();
        let tweaked = long_page().with_body(
            "The Beelink SER5 handled local inference with the smallest fork while \
             staying under forty watts and the Intel NUC 13 was close behind with \
             better thermals but a higher price for the same memory setup",
        );
        let unrelated = SeoContent::new(
            "Jetson Orin Nano benchmark",
            "GPU accelerated token throughput across quantization levels",
        );

        let base = simhash(&original);
        let near = (base ^ simhash(&tweaked)).count_ones();
        let far = (base ^ simhash(&unrelated)).count_ones();
        assert!(near < far, "near={near} far={far}");
    }

    #[tokio::test]
    async fn test_first_seen_wins() {
        let detector = InMemoryDuplicateDetector::new(0);

        let first = detector.find_duplicate(&fingerprint("/a", long_page())).await.unwrap();
        assert!(first.is_none());

        let second = detector.find_duplicate(&fingerprint("/b", long_page())).await.unwrap();
        assert_eq!(
            second,
            Some(DuplicateMatch {
                canonical_path: "/a".to_string(),
                kind: DuplicateKind::Exact,
            })
        );

        // Seeing the original path again is not a duplicate of itself.
        let again = detector.find_duplicate(&fingerprint("/a", long_page())).await.unwrap();
        assert!(again.is_none());
        assert_eq!(detector.len().await, 1);
    }

    #[test]
    fn test_register_first_write_wins() {
        let detector = InMemoryDuplicateDetector::new(0);
        let fp = fingerprint("/ignored", long_page());

        tokio_test::block_on(async {
            detector.register(&fp, "/best/mini-pc-for-openclaw").await.unwrap();
            detector.register(&fp, "/other").await.unwrap();

            let found = detector.find_duplicate(&fingerprint("/c", long_page())).await.unwrap();
            assert_eq!(found.unwrap().canonical_path, "/best/mini-pc-for-openclaw");
        });
    }

    #[tokio::test]
    async fn test_near_matching_disabled_at_zero() {
        let detector = InMemoryDuplicateDetector::new(0);
        detector.find_duplicate(&fingerprint("/a", long_page())).await.unwrap();

        let edited = long_page().with_h1("Best mini PC for OpenClaw");
        let found = detector.find_duplicate(&fingerprint("/b", edited)).await.unwrap();
        assert!(found.is_none());
        assert_eq!(detector.len().await, 2);
    }

    #[tokio::test]
    async fn test_near_match_within_distance() {
        let detector = InMemoryDuplicateDetector::new(8);
        detector.find_duplicate(&fingerprint("/a", long_page())).await.unwrap();

        let edited = long_page().with_h1("Best mini PC for OpenClaw");
        let found = detector.find_duplicate(&fingerprint("/b", edited)).await.unwrap();
        assert_eq!(
            found,
            Some(DuplicateMatch {
                canonical_path: "/a".to_string(),
                kind: DuplicateKind::Near,
            })
        );

        let unrelated = SeoContent::new(
            "Jetson Orin Nano benchmark",
            "GPU accelerated token throughput across quantization levels",
        );
        let found = detector.find_duplicate(&fingerprint("/c", unrelated)).await.unwrap();
        assert!(found.is_none());
        assert_eq!(detector.len().await, 2);
    }

    #[test]
    fn test_nearest_prefers_closest_then_earliest() {
        let mut index = ContentIndex::default();
        index.insert("h1".into(), 0b1111, "/four-off");
        index.insert("h2".into(), 0b0011, "/two-off-first");
        index.insert("h3".into(), 0b1100, "/two-off-second");
        index.insert("h4".into(), 0b0000, "/self");

        let (distance, entry) = index.nearest(0, "/self", 8).unwrap();
        assert_eq!(distance, 2);
        assert_eq!(entry.canonical_path, "/two-off-first");

        assert!(index.nearest(0, "/self", 1).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_first_sighting_has_one_winner() {
        let detector = Arc::new(InMemoryDuplicateDetector::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let detector = detector.clone();
                tokio::spawn(async move {
                    detector
                        .find_duplicate(&fingerprint(&format!("/page-{i}"), long_page()))
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut unique = 0;
        for task in tasks {
            if task.await.unwrap().is_none() {
                unique += 1;
            }
        }
        assert_eq!(unique, 1);
        assert_eq!(detector.len().await, 1);
    }
}
