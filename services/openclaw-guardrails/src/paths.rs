// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Canonical paths and programmatic SEO slugs.
//!
//! These strings are compared verbatim when deciding canonical equality, so
//! every builder emits lowercase, hyphen-joined segments.

use tracing::debug;

/// Canonical form of `path`: absolute, with the query string and fragment
/// dropped. `query_params` are the request's parsed query parameters; they
/// never contribute to the canonical path.
///
/// Dot segments are resolved and repeated leading slashes collapsed. A
/// trailing slash is kept as given, and a trailing dot segment leaves one
/// (`/a/b/..` is `/a/`). Every other byte is kept as given:
/// nothing is percent-encoded or decoded and backslashes stay backslashes.
pub fn build_canonical_path(path: &str, query_params: &[(&str, &str)]) -> String {
    if !query_params.is_empty() {
        debug!(path, dropped = query_params.len(), "Dropping query parameters from canonical path");
    }

    let bare = path.trim().split(['?', '#']).next().unwrap_or_default();
    let relative = bare.trim_start_matches('/');

    let mut segments: Vec<&str> = Vec::new();
    let mut ends_in_dot_segment = false;
    for segment in relative.split('/') {
        ends_in_dot_segment = matches!(segment, "." | "..");
        match segment {
            "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    // "/a/b/.." resolves to "/a/".
    if ends_in_dot_segment {
        segments.push("");
    }

    format!("/{}", segments.join("/"))
}

/// Lowercase, trim, and join whitespace-separated words with single hyphens.
pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// `/can/{fork}/run-on/{device}`
pub fn can_path(fork: &str, device: &str) -> String {
    format!("/can/{fork}/run-on/{device}")
}

/// `/guides/{fork}-on-{device}`
pub fn guide_path(fork: &str, device: &str) -> String {
    format!("/guides/{fork}-on-{device}")
}

/// `/best/{category}-for-{fork}` with the category slugified.
pub fn best_path(category: &str, fork: &str) -> String {
    format!("/best/{}-for-{fork}", slugify(category))
}

/// `/compare/{device1}-vs-{device2}`
pub fn compare_path(device1: &str, device2: &str) -> String {
    format!("/compare/{device1}-vs-{device2}")
}
