// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for limiter and guardrail tests.

#![allow(dead_code)]

use openclaw_guardrails::paths::{can_path, compare_path, guide_path};
use openclaw_guardrails::seo::SeoContent;
use std::net::{IpAddr, Ipv4Addr};

pub const FORKS: &[&str] = &["openclaw", "openclaw-lite", "clawbot"];

pub const DEVICES: &[&str] = &[
    "raspberry-pi-5",
    "raspberry-pi-4",
    "jetson-orin-nano",
    "beelink-ser5",
    "intel-nuc-13",
];

/// Generate a pool of client IP addresses in the 10.x.x.x range.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Generate `"{action}:{ip}"` limiter keys, one per IP.
pub fn generate_keys(action: &str, count: usize) -> Vec<String> {
    generate_ips(count)
        .into_iter()
        .map(|ip| format!("{action}:{ip}"))
        .collect()
}

/// Every fork x device `/can/...` path.
pub fn generate_can_paths() -> Vec<String> {
    FORKS
        .iter()
        .flat_map(|fork| DEVICES.iter().map(move |device| can_path(fork, device)))
        .collect()
}

/// Every fork x device `/guides/...` path.
pub fn generate_guide_paths() -> Vec<String> {
    FORKS
        .iter()
        .flat_map(|fork| DEVICES.iter().map(move |device| guide_path(fork, device)))
        .collect()
}

/// Every ordered pair of distinct devices as a `/compare/...` path.
pub fn generate_compare_paths() -> Vec<String> {
    DEVICES
        .iter()
        .flat_map(|a| {
            DEVICES
                .iter()
                .filter(move |b| *b != a)
                .map(move |b| compare_path(a, b))
        })
        .collect()
}

/// A substantive verdict page for `fork` on `device`.
pub fn verdict_content(fork: &str, device: &str) -> SeoContent {
    SeoContent::new(
        format!("Can {fork} run on {device}?"),
        format!(
            "Community verdict for running {fork} on the {device}, based on submitted \
             benchmarks covering memory use, token throughput and sustained thermals"
        ),
    )
    .with_h1(format!("{fork} on {device}"))
    .with_headings(["Verdict", "Benchmarks", "Setup notes"])
    .with_body(format!(
        "Owners of the {device} report that {fork} starts cleanly and keeps up with \
         interactive agent workloads when swap is disabled and the model is quantized"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_keys_unique() {
        let keys = generate_keys("rate", 300);
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), 300);
        assert_eq!(keys[1], "rate:10.0.0.1");
    }

    #[test]
    fn test_generate_paths() {
        assert_eq!(generate_can_paths().len(), FORKS.len() * DEVICES.len());
        assert_eq!(generate_compare_paths().len(), DEVICES.len() * (DEVICES.len() - 1));
    }
}
