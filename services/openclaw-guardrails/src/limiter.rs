// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter keyed by arbitrary strings.
//!
//! Callers pick the key scheme (`"{action}:{ip}"`, `"{action}:{user_id}"`)
//! and pass the limit and window on every check, so one limiter instance
//! serves every route and server action in the process.
//!
//! State lives in memory only. It does not survive a restart and is not
//! shared between processes, so a horizontally scaled deployment enforces
//! each limit per instance.
//!
//! Each key remembers the longest window it has been checked with. The idle
//! sweep only drops a key once its newest request is older than both the
//! sweep's max age and that window, so sweeping never hands out a fresh
//! quota while earlier requests still count.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock backed by `chrono::Utc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(duration_ms(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    /// Whether the request was admitted (and a slot consumed)
    pub success: bool,
    /// Slots left in the current window
    pub remaining: u32,
    /// Milliseconds until the oldest counted request leaves the window (0 when admitted)
    pub retry_after_ms: u64,
}

/// Per-key limiter state.
#[derive(Debug, Default)]
struct KeyWindow {
    /// Accepted request timestamps, oldest first
    timestamps: VecDeque<i64>,
    /// Longest window this key has been checked with
    longest_window_ms: i64,
}

/// Thread-safe sliding-window rate limiter.
pub struct RateLimiter {
    clock: Arc<dyn Clock>,
    windows: DashMap<String, KeyWindow>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Create a limiter reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: DashMap::new(),
        }
    }

    /// Check `key` against `limit` requests per `window_ms` and consume a slot
    /// if one is free.
    ///
    /// A timestamp exactly `window_ms` old has already left the window. A
    /// denied call prunes expired entries but does not count itself. A
    /// `limit` or `window_ms` of zero is clamped to 1.
    pub fn check_and_consume(&self, key: &str, limit: u32, window_ms: u64) -> RateLimitOutcome {
        if limit == 0 || window_ms == 0 {
            debug!(key, limit, window_ms, "Clamping non-positive rate limit parameters");
        }
        let limit = limit.max(1);
        let window = i64::try_from(window_ms.max(1)).unwrap_or(i64::MAX);

        let now = self.clock.now_ms();
        let cutoff = now.saturating_sub(window);

        // The entry guard holds the shard lock for the whole prune/check/append.
        let mut entry = self.windows.entry(key.to_string()).or_default();
        let state = entry.value_mut();
        state.longest_window_ms = state.longest_window_ms.max(window);
        let timestamps = &mut state.timestamps;
        timestamps.retain(|&t| t > cutoff);

        if timestamps.len() >= limit as usize {
            let retry_after_ms = timestamps
                .front()
                .map(|&oldest| oldest.saturating_add(window).saturating_sub(now).max(0) as u64)
                .unwrap_or(0);
            debug!(key, limit, window_ms, retry_after_ms, "Rate limit exceeded");
            return RateLimitOutcome {
                success: false,
                remaining: 0,
                retry_after_ms,
            };
        }

        // Keep the sequence non-decreasing even if the wall clock steps back.
        let stamp = timestamps.back().map_or(now, |&last| last.max(now));
        timestamps.push_back(stamp);

        RateLimitOutcome {
            success: true,
            remaining: limit - timestamps.len() as u32,
            retry_after_ms: 0,
        }
    }

    /// Drop every key whose newest request is older than `max_age` and
    /// outside the longest window the key was checked with.
    ///
    /// Keys are removed one at a time so in-flight checks on other keys are
    /// never blocked for longer than a single removal. Returns the number of
    /// keys removed.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let now = self.clock.now_ms();
        let max_age = duration_ms(max_age);

        let keys: Vec<String> = self.windows.iter().map(|e| e.key().clone()).collect();
        let removed = keys
            .iter()
            .filter(|key| {
                self.windows
                    .remove_if(key.as_str(), |_, state| {
                        let cutoff = now.saturating_sub(max_age.max(state.longest_window_ms));
                        state.timestamps.back().map_or(true, |&newest| newest < cutoff)
                    })
                    .is_some()
            })
            .count();

        debug!(removed, remaining = self.windows.len(), "Swept idle rate limit keys");
        removed
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Handle to a running sweeper task.
pub struct SweepHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweeper and wait for the task to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
    }
}

/// Spawn a task that sweeps `limiter` every `interval`, dropping keys idle
/// for longer than `max_age`. `on_sweep` receives each pass's removed count.
pub fn spawn_sweeper<F>(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    max_age: Duration,
    on_sweep: F,
) -> SweepHandle
where
    F: Fn(usize) + Send + 'static,
{
    let (tx, mut rx) = oneshot::channel();
    let period = interval.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = &mut rx => break,
                _ = ticker.tick() => on_sweep(limiter.sweep(max_age)),
            }
        }
        info!("Rate limit sweeper stopped");
    });

    SweepHandle {
        shutdown: Some(tx),
        task,
    }
}

fn duration_ms(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
