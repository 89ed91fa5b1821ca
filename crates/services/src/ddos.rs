//! Weighted per-address throttle.
//!
//! Each address accumulates request weight inside a fixed window of
//! `period`. Reaching `limit` blocks the address for `ban_period`. The
//! window map is reset every `period` and the blocked map every
//! `clear_period`; the four structures are locked independently.

use configs::DdosSettings;
use dashmap::DashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DdosConfig {
    pub limit: f64,
    pub period: Duration,
    pub ban_period: Duration,
    pub clear_period: Duration,
    pub read_weight: f64,
    pub post_weight: f64,
    pub thread_weight: f64,
    pub upload_weight_per_mib: f64,
}

impl Default for DdosConfig {
    fn default() -> Self {
        Self::from(&DdosSettings::default())
    }
}

impl From<&DdosSettings> for DdosConfig {
    fn from(s: &DdosSettings) -> Self {
        Self {
            limit: s.limit,
            period: Duration::from_secs(s.period_secs),
            ban_period: Duration::from_secs(s.ban_period_secs),
            clear_period: Duration::from_secs(s.clear_period_secs),
            read_weight: s.read_weight,
            post_weight: s.post_weight,
            thread_weight: s.thread_weight,
            upload_weight_per_mib: s.upload_weight_per_mib,
        }
    }
}

/// What a request costs is decided by what it does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Read,
    Post,
    Thread,
}

pub struct DdosGuard {
    config: DdosConfig,
    window: DashMap<String, f64>,
    window_reset: Mutex<Instant>,
    blocked: DashMap<String, Instant>,
    blocked_reset: Mutex<Instant>,
}

fn lock(m: &Mutex<Instant>) -> MutexGuard<'_, Instant> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DdosGuard {
    pub fn new(config: DdosConfig) -> Self {
        let now = Instant::now();
        Self {
            config,
            window: DashMap::new(),
            window_reset: Mutex::new(now),
            blocked: DashMap::new(),
            blocked_reset: Mutex::new(now),
        }
    }

    pub fn config(&self) -> &DdosConfig {
        &self.config
    }

    pub fn weight_for(&self, kind: RequestKind, upload_bytes: u64) -> f64 {
        let base = match kind {
            RequestKind::Read => self.config.read_weight,
            RequestKind::Post => self.config.post_weight,
            RequestKind::Thread => self.config.thread_weight,
        };
        base + self.config.upload_weight_per_mib * (upload_bytes as f64 / MIB)
    }

    /// Charges `weight - previous_weight` to `ip` and reports whether the
    /// request may proceed. `previous_weight` lets a caller upgrade a charge
    /// it already made for the same request.
    pub fn test(&self, ip: &str, weight: f64, previous_weight: f64) -> bool {
        if weight <= 0.0 || ip.is_empty() {
            return true;
        }
        let now = Instant::now();
        self.maybe_reset(now);

        if self.is_blocked_at(ip, now) {
            return false;
        }
        self.lift_expired_block(ip, now);

        let total = {
            let mut acc = self.window.entry(ip.to_string()).or_insert(0.0);
            *acc += weight - previous_weight;
            *acc
        };

        if total >= self.config.limit {
            self.blocked.insert(ip.to_string(), now);
            tracing::warn!(ip, weight = total, limit = self.config.limit, "address throttled");
            return false;
        }
        true
    }

    pub fn is_blocked(&self, ip: &str) -> bool {
        self.is_blocked_at(ip, Instant::now())
    }

    fn is_blocked_at(&self, ip: &str, now: Instant) -> bool {
        self.blocked
            .get(ip)
            .is_some_and(|since| now.duration_since(*since) < self.config.ban_period)
    }

    /// Drops the block only if it is still the expired one; a block placed
    /// by a concurrent caller in the meantime is kept.
    fn lift_expired_block(&self, ip: &str, now: Instant) {
        let ban_period = self.config.ban_period;
        self.blocked
            .remove_if(ip, |_, since| now.saturating_duration_since(*since) >= ban_period);
    }

    /// Accumulated weight in the current window.
    pub fn weight_of(&self, ip: &str) -> f64 {
        self.window.get(ip).map_or(0.0, |w| *w)
    }

    fn maybe_reset(&self, now: Instant) {
        {
            let mut last = lock(&self.window_reset);
            if now.duration_since(*last) >= self.config.period {
                self.window.clear();
                *last = now;
            }
        }
        let mut last = lock(&self.blocked_reset);
        if now.duration_since(*last) >= self.config.clear_period {
            self.blocked.clear();
            *last = now;
        }
    }
}

impl Default for DdosGuard {
    fn default() -> Self {
        Self::new(DdosConfig::default())
    }
}
