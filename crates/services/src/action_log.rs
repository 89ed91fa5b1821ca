//! One structured event per user action: `ip`, `action`, `state`, `target`.

use crate::ip_range::IpRangeList;
use std::sync::RwLock;

pub const TARGET: &str = "board::action";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Begin,
    Success,
    Fail,
}

impl ActionState {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionState::Begin => "begin",
            ActionState::Success => "success",
            ActionState::Fail => "fail",
        }
    }
}

/// Addresses in the skip list are never logged.
#[derive(Debug, Default)]
pub struct ActionLog {
    skip: RwLock<IpRangeList>,
}

impl ActionLog {
    pub fn new(skip: IpRangeList) -> Self {
        Self { skip: RwLock::new(skip) }
    }

    pub fn from_settings<S: AsRef<str>>(skip_ips: &[S]) -> Self {
        Self::new(IpRangeList::parse(skip_ips))
    }

    /// Swaps the skip list after a settings reload.
    pub fn reset_skip_list(&self, skip: IpRangeList) {
        match self.skip.write() {
            Ok(mut guard) => *guard = skip,
            Err(poisoned) => *poisoned.into_inner() = skip,
        }
    }

    pub fn is_skipped(&self, ip: &str) -> bool {
        match self.skip.read() {
            Ok(guard) => guard.contains(ip),
            Err(poisoned) => poisoned.into_inner().contains(ip),
        }
    }

    /// Returns whether the event was emitted.
    pub fn record(&self, ip: &str, action: &str, state: ActionState, target: &str) -> bool {
        if self.is_skipped(ip) {
            return false;
        }
        if target.is_empty() {
            tracing::info!(target: TARGET, ip, action, state = state.as_str());
        } else {
            tracing::info!(target: TARGET, ip, action, state = state.as_str(), object = target);
        }
        true
    }

    pub fn failed(&self, ip: &str, action: &str, target: &str, reason: &str) -> bool {
        if self.is_skipped(ip) {
            return false;
        }
        tracing::info!(target: TARGET, ip, action, state = "fail", object = target, reason);
        true
    }
}
