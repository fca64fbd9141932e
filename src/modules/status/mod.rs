// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::utils::truncate_chars;
use crate::utc_now;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;


/// Retry delay never exceeds this many seconds (plus jitter).
const BACKOFF_CAP_SECS: i64 = 600;
/// Exponent clamp: 2^6 = 64s is the largest pure power-of-two step.
const BACKOFF_MAX_EXP: u32 = 6;
/// Stored error strings are clipped to keep status snapshots small.
const ERROR_MAX_CHARS: usize = 300;

/// Per-account runtime status, owned exclusively by the poll scheduler.
/// Readers get eventually-consistent snapshots.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AccountRuntime {
    pub connected: bool,
    pub last_success_at: Option<i64>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub next_retry_at: Option<i64>,
    /// One-shot: the stream-started notification has been emitted.
    pub(crate) start_notified: bool,
    /// One-shot: an error notification went out since the last success.
    pub(crate) error_notified: bool,
}

/// Runtime state for every (user, account) pair the engine has touched,
/// plus the one-shot first-pass suppression flags for freshly added
/// accounts. Entries are created lazily on first use.
#[derive(Debug, Default)]
pub struct StatusStore {
    accounts: DashMap<(u64, u64), AccountRuntime>,
    first_pass: DashMap<(u64, u64), ()>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful fetch. Clears failure state and re-arms the
    /// error notification. Returns true when the stream-started
    /// notification should be emitted (first success ever).
    pub fn record_success(&self, user_id: u64, account_id: u64) -> bool {
        let mut state = self.accounts.entry((user_id, account_id)).or_default();
        state.connected = true;
        state.last_success_at = Some(utc_now!());
        state.last_error = None;
        state.consecutive_failures = 0;
        state.next_retry_at = None;
        state.error_notified = false;
        let first = !state.start_notified;
        state.start_notified = true;
        first
    }

    /// Record a failed fetch and schedule the next retry with exponential
    /// backoff and a sub-second jitter. Returns true when the stream-error
    /// notification should be emitted (first failure since last success).
    pub fn record_failure(&self, user_id: u64, account_id: u64, error: &str) -> bool {
        let mut state = self.accounts.entry((user_id, account_id)).or_default();
        state.connected = false;
        state.last_error = Some(truncate_chars(error, ERROR_MAX_CHARS).to_string());
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        let exp = state.consecutive_failures.min(BACKOFF_MAX_EXP);
        let backoff_secs = BACKOFF_CAP_SECS.min(1i64 << exp);
        let jitter_ms = rand::rng().random_range(0..1000i64);
        state.next_retry_at = Some(utc_now!() + backoff_secs * 1000 + jitter_ms);

        let notify = !state.error_notified;
        state.error_notified = true;
        notify
    }

    /// Whether the account may be polled at `now_ms` (epoch millis).
    /// Accounts never seen before are eligible.
    pub fn is_eligible(&self, user_id: u64, account_id: u64, now_ms: i64) -> bool {
        match self.accounts.get(&(user_id, account_id)) {
            Some(state) => state.next_retry_at.map_or(true, |at| at <= now_ms),
            None => true,
        }
    }

    /// Flip every tracked account of this user to disconnected. Called
    /// when the user's poll loop stops.
    pub fn mark_all_disconnected(&self, user_id: u64) {
        for mut entry in self.accounts.iter_mut() {
            if entry.key().0 == user_id {
                entry.value_mut().connected = false;
            }
        }
    }

    /// Drop all runtime state for one account (disabled or deleted).
    pub fn clear(&self, user_id: u64, account_id: u64) {
        self.accounts.remove(&(user_id, account_id));
        self.first_pass.remove(&(user_id, account_id));
    }

    pub fn get(&self, user_id: u64, account_id: u64) -> Option<AccountRuntime> {
        self.accounts
            .get(&(user_id, account_id))
            .map(|s| s.clone())
    }

    pub fn snapshot(&self, user_id: u64) -> Vec<(u64, AccountRuntime)> {
        let mut entries: Vec<(u64, AccountRuntime)> = self
            .accounts
            .iter()
            .filter(|e| e.key().0 == user_id)
            .map(|e| (e.key().1, e.value().clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Flag a freshly registered account so its first poll silently
    /// swallows the pre-existing unread backlog. Idempotent.
    pub fn mark_first_pass(&self, user_id: u64, account_id: u64) {
        self.first_pass.insert((user_id, account_id), ());
    }

    /// Atomic read-and-clear of the first-pass flag. Consuming an unset
    /// flag is a no-op returning false.
    pub fn consume_first_pass(&self, user_id: u64, account_id: u64) -> bool {
        self.first_pass.remove(&(user_id, account_id)).is_some()
    }
}
