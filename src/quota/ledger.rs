//! In-memory daily usage ledger.
//!
//! Every key maps to the timestamps of its answered requests plus a count of
//! admissions that are still waiting on the completion provider. In-flight
//! admissions count against the limit, so concurrent requests for one key
//! cannot overshoot it, while usage is only written once a request actually
//! succeeds.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::ClientKey;

/// Maximum answered requests per client key per UTC day.
pub const DAILY_LIMIT: u32 = 10;

#[derive(Debug, Default)]
struct KeyUsage {
    /// Chronological; only ever holds entries from one UTC date after pruning.
    timestamps: Vec<DateTime<Utc>>,
    in_flight: u32,
}

impl KeyUsage {
    fn prune(&mut self, today: NaiveDate) {
        self.timestamps.retain(|ts| ts.date_naive() == today);
    }

    fn recorded(&self) -> u32 {
        u32::try_from(self.timestamps.len()).unwrap_or(u32::MAX)
    }

    fn occupied(&self) -> u32 {
        self.recorded().saturating_add(self.in_flight)
    }
}

/// Thread-safe per-key daily quota ledger.
///
/// Share it behind an `Arc`. No lock is ever held across an `.await`.
#[derive(Debug)]
pub struct QuotaLedger {
    limit: u32,
    state: Mutex<HashMap<ClientKey, KeyUsage>>,
}

impl Default for QuotaLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaLedger {
    /// Ledger enforcing [`DAILY_LIMIT`].
    pub fn new() -> Self {
        Self::with_limit(DAILY_LIMIT)
    }

    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, KeyUsage>> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock is still safe to use.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop every timestamp for `key` that is not on `now`'s UTC date.
    pub fn prune(&self, key: &ClientKey, now: DateTime<Utc>) {
        if let Some(usage) = self.lock().get_mut(key) {
            usage.prune(now.date_naive());
        }
    }

    /// Whether a new request for `key` may proceed at `now`.
    ///
    /// Prunes first. Does not reserve anything; see [`QuotaLedger::try_admit`]
    /// for the check the request path uses.
    pub fn is_admitted(&self, key: &ClientKey, now: DateTime<Utc>) -> bool {
        let mut guard = self.lock();
        match guard.get_mut(key) {
            Some(usage) => {
                usage.prune(now.date_naive());
                usage.occupied() < self.limit
            }
            None => self.limit > 0,
        }
    }

    /// Append `now` to the usage of `key`, pruning stale days first.
    pub fn record(&self, key: &ClientKey, now: DateTime<Utc>) {
        let mut guard = self.lock();
        let usage = guard.entry(key.clone()).or_default();
        usage.prune(now.date_naive());
        usage.timestamps.push(now);
    }

    /// `limit - count(key, now)`.
    pub fn remaining(&self, key: &ClientKey, now: DateTime<Utc>) -> u32 {
        self.limit.saturating_sub(self.count(key, now))
    }

    /// Number of requests recorded for `key` on `now`'s UTC date.
    ///
    /// Prunes stale days first; never creates a key.
    pub fn count(&self, key: &ClientKey, now: DateTime<Utc>) -> u32 {
        let mut guard = self.lock();
        match guard.get_mut(key) {
            Some(usage) => {
                usage.prune(now.date_naive());
                usage.recorded()
            }
            None => 0,
        }
    }

    /// Number of keys the ledger is tracking.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    /// Prune, check and reserve a slot for `key` in one critical section.
    ///
    /// Returns `None` when the day's quota is already used up (counting
    /// requests that are still in flight). The returned [`Admission`] must be
    /// committed once the request succeeds; dropping it releases the slot
    /// without recording anything.
    pub fn try_admit(&self, key: &ClientKey, now: DateTime<Utc>) -> Option<Admission<'_>> {
        let mut guard = self.lock();
        let usage = guard.entry(key.clone()).or_default();
        usage.prune(now.date_naive());
        if usage.occupied() >= self.limit {
            return None;
        }
        usage.in_flight += 1;
        Some(Admission {
            ledger: self,
            key: key.clone(),
            settled: false,
        })
    }

    /// Release one in-flight slot of `key`; when `record_at` is set also
    /// record the request. Returns the remaining quota afterwards.
    fn settle(&self, key: &ClientKey, record_at: Option<DateTime<Utc>>) -> u32 {
        let mut guard = self.lock();
        let usage = guard.entry(key.clone()).or_default();
        usage.in_flight = usage.in_flight.saturating_sub(1);
        if let Some(now) = record_at {
            usage.prune(now.date_naive());
            usage.timestamps.push(now);
        }
        self.limit.saturating_sub(usage.recorded())
    }

    /// Forget keys with no usage left on `now`'s date and nothing in flight.
    ///
    /// Returns how many keys were removed.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let today = now.date_naive();
        let mut guard = self.lock();
        let before = guard.len();
        guard.retain(|_, usage| {
            usage.prune(today);
            !usage.timestamps.is_empty() || usage.in_flight > 0
        });
        let evicted = before - guard.len();
        if evicted > 0 {
            debug!(evicted, remaining_keys = guard.len(), "evicted idle quota keys");
        }
        evicted
    }

    /// Copy of every key's timestamps on `now`'s UTC date, pruning as it goes.
    pub fn snapshot(&self, now: DateTime<Utc>) -> HashMap<ClientKey, Vec<DateTime<Utc>>> {
        let today = now.date_naive();
        self.lock()
            .iter_mut()
            .map(|(key, usage)| {
                usage.prune(today);
                (key.clone(), usage.timestamps.clone())
            })
            .collect()
    }
}

/// A reserved quota slot for one request.
#[must_use = "dropping an Admission releases its slot without recording usage"]
#[derive(Debug)]
pub struct Admission<'a> {
    ledger: &'a QuotaLedger,
    key: ClientKey,
    settled: bool,
}

impl Admission<'_> {
    /// Record the request as answered at `now` and return the remaining quota.
    pub fn commit(mut self, now: DateTime<Utc>) -> u32 {
        self.settled = true;
        self.ledger.settle(&self.key, Some(now))
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.ledger.settle(&self.key, None);
        }
    }
}
