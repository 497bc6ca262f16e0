//! A sorted set with numeric scores: the building block for the FIFO
//! `queue` and the per-skill `avail:{s}` availability indexes
//! (`spec.md` §3, §4.1).
//!
//! Mirrors what a Redis sorted set gives the Python original
//! (`ZADD`/`ZREM`/`BZPOPMIN`/`ZINTER`), realized in-process with a
//! score-ordered `BTreeSet` kept in sync with a member->score map so
//! `zrem` by member stays O(log n) without a linear scan.

use std::collections::BTreeSet;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::timeout;

/// One (score, member) entry. Ordered first by score (ascending — smallest
/// score is the head, i.e. longest-waiting / longest-idle), then by member
/// name to break ties deterministically.
type Entry = (i64, String);

#[derive(Default)]
struct Inner {
    scores: std::collections::HashMap<String, i64>,
    by_score: BTreeSet<Entry>,
}

/// A single named ordered set (one instance backs `queue`; one instance
/// backs each `avail:{s}` index).
pub struct OrderedSet {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl OrderedSet {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            notify: Notify::new(),
        }
    }

    /// `ZADD`: insert or reposition `member` at `score`. Repositioning
    /// (the member already present) removes the old entry first so the
    /// `BTreeSet` never carries a stale tuple.
    pub fn zadd(&self, member: &str, score: i64) {
        {
            let mut inner = self.inner.lock();
            if let Some(&old) = inner.scores.get(member) {
                inner.by_score.remove(&(old, member.to_string()));
            }
            inner.scores.insert(member.to_string(), score);
            inner.by_score.insert((score, member.to_string()));
        }
        self.notify.notify_waiters();
    }

    /// `ZREM`: remove `member` if present. Returns whether it was removed.
    pub fn zrem(&self, member: &str) -> bool {
        let mut inner = self.inner.lock();
        if let Some(score) = inner.scores.remove(member) {
            inner.by_score.remove(&(score, member.to_string()));
            true
        } else {
            false
        }
    }

    pub fn contains(&self, member: &str) -> bool {
        self.inner.lock().scores.contains_key(member)
    }

    pub fn score(&self, member: &str) -> Option<i64> {
        self.inner.lock().scores.get(member).copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every member, as if the set were deleted and immediately
    /// recreated empty (`spec.md`'s `delete_skill` cascades a `DEL` onto
    /// the skill's `avail:{s}` index).
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.scores.clear();
        inner.by_score.clear();
    }

    /// Non-blocking pop of the minimum-score member, if any.
    pub fn zpop_min(&self) -> Option<(String, i64)> {
        let mut inner = self.inner.lock();
        let entry = inner.by_score.iter().next().cloned()?;
        inner.by_score.remove(&entry);
        inner.scores.remove(&entry.1);
        Some((entry.1, entry.0))
    }

    /// `BZPOPMIN`: pop the minimum-score member, waiting up to `timeout`
    /// (or indefinitely if `None`, the dispatcher's usage — `spec.md`
    /// §4.4 step 1) for one to appear.
    pub async fn zpop_min_blocking(&self, wait: Option<Duration>) -> Option<(String, i64)> {
        loop {
            if let Some(popped) = self.zpop_min() {
                return Some(popped);
            }
            let notified = self.notify.notified();
            match wait {
                Some(d) => {
                    if timeout(d, notified).await.is_err() {
                        return None;
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Snapshot of (member, score) pairs, for `ZINTER`.
    fn snapshot(&self) -> std::collections::HashMap<String, i64> {
        self.inner.lock().scores.clone()
    }
}

impl Default for OrderedSet {
    fn default() -> Self {
        Self::new()
    }
}

/// `ZINTER`: members present in every supplied set, ordered by the sum of
/// their scores ascending (`spec.md` §4.1) — the member that is, on
/// balance, longest-idle across all required skills comes first.
pub fn zinter(sets: &[&OrderedSet]) -> Vec<String> {
    if sets.is_empty() {
        return Vec::new();
    }
    let snapshots: Vec<_> = sets.iter().map(|s| s.snapshot()).collect();
    let (first, rest) = snapshots.split_first().expect("non-empty sets");

    let mut totals: Vec<(String, i64)> = first
        .iter()
        .filter_map(|(member, &score)| {
            let mut total = score;
            for other in rest {
                total += *other.get(member)?;
            }
            Some((member.clone(), total))
        })
        .collect();

    totals.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    totals.into_iter().map(|(member, _)| member).collect()
}
