// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Named mutual-exclusion locks with bounded-wait acquisition.
//!
//! Locks are keyed by arbitrary strings and never outlive the process.
//! Every entry carries an expiry so an abandoned holder (a task that
//! crashed without dropping its guard) cannot wedge a key forever, and a
//! fencing token so a release can only remove the entry it acquired.
//!
//! Acquisition returns a [`LockGuard`] that releases on drop, which makes
//! it impossible for a code path to return while still holding the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Poll interval while waiting for a contended key.
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

struct LockEntry {
    token: Uuid,
    expires_at: Instant,
}

/// Process-wide named lock service.
pub struct LockService {
    entries: Mutex<HashMap<String, LockEntry>>,
    ttl: Duration,
}

impl LockService {
    /// Create a lock service whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Acquire `key`, waiting up to `wait` for a contended entry.
    ///
    /// Returns `None` when the key stays held past the deadline. Expired
    /// entries are stolen: many independent keys never interfere with one
    /// another, and a dead holder only delays the next acquirer by the TTL.
    pub async fn acquire(self: &Arc<Self>, key: &str, wait: Duration) -> Option<LockGuard> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(token) = self.try_acquire(key) {
                return Some(LockGuard {
                    service: Arc::clone(self),
                    key: key.to_string(),
                    token,
                });
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
        }
    }

    fn try_acquire(&self, key: &str) -> Option<Uuid> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => None,
            _ => {
                let token = Uuid::new_v4();
                entries.insert(
                    key.to_string(),
                    LockEntry {
                        token,
                        expires_at: now + self.ttl,
                    },
                );
                Some(token)
            }
        }
    }

    fn release(&self, key: &str, token: Uuid) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        // Only the acquiring guard may remove the entry; a guard whose
        // entry expired and was stolen must not release the new holder.
        if entries.get(key).is_some_and(|entry| entry.token == token) {
            entries.remove(key);
        }
    }
}

/// Held lock. Releases its key when dropped.
pub struct LockGuard {
    service: Arc<LockService>,
    key: String,
    token: Uuid,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.service.release(&self.key, self.token);
    }
}
