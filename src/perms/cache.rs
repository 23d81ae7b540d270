// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! TTL'd LRU cache for admin permission sets.
//!
//! Entries are keyed `admin.perms:<uid>` and hold the full permission list
//! for one admin. The durable `admin_perms` table stays authoritative; a
//! miss here always falls back to it.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// Cached entry: permission list + insertion timestamp.
struct CacheEntry {
    perms: Vec<String>,
    inserted_at: Instant,
}

/// In-process LRU cache for permission lookups.
pub struct PermCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

fn cache_key(uid: i64) -> String {
    format!("admin.perms:{uid}")
}

impl PermCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of admin uids to cache.
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Get the cached permission set for an admin.
    ///
    /// Returns `None` if absent, empty, or expired; an empty cached set is
    /// never served so a miss always repopulates from the durable store.
    pub fn get(&self, uid: i64) -> Option<Vec<String>> {
        let key = cache_key(uid);
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl && !entry.perms.is_empty() {
                return Some(entry.perms.clone());
            }
            // Expired — remove it
            cache.pop(&key);
        }
        None
    }

    /// Store the full permission set for an admin, resetting its TTL.
    pub fn put(&self, uid: i64, perms: Vec<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                cache_key(uid),
                CacheEntry {
                    perms,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Invalidate the cache for a specific admin.
    pub fn invalidate(&self, uid: i64) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&cache_key(uid));
        }
    }
}
