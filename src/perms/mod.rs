// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin permission service.
//!
//! Resolves "does admin U hold permission P" with a read-through TTL cache
//! over the durable `admin_perms` table, and applies permission updates
//! under the grant-hierarchy rule: an admin can never grant a permission
//! they do not themselves currently hold.

pub mod cache;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::registry::PermRegistry;
use crate::storage::database::AdminDatabase;
use crate::storage::repository::perms::PermRepository;

pub use cache::PermCache;

/// Cache TTL for permission sets (1 hour in the reference deployment).
const CACHE_TTL: Duration = Duration::from_secs(3600);
const CACHE_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum PermError {
    #[error("permissions cannot be empty")]
    EmptyPermissions,

    #[error("invalid permission: {0}")]
    Unregistered(String),

    #[error("insufficient permission to grant: {0}")]
    InsufficientGrant(String),

    #[error("permission storage error: {0}")]
    Storage(#[from] crate::storage::database::AdminDbError),
}

/// Permission resolution and administration.
pub struct PermissionService {
    db: Arc<AdminDatabase>,
    cache: PermCache,
    registry: Arc<PermRegistry>,
}

impl PermissionService {
    pub fn new(db: Arc<AdminDatabase>, registry: Arc<PermRegistry>) -> Self {
        Self {
            db,
            cache: PermCache::new(CACHE_CAPACITY, CACHE_TTL),
            registry,
        }
    }

    /// Whether `uid` holds `code`. Never fails the caller: any internal
    /// error is logged and answered with `false`.
    pub fn has_permission(&self, uid: i64, code: &str) -> bool {
        match self.user_perms(uid) {
            Ok(perms) => perms.iter().any(|p| p == code),
            Err(error) => {
                tracing::error!(uid, code, %error, "permission lookup failed, denying");
                false
            }
        }
    }

    /// The full permission set for `uid`.
    ///
    /// Serves the cached set when present and non-empty; otherwise loads
    /// the durable record, repopulates the cache (TTL reset), and returns
    /// it. A missing durable record is an empty set, not an error.
    pub fn user_perms(&self, uid: i64) -> Result<Vec<String>, PermError> {
        if let Some(cached) = self.cache.get(uid) {
            return Ok(cached);
        }

        let perms = PermRepository::new(&self.db)
            .get_by_uid(uid)?
            .unwrap_or_default();
        if !perms.is_empty() {
            self.cache.put(uid, perms.clone());
        }
        Ok(perms)
    }

    /// Drop the cached set for `uid` so the next read repopulates.
    pub fn invalidate(&self, uid: i64) {
        self.cache.invalidate(uid);
    }

    /// Replace `target_uid`'s permission set with `perms`.
    ///
    /// Rejects empty sets, codes no route declares, and any code the
    /// acting admin does not hold themselves (checked per call against the
    /// acting admin's current set, via the same read path). The durable
    /// write is the authoritative step; the subsequent invalidation only
    /// shortens the staleness window to at most the cache TTL.
    pub fn update_permissions(
        &self,
        acting_uid: i64,
        target_uid: i64,
        perms: &[String],
    ) -> Result<(), PermError> {
        if perms.is_empty() {
            return Err(PermError::EmptyPermissions);
        }

        for perm in perms {
            if !self.registry.is_registered(perm) {
                return Err(PermError::Unregistered(perm.clone()));
            }
        }

        let held: HashSet<String> = self.user_perms(acting_uid)?.into_iter().collect();
        for perm in perms {
            if !held.contains(perm) {
                return Err(PermError::InsufficientGrant(perm.clone()));
            }
        }

        PermRepository::new(&self.db).upsert(target_uid, perms)?;
        self.invalidate(target_uid);
        Ok(())
    }
}
