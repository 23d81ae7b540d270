// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Opaque admin session tokens.
//!
//! Sessions are issued elsewhere (login/MFA is outside this service's
//! scope); here they are only a token → admin-uid lookup consulted by the
//! [`AdminSession`] extractor. Tokens expire from the store after a fixed
//! TTL.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lru::LruCache;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the opaque session token.
pub const SESSION_HEADER: &str = "x-admin-token";

const SESSION_CAPACITY: usize = 4096;
const SESSION_TTL: Duration = Duration::from_secs(12 * 3600);

struct SessionEntry {
    admin_id: i64,
    inserted_at: Instant,
}

/// Token → admin-uid store.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SessionEntry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SESSION_CAPACITY, SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap()),
            )),
            ttl,
        }
    }

    /// Issue a fresh token for an admin.
    pub fn issue(&self, admin_id: i64) -> String {
        let token = Uuid::new_v4().to_string();
        self.insert(token.clone(), admin_id);
        token
    }

    /// Register an existing token (seeding hook for deploys and tests).
    pub fn insert(&self, token: String, admin_id: i64) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.put(
                token,
                SessionEntry {
                    admin_id,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    /// Resolve a token to its admin uid, if present and unexpired.
    pub fn resolve(&self, token: &str) -> Option<i64> {
        let mut sessions = self.sessions.lock().ok()?;
        if let Some(entry) = sessions.get(token) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.admin_id);
            }
            sessions.pop(token);
        }
        None
    }
}

/// Authenticated admin identity, extracted from the session header.
#[derive(Debug, Clone, Copy)]
pub struct AdminSession {
    pub admin_id: i64,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing session token"))?;

        let admin_id = state
            .sessions
            .resolve(token)
            .ok_or_else(|| ApiError::unauthorized("invalid or expired session"))?;

        Ok(AdminSession { admin_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_resolve() {
        let store = SessionStore::default();
        let token = store.issue(42);
        assert_eq!(store.resolve(&token), Some(42));
        assert_eq!(store.resolve("unknown"), None);
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let store = SessionStore::new(10, Duration::from_millis(1));
        let token = store.issue(42);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.resolve(&token), None);
    }
}
