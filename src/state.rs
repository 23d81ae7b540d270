// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{PermRegistry, SessionStore};
use crate::perms::PermissionService;
use crate::review::ReviewService;
use crate::storage::AdminDatabase;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<AdminDatabase>,
    pub registry: Arc<PermRegistry>,
    pub sessions: Arc<SessionStore>,
    pub perms: Arc<PermissionService>,
    pub reviews: Arc<ReviewService>,
}

impl AppState {
    pub fn new(
        db: Arc<AdminDatabase>,
        registry: Arc<PermRegistry>,
        sessions: Arc<SessionStore>,
        perms: Arc<PermissionService>,
        reviews: Arc<ReviewService>,
    ) -> Self {
        Self {
            db,
            registry,
            sessions,
            perms,
            reviews,
        }
    }
}
