// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response structures for the admin REST API. All types
//! derive `Serialize`/`Deserialize` and `ToSchema` for JSON handling and
//! OpenAPI documentation.
//!
//! [`ApplicationView`] is the outward shape of an agent application: the
//! stored record minus `freeze_id`, which is a ledger-internal reference
//! and never leaves this service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::repository::applications::{ApplicationStatus, Direction, StoredApplication};

// =============================================================================
// Review
// =============================================================================

/// Agent application as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ApplicationView {
    pub id: i64,
    pub member_id: i64,
    pub direction: Direction,
    pub status: ApplicationStatus,
    pub currency: String,
    #[schema(value_type = String)]
    pub deposit: Decimal,
    pub reviewed_by: i64,
    pub reject_reason: String,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
}

impl From<StoredApplication> for ApplicationView {
    fn from(application: StoredApplication) -> Self {
        Self {
            id: application.id,
            member_id: application.member_id,
            direction: application.direction,
            status: application.status,
            currency: application.currency,
            deposit: application.deposit,
            reviewed_by: application.reviewed_by,
            reject_reason: application.reject_reason,
            applied_at: application.applied_at,
            reviewed_at: application.reviewed_at,
            released_at: application.released_at,
        }
    }
}

/// Paged review queue.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewListResponse {
    pub items: Vec<ApplicationView>,
    pub total: u64,
}

/// Pagination parameters; 1-based page.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub size: Option<usize>,
}

impl PageQuery {
    const DEFAULT_SIZE: usize = 20;
    const MAX_SIZE: usize = 200;

    /// Normalized `(page, size)` with defaults and bounds applied.
    pub fn normalize(&self) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let size = self
            .size
            .unwrap_or(Self::DEFAULT_SIZE)
            .clamp(1, Self::MAX_SIZE);
        (page, size)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ApproveRequest {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RejectRequest {
    pub id: i64,
    pub reason: String,
}

// =============================================================================
// Permissions
// =============================================================================

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<String>,
}

/// A single admin's permission set.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserPermissionsResponse {
    pub uid: i64,
    pub permissions: Vec<String>,
}

/// Every gated route with its permission code.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AllPermissionsResponse {
    pub permissions: std::collections::HashMap<String, String>,
}

// =============================================================================
// Misc
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
