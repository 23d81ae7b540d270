// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Agent application repository.
//!
//! An agent application is a member's request to move between the `member`
//! and `agent` role tiers, backed by a deposit held in escrow by the ledger
//! service (referenced through `freeze_id`). Review outcome fields are only
//! ever written through the compare-and-set updates below, which keeps
//! terminal transitions and the release stamp safe under retries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{AdminDatabase, DbResult};

/// Which way the role change goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Member applying to become an agent.
    ToAgent,
    /// Agent applying to revert to a plain member.
    ToMember,
}

/// Review lifecycle of an application. Terminal once approved or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Reviewing,
    Approved,
    Rejected,
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Reviewing => write!(f, "reviewing"),
            ApplicationStatus::Approved => write!(f, "approved"),
            ApplicationStatus::Rejected => write!(f, "rejected"),
        }
    }
}

/// Agent application row as persisted in the `agent_applications` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredApplication {
    pub id: i64,
    pub member_id: i64,
    pub direction: Direction,
    pub status: ApplicationStatus,
    /// ISO currency code of the deposit.
    pub currency: String,
    /// Escrowed amount. Informational; the ledger hold is authoritative.
    pub deposit: Decimal,
    /// Reference to the escrow hold in the ledger service.
    pub freeze_id: i64,
    pub reviewed_by: i64,
    pub reject_reason: String,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Set exactly once, when the escrow release has been confirmed.
    pub released_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when an application leaves the `Reviewing` state.
#[derive(Debug, Clone)]
pub struct ReviewUpdate {
    pub id: i64,
    pub status: ApplicationStatus,
    pub reviewed_by: i64,
    pub reviewed_at: DateTime<Utc>,
    pub reject_reason: String,
}

/// Repository for agent application rows.
pub struct ApplicationRepository<'a> {
    db: &'a AdminDatabase,
}

impl<'a> ApplicationRepository<'a> {
    pub fn new(db: &'a AdminDatabase) -> Self {
        Self { db }
    }

    /// Fetch a single application. Absence is `Ok(None)`, never an error,
    /// so callers cannot mistake a storage failure for a missing row.
    pub fn get_one(&self, id: i64) -> DbResult<Option<StoredApplication>> {
        self.db.get_application(id)
    }

    /// Page through applications, newest first, with the total count.
    pub fn get_list(&self, page: usize, size: usize) -> DbResult<(Vec<StoredApplication>, u64)> {
        self.db.list_applications(page, size)
    }

    /// Insert or overwrite an application row.
    pub fn upsert(&self, application: &StoredApplication) -> DbResult<()> {
        self.db.upsert_application(application)
    }

    /// Apply a terminal review outcome, guarded by `status <> new status`.
    ///
    /// Returns `false` when the row is missing or already carries the new
    /// status; a concurrent duplicate of the same transition is a no-op,
    /// not an error.
    pub fn reviewed(&self, update: &ReviewUpdate) -> DbResult<bool> {
        self.db.mark_reviewed(update)
    }

    /// Apply a review outcome and a member role change in one ACID write.
    ///
    /// The approve path must never commit the role without the status (or
    /// the reverse), so both updates share a single write transaction.
    pub fn reviewed_with_role(
        &self,
        member_id: i64,
        role: super::members::MemberRole,
        update: &ReviewUpdate,
    ) -> DbResult<bool> {
        self.db.apply_review(member_id, role, update)
    }

    /// Stamp `released_at`, guarded by `released_at IS NULL`.
    ///
    /// Returns `false` when the stamp was already set, giving at-most-once
    /// semantics for the release bookkeeping.
    pub fn release(&self, id: i64, at: DateTime<Utc>) -> DbResult<bool> {
        self.db.stamp_released(id, at)
    }
}
