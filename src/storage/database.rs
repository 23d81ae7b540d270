// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded admin database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `agent_applications`: application id → serialized StoredApplication
//! - `members`: member id → serialized StoredMember
//! - `admin_perms`: admin uid → serialized permission list
//!
//! All review-outcome writes are predicate guarded (compare-and-set): the
//! same transition applied twice affects zero rows. The approve path's
//! role+status pair commits in a single write transaction.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition,
};

use super::repository::applications::{ReviewUpdate, StoredApplication};
use super::repository::members::{MemberRole, StoredMember};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: application id → serialized StoredApplication (JSON bytes).
const AGENT_APPLICATIONS: TableDefinition<i64, &[u8]> =
    TableDefinition::new("agent_applications");

/// Member id → serialized StoredMember (JSON bytes).
const MEMBERS: TableDefinition<i64, &[u8]> = TableDefinition::new("members");

/// Admin uid → serialized permission list (JSON array of strings).
const ADMIN_PERMS: TableDefinition<i64, &[u8]> = TableDefinition::new("admin_perms");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AdminDbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type DbResult<T> = Result<T, AdminDbError>;

// =============================================================================
// AdminDatabase
// =============================================================================

/// Embedded ACID database for the admin backend.
pub struct AdminDatabase {
    db: Database,
}

impl AdminDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(AGENT_APPLICATIONS)?;
            let _ = write_txn.open_table(MEMBERS)?;
            let _ = write_txn.open_table(ADMIN_PERMS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Agent applications
    // =========================================================================

    /// Insert or overwrite an application row.
    pub fn upsert_application(&self, application: &StoredApplication) -> DbResult<()> {
        let json = serde_json::to_vec(application)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(AGENT_APPLICATIONS)?;
            table.insert(application.id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single application by id.
    pub fn get_application(&self, id: i64) -> DbResult<Option<StoredApplication>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AGENT_APPLICATIONS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Paginated listing, id descending, together with the total row count.
    ///
    /// `page` is 1-based.
    pub fn list_applications(
        &self,
        page: usize,
        size: usize,
    ) -> DbResult<(Vec<StoredApplication>, u64)> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AGENT_APPLICATIONS)?;
        let total = table.len()?;

        let offset = page.saturating_sub(1).saturating_mul(size);
        let mut items = Vec::with_capacity(size);
        for entry in table.iter()?.rev().skip(offset).take(size) {
            let entry = entry?;
            items.push(serde_json::from_slice(entry.1.value())?);
        }
        Ok((items, total))
    }

    /// Apply a terminal review outcome if the stored status still differs
    /// from the new one (`id = ? AND status <> ?`).
    ///
    /// Returns whether the row was changed. A missing row or an identical
    /// status affects zero rows and returns `false`.
    pub fn mark_reviewed(&self, update: &ReviewUpdate) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let applied = {
            let mut table = write_txn.open_table(AGENT_APPLICATIONS)?;
            apply_review_update(&mut table, update)?
        };
        write_txn.commit()?;
        Ok(applied)
    }

    /// Stamp `released_at` if it is currently null
    /// (`id = ? AND released_at IS NULL`).
    pub fn stamp_released(&self, id: i64, at: DateTime<Utc>) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let applied = {
            let mut table = write_txn.open_table(AGENT_APPLICATIONS)?;

            let existing = match table.get(id)? {
                Some(value) => Some(value.value().to_vec()),
                None => None,
            };
            match existing {
                Some(bytes) => {
                    let mut application: StoredApplication = serde_json::from_slice(&bytes)?;
                    if application.released_at.is_some() {
                        false
                    } else {
                        application.released_at = Some(at);
                        application.updated_at = at;
                        let json = serde_json::to_vec(&application)?;
                        table.insert(id, json.as_slice())?;
                        true
                    }
                }
                None => false,
            }
        };
        write_txn.commit()?;
        Ok(applied)
    }

    /// Apply a review outcome and a member role change atomically.
    ///
    /// Returns whether the review update was applied. The role update is
    /// its own compare-and-set (`id = ? AND role <> ?`) inside the same
    /// transaction, so a no-op role write never blocks the status write.
    pub fn apply_review(
        &self,
        member_id: i64,
        role: MemberRole,
        update: &ReviewUpdate,
    ) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let applied = {
            let mut members = write_txn.open_table(MEMBERS)?;
            apply_role_update(&mut members, member_id, role)?;
            drop(members);

            let mut applications = write_txn.open_table(AGENT_APPLICATIONS)?;
            apply_review_update(&mut applications, update)?
        };
        write_txn.commit()?;
        Ok(applied)
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Insert or overwrite a member row.
    pub fn upsert_member(&self, member: &StoredMember) -> DbResult<()> {
        let json = serde_json::to_vec(member)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(MEMBERS)?;
            table.insert(member.id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Look up a single member by id.
    pub fn get_member(&self, member_id: i64) -> DbResult<Option<StoredMember>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MEMBERS)?;
        match table.get(member_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Change a member's role if it differs (`id = ? AND role <> ?`).
    pub fn update_member_role(&self, member_id: i64, role: MemberRole) -> DbResult<bool> {
        let write_txn = self.db.begin_write()?;
        let applied = {
            let mut table = write_txn.open_table(MEMBERS)?;
            apply_role_update(&mut table, member_id, role)?
        };
        write_txn.commit()?;
        Ok(applied)
    }

    // =========================================================================
    // Admin permissions
    // =========================================================================

    /// Fetch the permission list for an admin uid.
    pub fn get_perms(&self, uid: i64) -> DbResult<Option<Vec<String>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ADMIN_PERMS)?;
        match table.get(uid)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Write the permission list for an admin uid (update-or-insert).
    pub fn upsert_perms(&self, uid: i64, perms: &[String]) -> DbResult<()> {
        let json = serde_json::to_vec(perms)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ADMIN_PERMS)?;
            table.insert(uid, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// Predicate-guarded updates (shared between single and combined transactions)
// =============================================================================

fn apply_review_update(
    table: &mut Table<'_, i64, &'static [u8]>,
    update: &ReviewUpdate,
) -> DbResult<bool> {
    let existing = match table.get(update.id)? {
        Some(value) => Some(value.value().to_vec()),
        None => None,
    };
    let Some(bytes) = existing else {
        return Ok(false);
    };

    let mut application: StoredApplication = serde_json::from_slice(&bytes)?;
    if application.status == update.status {
        return Ok(false);
    }

    application.status = update.status;
    application.reviewed_by = update.reviewed_by;
    application.reviewed_at = Some(update.reviewed_at);
    application.reject_reason = update.reject_reason.clone();
    application.updated_at = update.reviewed_at;

    let json = serde_json::to_vec(&application)?;
    table.insert(update.id, json.as_slice())?;
    Ok(true)
}

fn apply_role_update(
    table: &mut Table<'_, i64, &'static [u8]>,
    member_id: i64,
    role: MemberRole,
) -> DbResult<bool> {
    let existing = match table.get(member_id)? {
        Some(value) => Some(value.value().to_vec()),
        None => None,
    };
    let Some(bytes) = existing else {
        return Ok(false);
    };

    let mut member: StoredMember = serde_json::from_slice(&bytes)?;
    if member.role == role {
        return Ok(false);
    }

    member.role = role;
    member.updated_at = Utc::now();

    let json = serde_json::to_vec(&member)?;
    table.insert(member_id, json.as_slice())?;
    Ok(true)
}

// =============================================================================
// Tests
// =============================================================================
