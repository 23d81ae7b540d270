// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Member repository.
//!
//! The admin service only needs the member's role tier: the review workflow
//! flips it between `member` and `agent` when an application is approved.
//! Everything else about a member lives in the member-facing service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::database::{AdminDatabase, DbResult};

/// Member role tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Member,
    Agent,
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRole::Member => write!(f, "member"),
            MemberRole::Agent => write!(f, "agent"),
        }
    }
}

/// Member row as persisted in the `members` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredMember {
    pub id: i64,
    pub role: MemberRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for member rows.
pub struct MemberRepository<'a> {
    db: &'a AdminDatabase,
}

impl<'a> MemberRepository<'a> {
    pub fn new(db: &'a AdminDatabase) -> Self {
        Self { db }
    }

    pub fn get(&self, member_id: i64) -> DbResult<Option<StoredMember>> {
        self.db.get_member(member_id)
    }

    pub fn upsert(&self, member: &StoredMember) -> DbResult<()> {
        self.db.upsert_member(member)
    }

    /// Change a member's role, guarded by `role <> new role`.
    ///
    /// Returns `false` when the member is missing or already holds the role.
    pub fn update_role(&self, member_id: i64, role: MemberRole) -> DbResult<bool> {
        self.db.update_member_role(member_id, role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> (AdminDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = AdminDatabase::open(&dir.path().join("admin.redb")).unwrap();
        (db, dir)
    }

    fn member(id: i64, role: MemberRole) -> StoredMember {
        StoredMember {
            id,
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn update_role_is_a_compare_and_set() {
        let (db, _dir) = temp_db();
        let repo = MemberRepository::new(&db);
        repo.upsert(&member(7, MemberRole::Member)).unwrap();

        assert!(repo.update_role(7, MemberRole::Agent).unwrap());
        assert!(!repo.update_role(7, MemberRole::Agent).unwrap());
        assert_eq!(repo.get(7).unwrap().unwrap().role, MemberRole::Agent);
    }

    #[test]
    fn update_role_on_missing_member_is_noop() {
        let (db, _dir) = temp_db();
        let repo = MemberRepository::new(&db);
        assert!(!repo.update_role(404, MemberRole::Agent).unwrap());
    }
}
