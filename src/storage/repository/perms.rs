// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable admin permission sets.
//!
//! One row per admin uid, holding the serialized list of permission codes.
//! This table is the source of truth; the TTL'd cache in `perms::cache` is
//! only an acceleration layer on top of it.

use super::super::database::{AdminDatabase, DbResult};

/// Repository for per-admin permission sets.
pub struct PermRepository<'a> {
    db: &'a AdminDatabase,
}

impl<'a> PermRepository<'a> {
    pub fn new(db: &'a AdminDatabase) -> Self {
        Self { db }
    }

    /// Fetch the permission list for an admin. A missing row is `Ok(None)`.
    pub fn get_by_uid(&self, uid: i64) -> DbResult<Option<Vec<String>>> {
        self.db.get_perms(uid)
    }

    /// Write the permission list for an admin, update-or-insert, in one
    /// write transaction.
    pub fn upsert(&self, uid: i64, perms: &[String]) -> DbResult<()> {
        self.db.upsert_perms(uid, perms)
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

    #[test]
    fn missing_row_is_none() {
        let (db, _dir) = temp_db();
        let repo = PermRepository::new(&db);
        assert!(repo.get_by_uid(1).unwrap().is_none());
    }

    #[test]
    fn upsert_overwrites_existing_set() {
        let (db, _dir) = temp_db();
        let repo = PermRepository::new(&db);

        repo.upsert(1, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(
            repo.get_by_uid(1).unwrap().unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );

        repo.upsert(1, &["c".to_string()]).unwrap();
        assert_eq!(repo.get_by_uid(1).unwrap().unwrap(), vec!["c".to_string()]);
    }
}
