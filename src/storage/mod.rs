// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Admin Storage Module
//!
//! Persistent storage for the admin backend, built on redb (embedded,
//! ACID, pure Rust).
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/admin.redb
//!   agent_applications   # application id → review record
//!   members              # member id → role tier
//!   admin_perms          # admin uid → permission list
//! ```
//!
//! Review-outcome columns (`status`, `reviewed_*`, `released_at`) are only
//! written through compare-and-set updates, so retried transitions and
//! release stamps are safe no-ops regardless of locking.

pub mod database;
pub mod repository;

pub use database::{AdminDatabase, AdminDbError, DbResult};
pub use repository::{
    ApplicationRepository, ApplicationStatus, Direction, MemberRepository, MemberRole,
    PermRepository, ReviewUpdate, StoredApplication, StoredMember,
};
