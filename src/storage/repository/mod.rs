// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to the admin database.
//!
//! Each repository covers one entity and is handed an explicit database
//! reference; there is no string-keyed handle lookup anywhere.

pub mod applications;
pub mod members;
pub mod perms;

pub use applications::{
    ApplicationRepository, ApplicationStatus, Direction, ReviewUpdate, StoredApplication,
};
pub use members::{MemberRepository, MemberRole, StoredMember};
pub use perms::PermRepository;
