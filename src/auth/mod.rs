// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization.
//!
//! - `registry` - immutable route → permission-code registry
//! - `session` - opaque session tokens and the `AdminSession` extractor
//! - `middleware` - permission-gating middleware

pub mod middleware;
pub mod registry;
pub mod session;

pub use registry::PermRegistry;
pub use session::{AdminSession, SessionStore, SESSION_HEADER};
