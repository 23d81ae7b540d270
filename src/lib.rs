// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet Admin Server - Administrative Backend for the Wallet Platform
//!
//! This crate provides the internal admin service for the wallet platform:
//! permission management for admin users and the agent-application review
//! workflow, which settles escrowed deposits against the external ledger
//! service.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Sessions, permission registry, gating middleware
//! - `lock` - Named mutual-exclusion locks for the review workflow
//! - `ledger` - Escrow-release client for the ledger service
//! - `perms` - Permission service with read-through TTL cache
//! - `review` - Application review workflow engine
//! - `storage` - Embedded database and repositories (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod models;
pub mod perms;
pub mod review;
pub mod state;
pub mod storage;
