// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LEDGER_BASE_URL` | Base URL of the internal ledger service | Required |
//! | `SEED_ADMIN_ID` | Admin uid bootstrapped with all permissions | Optional |
//! | `SEED_ADMIN_TOKEN` | Pre-issued session token for the seed admin | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

/// Environment variable name for the data directory path.
///
/// The admin database (`admin.redb`) lives directly under this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Default data directory when `DATA_DIR` is unset.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// File name of the embedded admin database inside the data directory.
pub const DATABASE_FILE: &str = "admin.redb";

/// Environment variable naming the admin uid that gets every registered
/// permission on first start. Without it a fresh deployment has no admin
/// able to grant anything (the grant hierarchy only hands out held
/// permissions).
pub const SEED_ADMIN_ID_ENV: &str = "SEED_ADMIN_ID";

/// Environment variable holding a pre-issued session token for the seed
/// admin, so deployments and smoke tests can call the API immediately.
pub const SEED_ADMIN_TOKEN_ENV: &str = "SEED_ADMIN_TOKEN";
