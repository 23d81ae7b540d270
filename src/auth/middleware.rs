// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission-gating middleware.
//!
//! Resolves `"<METHOD>:<matched path>"` against the permission registry.
//! Ungated routes pass through untouched; gated routes require a valid
//! session and a passing permission check. The check is fail-closed: any
//! internal lookup failure denies.

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::session::SESSION_HEADER;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn check_perm(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let Some(code) = state
        .registry
        .code_for(request.method().as_str(), &path)
        .map(str::to_string)
    else {
        return next.run(request).await;
    };

    let admin_id = request
        .headers()
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|token| state.sessions.resolve(token));
    let Some(admin_id) = admin_id else {
        return ApiError::unauthorized("missing or invalid session").into_response();
    };

    if !state.perms.has_permission(admin_id, &code) {
        tracing::warn!(admin_id, %path, code, "permission denied");
        return ApiError::forbidden("permission denied").into_response();
    }

    next.run(request).await
}
