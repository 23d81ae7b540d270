// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::Json;

use crate::models::StatusResponse;

#[utoipa::path(
    get,
    path = "/healthz",
    tag = "Health",
    responses((status = 200, body = StatusResponse))
)]
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse::ok())
}
