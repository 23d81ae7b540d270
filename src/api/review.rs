// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    auth::AdminSession,
    error::ApiError,
    models::{ApproveRequest, PageQuery, RejectRequest, ReviewListResponse, StatusResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/review/applications",
    params(PageQuery),
    tag = "Review",
    responses((status = 200, body = ReviewListResponse))
)]
pub async fn list_applications(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> Result<Json<ReviewListResponse>, ApiError> {
    let (page, size) = params.normalize();
    let (items, total) = state.reviews.list(page, size)?;
    Ok(Json(ReviewListResponse {
        items: items.into_iter().map(Into::into).collect(),
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/review/approve",
    request_body = ApproveRequest,
    tag = "Review",
    responses((status = 200, body = StatusResponse))
)]
pub async fn approve_application(
    State(state): State<AppState>,
    session: AdminSession,
    Json(request): Json<ApproveRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if request.id <= 0 {
        return Err(ApiError::bad_request("empty ID"));
    }
    state.reviews.approve(session.admin_id, request.id).await?;
    Ok(Json(StatusResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/v1/review/reject",
    request_body = RejectRequest,
    tag = "Review",
    responses((status = 200, body = StatusResponse))
)]
pub async fn reject_application(
    State(state): State<AppState>,
    session: AdminSession,
    Json(request): Json<RejectRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if request.id <= 0 || request.reason.trim().is_empty() {
        return Err(ApiError::bad_request("empty ID or reason"));
    }
    state
        .reviews
        .reject(session.admin_id, request.id, &request.reason)
        .await?;
    Ok(Json(StatusResponse::ok()))
}
