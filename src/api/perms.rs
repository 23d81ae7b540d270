// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::AdminSession,
    error::ApiError,
    models::{
        AllPermissionsResponse, StatusResponse, UpdatePermissionsRequest, UserPermissionsResponse,
    },
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/perms",
    tag = "Permissions",
    responses((status = 200, body = AllPermissionsResponse))
)]
pub async fn all_permissions(State(state): State<AppState>) -> Json<AllPermissionsResponse> {
    Json(AllPermissionsResponse {
        permissions: state.registry.routes().clone(),
    })
}

#[utoipa::path(
    get,
    path = "/v1/perms/me",
    tag = "Permissions",
    responses((status = 200, body = UserPermissionsResponse))
)]
pub async fn my_permissions(
    State(state): State<AppState>,
    session: AdminSession,
) -> Result<Json<UserPermissionsResponse>, ApiError> {
    let permissions = state.perms.user_perms(session.admin_id)?;
    Ok(Json(UserPermissionsResponse {
        uid: session.admin_id,
        permissions,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/perms/{uid}",
    params(("uid" = i64, Path, description = "Admin user id")),
    tag = "Permissions",
    responses((status = 200, body = UserPermissionsResponse))
)]
pub async fn user_permissions(
    State(state): State<AppState>,
    Path(uid): Path<i64>,
) -> Result<Json<UserPermissionsResponse>, ApiError> {
    let permissions = state.perms.user_perms(uid)?;
    Ok(Json(UserPermissionsResponse { uid, permissions }))
}

#[utoipa::path(
    put,
    path = "/v1/perms/{uid}",
    params(("uid" = i64, Path, description = "Admin user id")),
    request_body = UpdatePermissionsRequest,
    tag = "Permissions",
    responses((status = 200, body = StatusResponse))
)]
pub async fn update_permissions(
    State(state): State<AppState>,
    session: AdminSession,
    Path(uid): Path<i64>,
    Json(request): Json<UpdatePermissionsRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    state
        .perms
        .update_permissions(session.admin_id, uid, &request.permissions)?;
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{grant, test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn unknown_uid_yields_empty_set() {
        let (state, _dir) = test_state();
        let Json(response) = user_permissions(State(state), Path(404)).await.unwrap();
        assert_eq!(response.uid, 404);
        assert!(response.permissions.is_empty());
    }

    #[tokio::test]
    async fn update_then_read_back() {
        let (state, _dir) = test_state();
        grant(
            &state,
            1,
            &["agent-review-list", "agent-review-approve", "perm-update"],
        );

        let session = AdminSession { admin_id: 1 };
        update_permissions(
            State(state.clone()),
            session,
            Path(2),
            Json(UpdatePermissionsRequest {
                permissions: vec!["agent-review-list".to_string()],
            }),
        )
        .await
        .unwrap();

        let Json(response) = user_permissions(State(state), Path(2)).await.unwrap();
        assert_eq!(response.permissions, vec!["agent-review-list"]);
    }

    #[tokio::test]
    async fn granting_unheld_permission_is_rejected() {
        let (state, _dir) = test_state();
        grant(&state, 1, &["agent-review-list"]);

        let session = AdminSession { admin_id: 1 };
        let err = update_permissions(
            State(state),
            session,
            Path(2),
            Json(UpdatePermissionsRequest {
                permissions: vec![
                    "agent-review-list".to_string(),
                    "agent-review-approve".to_string(),
                ],
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn all_permissions_lists_gated_routes() {
        let (state, _dir) = test_state();
        let Json(response) = all_permissions(State(state)).await;
        assert_eq!(
            response.permissions.get("POST:/v1/review/approve"),
            Some(&"agent-review-approve".to_string())
        );
    }
}
