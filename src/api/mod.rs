// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{middleware::check_perm, PermRegistry},
    models::{
        AllPermissionsResponse, ApplicationView, ApproveRequest, RejectRequest,
        ReviewListResponse, StatusResponse, UpdatePermissionsRequest, UserPermissionsResponse,
    },
    state::AppState,
    storage::{ApplicationStatus, Direction},
};

pub mod health;
pub mod perms;
pub mod review;

/// Gated routes and their permission codes.
///
/// Built once at startup, next to the route table below so the two stay in
/// sync; `UpdatePermissions` validates against exactly this set.
///
/// `GET /v1/perms/me` is deliberately absent: every admin may inspect
/// their own permission set, so the route is session-only and its handler
/// authenticates via the `AdminSession` extractor alone.
pub fn perm_registry() -> PermRegistry {
    PermRegistry::builder()
        .route("GET", "/v1/review/applications", "agent-review-list")
        .route("POST", "/v1/review/approve", "agent-review-approve")
        .route("POST", "/v1/review/reject", "agent-review-reject")
        .route("GET", "/v1/perms", "perm-view")
        .route("GET", "/v1/perms/{uid}", "perm-view")
        .route("PUT", "/v1/perms/{uid}", "perm-update")
        .build()
}

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/review/applications", get(review::list_applications))
        .route("/review/approve", post(review::approve_application))
        .route("/review/reject", post(review::reject_application))
        .route("/perms", get(perms::all_permissions))
        .route("/perms/me", get(perms::my_permissions))
        .route(
            "/perms/{uid}",
            get(perms::user_permissions).put(perms::update_permissions),
        )
        .layer(middleware::from_fn_with_state(state.clone(), check_perm))
        .with_state(state.clone());

    Router::new()
        .nest("/v1", v1_routes)
        .route("/healthz", get(health::health))
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        review::list_applications,
        review::approve_application,
        review::reject_application,
        perms::all_permissions,
        perms::my_permissions,
        perms::user_permissions,
        perms::update_permissions
    ),
    components(
        schemas(
            ApplicationView,
            ApplicationStatus,
            Direction,
            ReviewListResponse,
            ApproveRequest,
            RejectRequest,
            UpdatePermissionsRequest,
            UserPermissionsResponse,
            AllPermissionsResponse,
            StatusResponse
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Review", description = "Agent application review and settlement"),
        (name = "Permissions", description = "Admin permission management")
    )
)]
struct ApiDoc;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::SessionStore;
    use crate::ledger::{LedgerClient, LedgerError, ReleaseOutcome, ReleaseRequest};
    use crate::lock::LockService;
    use crate::perms::PermissionService;
    use crate::review::ReviewService;
    use crate::storage::repository::applications::{ApplicationStatus, StoredApplication};
    use crate::storage::repository::members::{MemberRole, StoredMember};
    use crate::storage::repository::perms::PermRepository;
    use crate::storage::{AdminDatabase, Direction};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::time::Duration;

    struct AcceptAllLedger;

    #[async_trait::async_trait]
    impl LedgerClient for AcceptAllLedger {
        async fn release(&self, _: &ReleaseRequest) -> Result<ReleaseOutcome, LedgerError> {
            Ok(ReleaseOutcome::Released)
        }
    }

    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(AdminDatabase::open(&dir.path().join("admin.redb")).unwrap());
        let registry = Arc::new(perm_registry());
        let sessions = Arc::new(SessionStore::default());
        let perms = Arc::new(PermissionService::new(
            Arc::clone(&db),
            Arc::clone(&registry),
        ));
        let locks = Arc::new(LockService::new(Duration::from_secs(5)));
        let ledger: Arc<dyn LedgerClient> = Arc::new(AcceptAllLedger);
        let reviews = Arc::new(ReviewService::new(Arc::clone(&db), locks, ledger));
        (
            AppState::new(db, registry, sessions, perms, reviews),
            dir,
        )
    }

    pub(crate) fn seed_application(state: &AppState, id: i64, member_id: i64, direction: Direction) {
        let now = Utc::now();
        state
            .db
            .upsert_member(&StoredMember {
                id: member_id,
                role: match direction {
                    Direction::ToAgent => MemberRole::Member,
                    Direction::ToMember => MemberRole::Agent,
                },
                created_at: now,
                updated_at: now,
            })
            .unwrap();
        state
            .db
            .upsert_application(&StoredApplication {
                id,
                member_id,
                direction,
                status: ApplicationStatus::Reviewing,
                currency: "USD".to_string(),
                deposit: Decimal::new(250_00, 2),
                freeze_id: 1000 + id,
                reviewed_by: 0,
                reject_reason: String::new(),
                applied_at: now,
                reviewed_at: None,
                released_at: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();
    }

    pub(crate) fn grant(state: &AppState, uid: i64, perms: &[&str]) {
        let perms: Vec<String> = perms.iter().map(|p| p.to_string()).collect();
        PermRepository::new(&state.db).upsert(uid, &perms).unwrap();
        state.perms.invalidate(uid);
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let (state, _dir) = test_state();
        let app = router(state);
        // Ensure the router can be converted into a service without panicking.
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn gating_enforces_session_then_permission() {
        use axum::body::Body;
        use axum::http::{header, Request, StatusCode};
        use crate::auth::SESSION_HEADER;
        use tower::ServiceExt;

        let (state, _dir) = test_state();
        seed_application(&state, 1, 7, Direction::ToAgent);
        let token = state.sessions.issue(42);
        let app = router(state.clone());

        // Ungated route passes with no token at all.
        let response = app
            .clone()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let approve = |token: Option<&str>| {
            let mut builder = Request::post("/v1/review/approve")
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                builder = builder.header(SESSION_HEADER, token);
            }
            builder.body(Body::from(r#"{"id":1}"#)).unwrap()
        };

        // Gated route with no session.
        let response = app.clone().oneshot(approve(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Valid session but the permission is not held.
        let response = app.clone().oneshot(approve(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Same session once the permission is granted.
        grant(&state, 42, &["agent-review-approve"]);
        let response = app.oneshot(approve(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.db.get_application(1).unwrap().unwrap().status,
            ApplicationStatus::Approved
        );
    }

    #[test]
    fn self_inspection_is_session_only() {
        let registry = perm_registry();
        assert!(registry.code_for("GET", "/v1/perms/me").is_none());
        assert_eq!(registry.code_for("GET", "/v1/perms/{uid}"), Some("perm-view"));
    }
}
