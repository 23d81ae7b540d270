// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{env, net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use tracing_subscriber::EnvFilter;

use wallet_admin_server::{
    api,
    auth::SessionStore,
    config,
    ledger::{HttpLedgerClient, LedgerClient},
    lock::LockService,
    perms::PermissionService,
    review::ReviewService,
    state::AppState,
    storage::AdminDatabase,
};

/// How long a review holds its per-member lock before it is considered
/// abandoned.
const LOCK_TTL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    init_tracing();

    let data_dir: PathBuf = env::var(config::DATA_DIR_ENV)
        .unwrap_or_else(|_| config::DEFAULT_DATA_DIR.to_string())
        .into();
    let db = Arc::new(
        AdminDatabase::open(&data_dir.join(config::DATABASE_FILE))
            .expect("Failed to open admin database"),
    );

    let ledger: Arc<dyn LedgerClient> = Arc::new(
        HttpLedgerClient::from_env().expect("Failed to configure ledger client"),
    );

    let registry = Arc::new(api::perm_registry());
    let sessions = Arc::new(SessionStore::default());
    seed_admin(&db, &registry, &sessions);

    let perms = Arc::new(PermissionService::new(
        Arc::clone(&db),
        Arc::clone(&registry),
    ));
    let locks = Arc::new(LockService::new(LOCK_TTL));
    let reviews = Arc::new(ReviewService::new(Arc::clone(&db), locks, ledger));

    let state = AppState::new(db, registry, sessions, perms, reviews);
    let app = api::router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .expect("Failed to parse bind address");

    tracing::info!(%addr, "wallet admin server listening (docs at /docs)");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("HTTP server failed");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Bootstrap the seed admin on a fresh deployment.
///
/// The grant hierarchy only hands out permissions the granter already
/// holds, so the very first admin must be granted out of band: if
/// `SEED_ADMIN_ID` names an admin with no permission row yet, they get
/// every registered code. `SEED_ADMIN_TOKEN` optionally pre-issues their
/// session.
fn seed_admin(
    db: &AdminDatabase,
    registry: &wallet_admin_server::auth::PermRegistry,
    sessions: &SessionStore,
) {
    let Some(admin_id) = env::var(config::SEED_ADMIN_ID_ENV)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
    else {
        return;
    };

    match db.get_perms(admin_id) {
        Ok(None) => {
            let mut codes: Vec<String> = registry.routes().values().cloned().collect();
            codes.sort();
            codes.dedup();
            match db.upsert_perms(admin_id, &codes) {
                Ok(()) => tracing::info!(admin_id, ?codes, "seeded admin permissions"),
                Err(error) => tracing::error!(admin_id, %error, "failed to seed admin permissions"),
            }
        }
        Ok(Some(_)) => {}
        Err(error) => tracing::error!(admin_id, %error, "failed to read seed admin permissions"),
    }

    if let Ok(token) = env::var(config::SEED_ADMIN_TOKEN_ENV) {
        sessions.insert(token, admin_id);
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
