// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Roast Board API Server
//!
//! Serves the roast feed, threads, likes, and profiles, and runs the
//! progression/notification side effects behind them.

use roast_board::{
    config::{Config, StoreBackend},
    db::{Db, FirestoreDb, MemoryDb},
    services::{
        leaderboard, session::HELD_PROFILE_IDLE, spawn_outbox, BlobStore, HttpBlobStore,
        MemoryBlobStore, SessionGate, SideEffects,
    },
    AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Roast Board API");

    let db = match (config.store_backend, config.gcp_project_id.as_deref()) {
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Db::Memory(MemoryDb::new())
        }
        (StoreBackend::Firestore, Some(project_id)) => {
            Db::Firestore(FirestoreDb::new(project_id).await?)
        }
        (StoreBackend::Firestore, None) => {
            tracing::warn!("GCP_PROJECT_ID not set; running without a backend");
            Db::Firestore(FirestoreDb::offline())
        }
    };
    tracing::info!(store = db.backend_name(), "Store initialized");

    let effects = if config.outbox_enabled {
        let (effects, _worker) = spawn_outbox(db.clone(), config.outbox_max_attempts);
        tracing::info!(
            max_attempts = config.outbox_max_attempts,
            "Side-effect outbox started"
        );
        effects
    } else {
        SideEffects::Inline(db.clone())
    };

    let blobs = match config.storage_url.clone() {
        Some(url) => BlobStore::Http(HttpBlobStore::new(
            url,
            config.storage_bucket.clone(),
            config.auth_anon_key.clone(),
        )),
        None => {
            tracing::warn!("STORAGE_URL not set; voice roasts are kept in memory");
            BlobStore::Memory(MemoryBlobStore::new(&config.storage_bucket))
        }
    };

    if config.reconcile_interval_secs > 0 && db.is_configured() {
        spawn_reconciler(db.clone(), Duration::from_secs(config.reconcile_interval_secs));
    }

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, effects, blobs));
    spawn_session_pruner(state.sessions.clone());

    // Build router
    let app = roast_board::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Repair counters and rebuild leaderboards on a fixed interval.
fn spawn_reconciler(db: Db, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match leaderboard::reconcile(&db).await {
                Ok(report) => tracing::info!(
                    scanned = report.targets_scanned,
                    repaired = report.targets_repaired,
                    "Reconciliation pass complete"
                ),
                Err(e) => tracing::warn!(error = %e, "Reconciliation pass failed"),
            }
        }
    });
}

/// Evict held profiles whose sessions can no longer be live.
fn spawn_session_pruner(sessions: SessionGate) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            ticker.tick().await;
            let evicted = sessions.prune_idle(HELD_PROFILE_IDLE);
            if evicted > 0 {
                tracing::info!(evicted, "Pruned idle held profiles");
            }
        }
    });
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), tracing_subscriber::filter::ParseError> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("roast_board=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
