// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Roast Board: post people worth roasting, roast them, like the best
//! roasts.
//!
//! This crate provides the backend API: targets and comments, likes,
//! the progression/badge/notification pipeline that follows every
//! action, onboarding gating, and the AI target-draft proxy.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Db;
use services::{AuthClient, BlobStore, GeneratorClient, RoastService, SessionGate};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Db,
    pub sessions: SessionGate,
    pub roasts: RoastService,
    pub auth: AuthClient,
    pub generator: GeneratorClient,
}

impl AppState {
    /// Wire services over an already-built store and blob backend.
    pub fn new(
        config: Config,
        db: Db,
        effects: services::SideEffects,
        blobs: BlobStore,
    ) -> Self {
        let sessions = SessionGate::new(db.clone(), config.profile_fetch_timeout);
        let roasts = RoastService::new(db.clone(), effects, blobs);
        let auth = AuthClient::new(config.auth_url.clone(), config.auth_anon_key.clone());
        let generator =
            GeneratorClient::new(config.gemini_api_key.clone(), config.gemini_model.clone());

        Self {
            config,
            db,
            sessions,
            roasts,
            auth,
            generator,
        }
    }
}
