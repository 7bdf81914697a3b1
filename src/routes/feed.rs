// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public read routes: the home feed, target threads, leaderboards.
//!
//! With no store configured these answer empty (or 404) instead of 503.

use crate::error::{AppError, Result};
use crate::models::{CommentSort, PublicUser};
use crate::services::leaderboard::{self, LeaderboardView};
use crate::services::roast::{FeedPage, FeedTab, ThreadView};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/targets", get(list_targets))
        .route("/api/targets/{id}", get(get_thread))
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/comments/{id}/author", get(get_comment_author))
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub tab: FeedTab,
    /// Zero-based page number
    #[serde(default)]
    pub page: u32,
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    #[serde(default)]
    pub sort: CommentSort,
}

/// GET /api/targets?tab=hot|new|champ&page=N
async fn list_targets(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>> {
    let page = state.roasts.feed(query.tab, query.page).await?;
    Ok(Json(page))
}

/// GET /api/targets/{id}?sort=hot|new
async fn get_thread(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<ThreadView>> {
    if !state.db.is_configured() {
        return Err(AppError::NotFound(format!("target {}", target_id)));
    }
    let view = state.roasts.thread(&target_id, query.sort).await?;
    Ok(Json(view))
}

/// GET /api/leaderboard
async fn get_leaderboard(State(state): State<Arc<AppState>>) -> Result<Json<LeaderboardView>> {
    Ok(Json(leaderboard::read(&state.db).await?))
}

/// GET /api/comments/{id}/author
async fn get_comment_author(
    State(state): State<Arc<AppState>>,
    Path(comment_id): Path<String>,
) -> Result<Json<PublicUser>> {
    if !state.db.is_configured() {
        return Err(AppError::NotFound(format!("comment {}", comment_id)));
    }
    Ok(Json(state.roasts.comment_author(&comment_id).await?))
}
