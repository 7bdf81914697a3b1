// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Periodic reconciliation: repair target counters from comment rows and
//! rebuild the three leaderboard collections.

use chrono::{Duration, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Comment, Leaderboard, LeaderboardEntry, Target};
use crate::services::aggregate;

const MAX_CONCURRENT_REFRESHES: usize = 8;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub targets_scanned: usize,
    pub targets_repaired: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardView {
    pub daily: Vec<LeaderboardEntry>,
    pub top: Vec<LeaderboardEntry>,
    pub hall_of_fame: Vec<LeaderboardEntry>,
}

fn comment_entries(comments: &[Comment]) -> Vec<LeaderboardEntry> {
    comments
        .iter()
        .enumerate()
        .map(|(i, c)| LeaderboardEntry {
            rank: i as u32 + 1,
            subject_id: c.id.clone(),
            target_id: c.target_id.clone(),
            title: c.content.clone(),
            author_name: c.user_name.clone(),
            avatar: c.user_avatar.clone(),
            likes: c.likes,
        })
        .collect()
}

fn target_entries(targets: &[Target]) -> Vec<LeaderboardEntry> {
    targets
        .iter()
        .enumerate()
        .map(|(i, t)| LeaderboardEntry {
            rank: i as u32 + 1,
            subject_id: t.id.clone(),
            target_id: t.id.clone(),
            title: t.name.clone(),
            author_name: String::new(),
            avatar: t.avatar_url.clone(),
            likes: t.total_likes,
        })
        .collect()
}

/// Most liked first, at most `limit`.
fn rank_comments(mut comments: Vec<Comment>, limit: usize) -> Vec<Comment> {
    comments.sort_by(|a, b| b.likes.cmp(&a.likes).then(b.created_at.cmp(&a.created_at)));
    comments.truncate(limit);
    comments
}

/// Rewrite drifted target counters, then rebuild every board.
pub async fn reconcile(db: &Db) -> Result<ReconcileReport, AppError> {
    let targets = db.all_targets().await?;
    let targets_scanned = targets.len();

    let refreshed: Vec<(Target, bool)> = stream::iter(targets)
        .map(|mut target| async move {
            let aggregate = match aggregate::target_aggregate(db, &target.id).await {
                Ok(aggregate) => aggregate,
                Err(e) => {
                    tracing::warn!(target_id = %target.id, error = %e, "Aggregate failed");
                    return (target, false);
                }
            };
            let counters = aggregate.counters();
            if counters.roast_count == target.roast_count
                && counters.total_likes == target.total_likes
            {
                return (target, false);
            }

            match db.update_target_counters(&target.id, &counters).await {
                Ok(()) => {
                    target.roast_count = counters.roast_count;
                    target.total_likes = counters.total_likes;
                    (target, true)
                }
                Err(e) => {
                    tracing::warn!(target_id = %target.id, error = %e, "Counter repair failed");
                    (target, false)
                }
            }
        })
        .buffer_unordered(MAX_CONCURRENT_REFRESHES)
        .collect()
        .await;

    let targets_repaired = refreshed.iter().filter(|(_, repaired)| *repaired).count();
    let mut targets: Vec<Target> = refreshed.into_iter().map(|(t, _)| t).collect();

    let daily = rank_comments(
        db.list_comments_since(Utc::now() - Duration::hours(24))
            .await?,
        Leaderboard::Daily.limit(),
    );
    db.replace_leaderboard(Leaderboard::Daily, &comment_entries(&daily))
        .await?;

    let top = rank_comments(
        db.top_comments(Leaderboard::Top.limit() as u32).await?,
        Leaderboard::Top.limit(),
    );
    db.replace_leaderboard(Leaderboard::Top, &comment_entries(&top))
        .await?;

    targets.sort_by(|a, b| b.total_likes.cmp(&a.total_likes));
    targets.truncate(Leaderboard::HallOfFame.limit());
    db.replace_leaderboard(Leaderboard::HallOfFame, &target_entries(&targets))
        .await?;

    let report = ReconcileReport {
        targets_scanned,
        targets_repaired,
    };
    tracing::info!(
        scanned = report.targets_scanned,
        repaired = report.targets_repaired,
        "Reconciliation complete"
    );
    Ok(report)
}

/// Read all three boards; empty when no store is configured.
pub async fn read(db: &Db) -> Result<LeaderboardView, AppError> {
    if !db.is_configured() {
        return Ok(LeaderboardView::default());
    }

    let (daily, top, hall_of_fame) = tokio::join!(
        db.list_leaderboard(Leaderboard::Daily),
        db.list_leaderboard(Leaderboard::Top),
        db.list_leaderboard(Leaderboard::HallOfFame)
    );

    Ok(LeaderboardView {
        daily: daily?,
        top: top?,
        hall_of_fame: hall_of_fame?,
    })
}
