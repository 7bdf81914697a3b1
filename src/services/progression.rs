// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Experience ledger and badge evaluation.

use crate::db::Db;
use crate::error::AppError;
use crate::models::{ProgressDelta, UserBadge, UserStats};

/// Experience awarded per action.
pub struct ExpRules;

impl ExpRules {
    pub const POST: u32 = 30;
    pub const COMMENT: u32 = 10;
    /// Awarded to the liker
    pub const LIKE: u32 = 2;
    /// Awarded to the author of the liked comment
    pub const RECEIVED_LIKE: u32 = 5;
}

/// Threshold rules: (badge id, predicate over the stats row).
///
/// b1, b2 and b8 are in the catalog but have no rule here; they are never
/// unlocked automatically.
const BADGE_RULES: &[(&str, fn(&UserStats) -> bool)] = &[
    ("b3", |s| s.likes_received >= 100),
    ("b4", |s| s.likes_received >= 1000),
    ("b5", |s| s.targets_created >= 10),
    ("b6", |s| s.roasts_posted >= 100),
    ("b7", |s| s.roasts_posted >= 1),
];

/// Badge ids whose threshold the stats row meets.
pub fn evaluate_badges(stats: &UserStats) -> Vec<&'static str> {
    BADGE_RULES
        .iter()
        .filter(|(_, rule)| rule(stats))
        .map(|(id, _)| *id)
        .collect()
}

/// One counter update for one action.
pub async fn apply_progress(db: &Db, delta: &ProgressDelta) -> Result<UserStats, AppError> {
    db.apply_progress(delta).await
}

/// Unlock every badge whose threshold the stored stats meet.
///
/// Writes nothing when there is no stats row or no rule matches. Existing
/// unlocks are never revoked. Returns the ids upserted.
pub async fn sync_badges(db: &Db, user_id: &str) -> Result<Vec<&'static str>, AppError> {
    let Some(stats) = db.get_user_stats(user_id).await? else {
        return Ok(Vec::new());
    };

    let unlocked = evaluate_badges(&stats);
    if unlocked.is_empty() {
        return Ok(unlocked);
    }

    let rows: Vec<UserBadge> = unlocked
        .iter()
        .map(|badge_id| UserBadge::unlocked(user_id, badge_id))
        .collect();
    db.upsert_user_badges(&rows).await?;

    tracing::debug!(user_id, badges = ?unlocked, "Badges synced");
    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(targets: u32, roasts: u32, likes: u32) -> UserStats {
        UserStats {
            user_id: "u1".to_string(),
            targets_created: targets,
            roasts_posted: roasts,
            likes_received: likes,
            exp: 0,
        }
    }

    #[test]
    fn test_first_roast_unlocks_b7() {
        assert_eq!(evaluate_badges(&stats(0, 1, 0)), vec!["b7"]);
    }

    #[test]
    fn test_like_tiers() {
        let badges = evaluate_badges(&stats(0, 0, 100));
        assert!(badges.contains(&"b3"));
        assert!(!badges.contains(&"b4"));

        let badges = evaluate_badges(&stats(0, 0, 1000));
        assert!(badges.contains(&"b3"));
        assert!(badges.contains(&"b4"));
    }

    #[test]
    fn test_zero_stats_unlock_nothing() {
        assert!(evaluate_badges(&stats(0, 0, 0)).is_empty());
        assert_eq!(evaluate_badges(&stats(10, 100, 0)), vec!["b5", "b6", "b7"]);
    }

    #[tokio::test]
    async fn test_sync_without_stats_row_writes_nothing() {
        let db = Db::Memory(crate::db::MemoryDb::new());
        assert!(sync_badges(&db, "ghost").await.unwrap().is_empty());
        assert!(db.list_user_badges("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sync_never_revokes() {
        let db = Db::Memory(crate::db::MemoryDb::new());
        db.upsert_user_stats(&stats(0, 1, 0)).await.unwrap();
        sync_badges(&db, "u1").await.unwrap();

        // Counter drops (e.g. after a manual fix); the unlock stays.
        db.upsert_user_stats(&stats(0, 0, 0)).await.unwrap();
        sync_badges(&db, "u1").await.unwrap();

        let rows = db.list_user_badges("u1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].unlocked);
    }
}
