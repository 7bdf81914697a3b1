// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! In-process store with the same operations as [`FirestoreDb`](super::FirestoreDb).
//!
//! Used for local runs (`STORE_BACKEND=memory`) and tests. Collections can
//! be made to fail or stall on demand so error paths are reachable.

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use std::time::Duration;

use crate::db::collections;
use crate::error::AppError;
use crate::models::badge::default_catalog;
use crate::models::{
    Badge, Comment, Leaderboard, LeaderboardEntry, Notification, Profile, ProgressDelta,
    PublicUser, Target, TargetCounters, UserBadge, UserStats,
};

#[derive(Clone, Default)]
pub struct MemoryDb {
    profiles: Arc<DashMap<String, Profile>>,
    public_users: Arc<DashMap<String, PublicUser>>,
    stats: Arc<DashMap<String, UserStats>>,
    targets: Arc<DashMap<String, Target>>,
    comments: Arc<DashMap<String, Comment>>,
    badges: Arc<DashMap<String, Badge>>,
    user_badges: Arc<DashMap<String, UserBadge>>,
    notifications: Arc<DashMap<String, Notification>>,
    leaderboards: Arc<DashMap<&'static str, Vec<LeaderboardEntry>>>,

    failing_writes: Arc<DashSet<&'static str>>,
    failing_reads: Arc<DashSet<&'static str>>,
    read_delays: Arc<DashMap<&'static str, Duration>>,
}

impl MemoryDb {
    /// Empty store with the badge catalog seeded.
    pub fn new() -> Self {
        let db = Self::default();
        for badge in default_catalog() {
            db.badges.insert(badge.id.clone(), badge);
        }
        db
    }

    // ─── Fault injection ────────────────────────────────────────

    /// Make every write to `collection` fail until [`Self::heal`].
    pub fn fail_writes_to(&self, collection: &'static str) {
        self.failing_writes.insert(collection);
    }

    pub fn fail_reads_from(&self, collection: &'static str) {
        self.failing_reads.insert(collection);
    }

    /// Delay every read of `collection` by `delay`.
    pub fn set_read_delay(&self, collection: &'static str, delay: Duration) {
        self.read_delays.insert(collection, delay);
    }

    pub fn heal(&self) {
        self.failing_writes.clear();
        self.failing_reads.clear();
        self.read_delays.clear();
    }

    async fn read_gate(&self, collection: &'static str) -> Result<(), AppError> {
        let delay = self.read_delays.get(collection).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_reads.contains(collection) {
            return Err(AppError::Database(format!("read from {} failed", collection)));
        }
        Ok(())
    }

    fn write_gate(&self, collection: &'static str) -> Result<(), AppError> {
        if self.failing_writes.contains(collection) {
            return Err(AppError::Database(format!("write to {} failed", collection)));
        }
        Ok(())
    }

    // ─── Profiles ───────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.read_gate(collections::APP_USERS).await?;
        Ok(self.profiles.get(user_id).map(|p| p.clone()))
    }

    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        self.write_gate(collections::APP_USERS)?;
        self.profiles.insert(profile.id.clone(), profile.clone());
        self.public_users
            .insert(profile.id.clone(), PublicUser::from(profile));
        Ok(())
    }

    pub async fn get_public_user(&self, user_id: &str) -> Result<Option<PublicUser>, AppError> {
        self.read_gate(collections::PUBLIC_USERS).await?;
        Ok(self.public_users.get(user_id).map(|p| p.clone()))
    }

    // ─── User Stats ─────────────────────────────────────────────

    pub async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, AppError> {
        self.read_gate(collections::USER_STATS).await?;
        Ok(self.stats.get(user_id).map(|s| s.clone()))
    }

    pub async fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), AppError> {
        self.write_gate(collections::USER_STATS)?;
        self.stats.insert(stats.user_id.clone(), stats.clone());
        Ok(())
    }

    pub async fn apply_progress(&self, delta: &ProgressDelta) -> Result<UserStats, AppError> {
        self.write_gate(collections::USER_STATS)?;
        let mut entry = self
            .stats
            .entry(delta.user_id.clone())
            .or_insert_with(|| UserStats::empty(&delta.user_id));
        entry.apply(delta);
        Ok(entry.clone())
    }

    // ─── Targets ────────────────────────────────────────────────

    pub async fn get_target(&self, target_id: &str) -> Result<Option<Target>, AppError> {
        self.read_gate(collections::TARGETS).await?;
        Ok(self.targets.get(target_id).map(|t| t.clone()))
    }

    pub async fn insert_target(&self, target: &Target) -> Result<(), AppError> {
        self.write_gate(collections::TARGETS)?;
        self.targets.insert(target.id.clone(), target.clone());
        Ok(())
    }

    pub async fn list_targets(&self, offset: u32, limit: u32) -> Result<Vec<Target>, AppError> {
        let mut targets = self.all_targets().await?;
        targets.sort_by(|a, b| b.heat_index.total_cmp(&a.heat_index));
        Ok(targets
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    pub async fn list_targets_by_creator(
        &self,
        creator_id: &str,
    ) -> Result<Vec<Target>, AppError> {
        let mut targets: Vec<Target> = self
            .all_targets()
            .await?
            .into_iter()
            .filter(|t| t.creator_id == creator_id)
            .collect();
        targets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(targets)
    }

    pub async fn get_targets_by_ids(&self, ids: &[String]) -> Result<Vec<Target>, AppError> {
        self.read_gate(collections::TARGETS).await?;
        Ok(ids
            .iter()
            .filter_map(|id| self.targets.get(id).map(|t| t.clone()))
            .collect())
    }

    pub async fn all_targets(&self) -> Result<Vec<Target>, AppError> {
        self.read_gate(collections::TARGETS).await?;
        Ok(self.targets.iter().map(|t| t.value().clone()).collect())
    }

    pub async fn update_target_counters(
        &self,
        target_id: &str,
        counters: &TargetCounters,
    ) -> Result<(), AppError> {
        self.write_gate(collections::TARGETS)?;
        let mut target = self
            .targets
            .get_mut(target_id)
            .ok_or_else(|| AppError::NotFound(format!("target {}", target_id)))?;
        target.roast_count = counters.roast_count;
        target.total_likes = counters.total_likes;
        Ok(())
    }

    // ─── Comments ───────────────────────────────────────────────

    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.write_gate(collections::COMMENTS)?;
        self.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>, AppError> {
        self.read_gate(collections::COMMENTS).await?;
        Ok(self.comments.get(comment_id).map(|c| c.clone()))
    }

    pub async fn list_comments_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<Comment>, AppError> {
        self.filter_comments(|c| c.target_id == target_id).await
    }

    pub async fn list_comments_by_user(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Comment>, AppError> {
        let mut comments = self.filter_comments(|c| c.user_id == user_id).await?;
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            comments.truncate(limit as usize);
        }
        Ok(comments)
    }

    pub async fn set_comment_likes(&self, comment_id: &str, likes: u32) -> Result<(), AppError> {
        self.write_gate(collections::COMMENTS)?;
        let mut comment = self
            .comments
            .get_mut(comment_id)
            .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;
        comment.likes = likes;
        Ok(())
    }

    pub async fn list_comments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, AppError> {
        self.filter_comments(|c| c.created_at >= since).await
    }

    pub async fn top_comments(&self, limit: u32) -> Result<Vec<Comment>, AppError> {
        let mut comments = self.filter_comments(|_| true).await?;
        comments.sort_by(|a, b| b.likes.cmp(&a.likes));
        comments.truncate(limit as usize);
        Ok(comments)
    }

    async fn filter_comments<F>(&self, keep: F) -> Result<Vec<Comment>, AppError>
    where
        F: Fn(&Comment) -> bool,
    {
        self.read_gate(collections::COMMENTS).await?;
        Ok(self
            .comments
            .iter()
            .filter(|c| keep(c.value()))
            .map(|c| c.value().clone())
            .collect())
    }

    // ─── Badges ─────────────────────────────────────────────────

    pub async fn list_badges(&self) -> Result<Vec<Badge>, AppError> {
        self.read_gate(collections::BADGES).await?;
        let mut badges: Vec<Badge> = self.badges.iter().map(|b| b.value().clone()).collect();
        badges.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(badges)
    }

    pub async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, AppError> {
        self.read_gate(collections::USER_BADGES).await?;
        Ok(self
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.value().clone())
            .collect())
    }

    pub async fn upsert_user_badges(&self, rows: &[UserBadge]) -> Result<(), AppError> {
        self.write_gate(collections::USER_BADGES)?;
        for row in rows {
            self.user_badges.insert(row.doc_id(), row.clone());
        }
        Ok(())
    }

    // ─── Notifications ──────────────────────────────────────────

    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.write_gate(collections::NOTIFICATIONS)?;
        self.notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(())
    }

    pub async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        self.read_gate(collections::NOTIFICATIONS).await?;
        let mut rows: Vec<Notification> = self
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .map(|n| n.value().clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        self.read_gate(collections::NOTIFICATIONS).await?;
        Ok(self.notifications.get(id).map(|n| n.clone()))
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        self.write_gate(collections::NOTIFICATIONS)?;
        if let Some(mut row) = self.notifications.get_mut(id) {
            row.read = true;
        }
        Ok(())
    }

    // ─── Leaderboards ───────────────────────────────────────────

    pub async fn replace_leaderboard(
        &self,
        board: Leaderboard,
        entries: &[LeaderboardEntry],
    ) -> Result<(), AppError> {
        self.write_gate(board.collection())?;
        self.leaderboards.insert(board.collection(), entries.to_vec());
        Ok(())
    }

    pub async fn list_leaderboard(
        &self,
        board: Leaderboard,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        self.read_gate(board.collection()).await?;
        Ok(self
            .leaderboards
            .get(board.collection())
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_progress_creates_missing_row() {
        let db = MemoryDb::new();
        let stats = db
            .apply_progress(&ProgressDelta::for_user("u1").targets(1).exp(30))
            .await
            .unwrap();

        assert_eq!(stats.targets_created, 1);
        assert_eq!(stats.exp, 30);
        assert_eq!(db.get_user_stats("u1").await.unwrap(), Some(stats));
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let db = MemoryDb::new();
        db.fail_writes_to(collections::USER_STATS);

        let result = db.upsert_user_stats(&UserStats::empty("u1")).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        db.heal();
        assert!(db.upsert_user_stats(&UserStats::empty("u1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_badge_rows_unique_per_user_and_badge() {
        let db = MemoryDb::new();
        let row = UserBadge::unlocked("u1", "b7");
        db.upsert_user_badges(&[row.clone()]).await.unwrap();
        db.upsert_user_badges(&[row]).await.unwrap();

        assert_eq!(db.list_user_badges("u1").await.unwrap().len(), 1);
        assert_eq!(db.list_badges().await.unwrap().len(), 8);
    }
}
