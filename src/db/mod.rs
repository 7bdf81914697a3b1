// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Database layer.
//!
//! [`Db`] fronts two interchangeable backends: Cloud Firestore for
//! deployments and an in-process store for local runs and tests. Both
//! expose the same typed operations.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    Badge, Comment, Leaderboard, LeaderboardEntry, Notification, Profile, ProgressDelta,
    PublicUser, Target, TargetCounters, UserBadge, UserStats,
};

/// Collection names as constants.
pub mod collections {
    pub const APP_USERS: &str = "app_users";
    pub const PUBLIC_USERS: &str = "public_users";
    /// Progression counters (keyed by user id)
    pub const USER_STATS: &str = "user_stats";
    pub const TARGETS: &str = "roast_targets";
    pub const COMMENTS: &str = "roast_comments";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const BADGES: &str = "badges";
    /// Unlock rows keyed by `{user_id}_{badge_id}`
    pub const USER_BADGES: &str = "user_badges";
    pub const LEADERBOARD_DAILY: &str = "leaderboard_daily";
    pub const LEADERBOARD_TOP: &str = "leaderboard_top";
    pub const LEADERBOARD_HOF: &str = "leaderboard_hof";
}

/// Store handle shared by every service.
#[derive(Clone)]
pub enum Db {
    Firestore(FirestoreDb),
    Memory(MemoryDb),
}

macro_rules! dispatch {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Db::Firestore(db) => db.$method($($arg),*).await,
            Db::Memory(db) => db.$method($($arg),*).await,
        }
    };
}

impl Db {
    /// False when running without store credentials (reads empty, writes refused).
    pub fn is_configured(&self) -> bool {
        match self {
            Db::Firestore(db) => db.is_connected(),
            Db::Memory(_) => true,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Db::Firestore(db) if db.is_connected() => "firestore",
            Db::Firestore(_) => "unconfigured",
            Db::Memory(_) => "memory",
        }
    }

    /// In-memory backend, if that is what this handle wraps (tests).
    pub fn as_memory(&self) -> Option<&MemoryDb> {
        match self {
            Db::Memory(db) => Some(db),
            Db::Firestore(_) => None,
        }
    }

    // ─── Profiles ───────────────────────────────────────────────

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        dispatch!(self, get_profile(user_id))
    }

    /// Write the profile row and its public projection.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        dispatch!(self, upsert_profile(profile))
    }

    pub async fn get_public_user(&self, user_id: &str) -> Result<Option<PublicUser>, AppError> {
        dispatch!(self, get_public_user(user_id))
    }

    // ─── User Stats ─────────────────────────────────────────────

    pub async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, AppError> {
        dispatch!(self, get_user_stats(user_id))
    }

    pub async fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), AppError> {
        dispatch!(self, upsert_user_stats(stats))
    }

    /// Atomically add a delta to a user's counters, creating the row if
    /// missing. Returns the updated row.
    pub async fn apply_progress(&self, delta: &ProgressDelta) -> Result<UserStats, AppError> {
        dispatch!(self, apply_progress(delta))
    }

    // ─── Targets ────────────────────────────────────────────────

    pub async fn get_target(&self, target_id: &str) -> Result<Option<Target>, AppError> {
        dispatch!(self, get_target(target_id))
    }

    pub async fn insert_target(&self, target: &Target) -> Result<(), AppError> {
        dispatch!(self, insert_target(target))
    }

    /// Targets ordered by heat index, highest first.
    pub async fn list_targets(&self, offset: u32, limit: u32) -> Result<Vec<Target>, AppError> {
        dispatch!(self, list_targets(offset, limit))
    }

    /// Targets created by a user, newest first.
    pub async fn list_targets_by_creator(
        &self,
        creator_id: &str,
    ) -> Result<Vec<Target>, AppError> {
        dispatch!(self, list_targets_by_creator(creator_id))
    }

    pub async fn get_targets_by_ids(&self, ids: &[String]) -> Result<Vec<Target>, AppError> {
        dispatch!(self, get_targets_by_ids(ids))
    }

    pub async fn all_targets(&self) -> Result<Vec<Target>, AppError> {
        dispatch!(self, all_targets())
    }

    pub async fn update_target_counters(
        &self,
        target_id: &str,
        counters: &TargetCounters,
    ) -> Result<(), AppError> {
        dispatch!(self, update_target_counters(target_id, counters))
    }

    // ─── Comments ───────────────────────────────────────────────

    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        dispatch!(self, insert_comment(comment))
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>, AppError> {
        dispatch!(self, get_comment(comment_id))
    }

    /// Every comment (replies included) of a target, unordered.
    pub async fn list_comments_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<Comment>, AppError> {
        dispatch!(self, list_comments_for_target(target_id))
    }

    /// A user's comments, newest first.
    pub async fn list_comments_by_user(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Comment>, AppError> {
        dispatch!(self, list_comments_by_user(user_id, limit))
    }

    pub async fn set_comment_likes(&self, comment_id: &str, likes: u32) -> Result<(), AppError> {
        dispatch!(self, set_comment_likes(comment_id, likes))
    }

    pub async fn list_comments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, AppError> {
        dispatch!(self, list_comments_since(since))
    }

    /// Most liked comments overall.
    pub async fn top_comments(&self, limit: u32) -> Result<Vec<Comment>, AppError> {
        dispatch!(self, top_comments(limit))
    }

    // ─── Badges ─────────────────────────────────────────────────

    pub async fn list_badges(&self) -> Result<Vec<Badge>, AppError> {
        dispatch!(self, list_badges())
    }

    pub async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, AppError> {
        dispatch!(self, list_user_badges(user_id))
    }

    /// Upsert unlock rows keyed on (user, badge).
    pub async fn upsert_user_badges(&self, rows: &[UserBadge]) -> Result<(), AppError> {
        dispatch!(self, upsert_user_badges(rows))
    }

    // ─── Notifications ──────────────────────────────────────────

    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        dispatch!(self, insert_notification(notification))
    }

    /// Notifications addressed to a user, newest first.
    pub async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        dispatch!(self, list_notifications(user_id))
    }

    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        dispatch!(self, get_notification(id))
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        dispatch!(self, mark_notification_read(id))
    }

    // ─── Leaderboards ───────────────────────────────────────────

    /// Replace the rows of a board with `entries` (already ranked).
    pub async fn replace_leaderboard(
        &self,
        board: Leaderboard,
        entries: &[LeaderboardEntry],
    ) -> Result<(), AppError> {
        dispatch!(self, replace_leaderboard(board, entries))
    }

    pub async fn list_leaderboard(
        &self,
        board: Leaderboard,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        dispatch!(self, list_leaderboard(board))
    }
}
