// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod badge;
pub mod comment;
pub mod leaderboard;
pub mod notification;
pub mod stats;
pub mod target;
pub mod user;

pub use badge::{Badge, BadgeView, UserBadge};
pub use comment::{Comment, CommentSort, CommentThread, RoastType};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use notification::{Notification, NotificationKind};
pub use stats::{DerivedUserCounts, ProgressDelta, UserStats};
pub use target::{AvatarStyle, Target, TargetCounters, TargetType};
pub use user::{AppUser, Profile, PublicUser};
