// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Derived statistics recomputed from comment and target rows.
//!
//! The counters stored on targets and in `user_stats` are caches. These
//! functions rebuild them from the rows of record.

use serde::Serialize;

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Comment, DerivedUserCounts, Target, TargetCounters, UserStats};

/// Counts and preview derived from a target's comments.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetAggregate {
    pub roast_count: u32,
    pub total_likes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_roast_preview: Option<String>,
}

impl TargetAggregate {
    pub fn from_comments(comments: &[Comment]) -> Self {
        let total_likes = comments.iter().map(|c| c.likes).sum();
        // Most liked wins; ties go to the newest.
        let top = comments
            .iter()
            .max_by(|a, b| a.likes.cmp(&b.likes).then(a.created_at.cmp(&b.created_at)));

        Self {
            roast_count: comments.len() as u32,
            total_likes,
            top_roast_preview: top.map(|c| c.content.clone()),
        }
    }

    pub fn counters(&self) -> TargetCounters {
        TargetCounters {
            roast_count: self.roast_count,
            total_likes: self.total_likes,
        }
    }
}

pub async fn target_aggregate(db: &Db, target_id: &str) -> Result<TargetAggregate, AppError> {
    let comments = db.list_comments_for_target(target_id).await?;
    Ok(TargetAggregate::from_comments(&comments))
}

/// Recompute a target's counters and write them back.
pub async fn refresh_target_counters(
    db: &Db,
    target_id: &str,
) -> Result<TargetAggregate, AppError> {
    let aggregate = target_aggregate(db, target_id).await?;
    db.update_target_counters(target_id, &aggregate.counters())
        .await?;
    Ok(aggregate)
}

/// Counts over rows already fetched for one user.
pub fn user_counts(targets: &[Target], comments: &[Comment]) -> DerivedUserCounts {
    DerivedUserCounts {
        targets_created: targets.len() as u32,
        roasts_posted: comments.len() as u32,
        likes_received: comments.iter().map(|c| c.likes).sum(),
    }
}

/// Recompute a user's counters from their targets and comments.
pub async fn user_aggregate(db: &Db, user_id: &str) -> Result<DerivedUserCounts, AppError> {
    let (targets, comments) = tokio::join!(
        db.list_targets_by_creator(user_id),
        db.list_comments_by_user(user_id, None)
    );
    Ok(user_counts(&targets?, &comments?))
}

/// Write derived counts into the user's stats row, if one exists.
///
/// `exp` is left as stored. Returns the updated row, or `None` when the
/// user has no stats row.
pub async fn write_back_user_counts(
    db: &Db,
    user_id: &str,
    counts: &DerivedUserCounts,
) -> Result<Option<UserStats>, AppError> {
    let Some(mut stats) = db.get_user_stats(user_id).await? else {
        return Ok(None);
    };
    stats.targets_created = counts.targets_created;
    stats.roasts_posted = counts.roasts_posted;
    stats.likes_received = counts.likes_received;
    db.upsert_user_stats(&stats).await?;
    Ok(Some(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RoastType;
    use chrono::{TimeZone, Utc};

    fn comment(id: &str, likes: u32, minute: u32) -> Comment {
        Comment {
            id: id.to_string(),
            target_id: "t1".to_string(),
            user_id: "u1".to_string(),
            user_name: "U".to_string(),
            user_avatar: String::new(),
            content: format!("content {}", id),
            kind: RoastType::Text,
            media_url: None,
            transcript: None,
            duration: None,
            likes,
            is_champion: false,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, minute, 0).unwrap(),
            reply_to_comment_id: None,
            reply_to_user_id: None,
            reply_to_user_name: None,
        }
    }

    #[test]
    fn test_counts_and_sum() {
        let aggregate =
            TargetAggregate::from_comments(&[comment("a", 2, 0), comment("b", 3, 1)]);
        assert_eq!(aggregate.roast_count, 2);
        assert_eq!(aggregate.total_likes, 5);
        assert_eq!(aggregate.top_roast_preview.as_deref(), Some("content b"));
    }

    #[test]
    fn test_top_preview_tie_goes_to_newest() {
        let aggregate =
            TargetAggregate::from_comments(&[comment("old", 4, 0), comment("new", 4, 9)]);
        assert_eq!(aggregate.top_roast_preview.as_deref(), Some("content new"));
    }

    #[test]
    fn test_empty_target() {
        assert_eq!(TargetAggregate::from_comments(&[]), TargetAggregate::default());
    }
}
