// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Notification emission and the inbox.
//!
//! Recipients are decided here; delivery goes through the side-effect
//! pipeline like every other post-action write.

use chrono::Utc;
use uuid::Uuid;

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Comment, Notification, NotificationKind, Target};

fn notification(
    recipient: &str,
    kind: NotificationKind,
    comment: &Comment,
    actor_id: &str,
    actor_name: &str,
) -> Notification {
    Notification {
        id: Uuid::new_v4().to_string(),
        user_id: recipient.to_string(),
        kind,
        target_id: comment.target_id.clone(),
        comment_id: comment.id.clone(),
        actor_id: actor_id.to_string(),
        actor_name: actor_name.to_string(),
        created_at: Utc::now(),
        read: false,
    }
}

/// Notifications for a newly inserted comment.
///
/// The target's creator and the replied-to user each get one, unless they
/// are the commenter. Both can address the same person.
pub fn comment_notifications(target: Option<&Target>, comment: &Comment) -> Vec<Notification> {
    let mut out = Vec::new();

    if let Some(creator) = target.map(|t| t.creator_id.as_str()) {
        if !creator.is_empty() && creator != comment.user_id {
            out.push(notification(
                creator,
                NotificationKind::Comment,
                comment,
                &comment.user_id,
                &comment.user_name,
            ));
        }
    }

    if let Some(reply_to) = comment.reply_to_user_id.as_deref() {
        if reply_to != comment.user_id {
            out.push(notification(
                reply_to,
                NotificationKind::Comment,
                comment,
                &comment.user_id,
                &comment.user_name,
            ));
        }
    }

    out
}

/// Notification for a like, or `None` for a self-like.
pub fn like_notification(
    comment: &Comment,
    liker_id: &str,
    liker_name: &str,
) -> Option<Notification> {
    (comment.user_id != liker_id).then(|| {
        notification(
            &comment.user_id,
            NotificationKind::Like,
            comment,
            liker_id,
            liker_name,
        )
    })
}

pub async fn list_for_user(db: &Db, user_id: &str) -> Result<Vec<Notification>, AppError> {
    db.list_notifications(user_id).await
}

/// Open a notification: load its target and, if the target exists, mark
/// the notification read.
pub async fn open(db: &Db, user_id: &str, notification_id: &str) -> Result<Target, AppError> {
    let row = db
        .get_notification(notification_id)
        .await?
        .filter(|n| n.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("notification {}", notification_id)))?;

    let target = db
        .get_target(&row.target_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("target {}", row.target_id)))?;

    if !row.read {
        db.mark_notification_read(notification_id).await?;
    }
    Ok(target)
}
