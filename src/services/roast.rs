// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Page-level actions: posting targets and roasts, likes, and the reads
//! behind the home feed, detail page and profile page.
//!
//! Every write follows the same chain, strictly in order and without
//! rollback: validate, write the primary row, refresh the derived
//! counters, then hand progression, badges and notifications to
//! [`SideEffects`].

use chrono::Utc;
use dashmap::DashSet;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::db::Db;
use crate::error::AppError;
use crate::models::target::{normalize_tags, persona_avatar_url};
use crate::models::{
    AppUser, AvatarStyle, BadgeView, Comment, CommentSort, CommentThread, ProgressDelta,
    PublicUser, RoastType, Target, TargetCounters, TargetType, UserStats,
};
use crate::services::aggregate::{self, TargetAggregate};
use crate::services::moderation::{contains_profanity, validate_clean, validate_clean_all, PROFANITY_MESSAGE};
use crate::services::notify;
use crate::services::outbox::{SideEffect, SideEffects};
use crate::services::progression::ExpRules;
use crate::services::storage::BlobStore;

/// Targets per feed page.
pub const PAGE_SIZE: u32 = 12;
/// Comments shown on the profile page.
pub const RECENT_COMMENTS: u32 = 20;
/// Content stored for a voice roast without a transcript.
pub const AUDIO_LABEL: &str = "[语音骂评]";
pub const AUDIO_CONTENT_TYPE: &str = "audio/webm";

// ─── Requests ────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTarget {
    #[validate(
        length(max = 40, message = "名字太长了"),
        custom(function = "validate_clean")
    )]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    #[validate(
        length(max = 200, message = "描述不能超过 200 字"),
        custom(function = "validate_clean")
    )]
    pub description: String,
    #[serde(default)]
    pub avatar_style: String,
    #[serde(default)]
    #[validate(custom(function = "validate_clean_all"))]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[validate(
        length(max = 500, message = "骂评不能超过 500 字"),
        custom(function = "validate_clean")
    )]
    pub content: String,
    #[serde(default)]
    pub reply_to_comment_id: Option<String>,
}

/// A recorded voice roast.
#[derive(Debug, Clone, Default)]
pub struct NewAudioComment {
    pub audio: Vec<u8>,
    pub transcript: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    pub reply_to_comment_id: Option<String>,
}

// ─── Responses ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub comment_id: String,
    pub likes: u32,
    /// Counters written back to the target, when the refresh succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetCounters>,
    pub already_liked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadView {
    pub target: Target,
    #[serde(flatten)]
    pub thread: CommentThread,
    pub roast_count: u32,
    pub total_likes: u32,
}

/// Home page ordering.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedTab {
    #[default]
    Hot,
    New,
    Champ,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub targets: Vec<Target>,
    pub page: u32,
    pub has_more: bool,
}

impl FeedPage {
    pub fn empty(page: u32) -> Self {
        Self {
            targets: Vec::new(),
            page,
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentComment {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileOverview {
    pub user: AppUser,
    pub badges: Vec<BadgeView>,
    pub recent_comments: Vec<RecentComment>,
    pub targets: Vec<Target>,
}

// ─── Service ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RoastService {
    db: Db,
    effects: SideEffects,
    blobs: BlobStore,
    /// (liker id, comment id) pairs liked during this process lifetime
    liked: Arc<DashSet<(String, String)>>,
}

impl RoastService {
    pub fn new(db: Db, effects: SideEffects, blobs: BlobStore) -> Self {
        Self {
            db,
            effects,
            blobs,
            liked: Arc::new(DashSet::new()),
        }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Post a new target on behalf of `actor`.
    pub async fn create_target(&self, actor: &AppUser, req: NewTarget) -> Result<Target, AppError> {
        req.validate()?;

        let name = req.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("请填写要骂的人".to_string()));
        }

        let kind = TargetType::normalize(&req.kind);
        let mut tags = normalize_tags(&req.tags);
        if tags.is_empty() {
            tags.push(format!("#{}", kind));
        }
        let description = req.description.trim().to_string();

        let target = Target {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            avatar_style: AvatarStyle::normalize(&req.avatar_style),
            avatar_url: persona_avatar_url(name, kind, &tags, &description),
            description,
            tags,
            roast_count: 0,
            total_likes: 0,
            heat_index: 0.0,
            creator_id: actor.id().to_string(),
            top_roast_preview: None,
            created_at: Utc::now(),
        };

        self.db.insert_target(&target).await?;
        tracing::info!(user_id = %actor.id(), target_id = %target.id, "Target posted");

        self.effects
            .dispatch(vec![
                SideEffect::ApplyProgress(
                    ProgressDelta::for_user(actor.id())
                        .targets(1)
                        .exp(ExpRules::POST),
                ),
                SideEffect::sync_badges(actor.id()),
            ])
            .await;

        Ok(target)
    }

    /// Post a text roast, optionally as a reply to another roast on the
    /// same target.
    pub async fn post_comment(
        &self,
        actor: &AppUser,
        target_id: &str,
        req: NewComment,
    ) -> Result<Comment, AppError> {
        req.validate()?;

        let content = req.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("骂评内容不能为空".to_string()));
        }

        let target = self.require_target(target_id).await?;
        let mut comment = self.new_comment(actor, target_id, content.to_string(), RoastType::Text);
        self.attach_reply(&mut comment, req.reply_to_comment_id.as_deref())
            .await?;

        self.publish_comment(&target, comment).await
    }

    /// Upload a recording and post it as a voice roast.
    pub async fn post_audio_comment(
        &self,
        actor: &AppUser,
        target_id: &str,
        req: NewAudioComment,
    ) -> Result<Comment, AppError> {
        if req.audio.is_empty() {
            return Err(AppError::Validation("录音为空，请重新录制".to_string()));
        }
        let transcript = req
            .transcript
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if transcript.as_deref().is_some_and(contains_profanity) {
            return Err(AppError::Validation(PROFANITY_MESSAGE.to_string()));
        }

        let target = self.require_target(target_id).await?;

        let content = transcript.clone().unwrap_or_else(|| AUDIO_LABEL.to_string());
        let mut comment = self.new_comment(actor, target_id, content, RoastType::Audio);
        self.attach_reply(&mut comment, req.reply_to_comment_id.as_deref())
            .await?;

        let path = format!("{}/{}.webm", actor.id(), comment.id);
        self.blobs
            .upload(&path, req.audio, AUDIO_CONTENT_TYPE, true)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %actor.id(), error = %e, "Audio upload failed");
                AppError::Upstream("语音上传失败，请重试".to_string())
            })?;

        comment.media_url = Some(self.blobs.public_url(&path));
        comment.transcript = transcript;
        comment.duration = req.duration;

        self.publish_comment(&target, comment).await
    }

    fn new_comment(
        &self,
        actor: &AppUser,
        target_id: &str,
        content: String,
        kind: RoastType,
    ) -> Comment {
        Comment {
            id: Uuid::new_v4().to_string(),
            target_id: target_id.to_string(),
            user_id: actor.id().to_string(),
            user_name: actor.profile.name.clone(),
            user_avatar: actor.profile.avatar.clone(),
            content,
            kind,
            media_url: None,
            transcript: None,
            duration: None,
            likes: 0,
            is_champion: false,
            created_at: Utc::now(),
            reply_to_comment_id: None,
            reply_to_user_id: None,
            reply_to_user_name: None,
        }
    }

    async fn require_target(&self, target_id: &str) -> Result<Target, AppError> {
        self.db
            .get_target(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("target {}", target_id)))
    }

    /// Fill the reply fields from the parent, which must be on the same target.
    async fn attach_reply(
        &self,
        comment: &mut Comment,
        parent_id: Option<&str>,
    ) -> Result<(), AppError> {
        let Some(parent_id) = parent_id.filter(|id| !id.is_empty()) else {
            return Ok(());
        };

        let parent = self
            .db
            .get_comment(parent_id)
            .await?
            .filter(|p| p.target_id == comment.target_id)
            .ok_or_else(|| AppError::BadRequest(format!("reply target {} not found", parent_id)))?;

        comment.reply_to_comment_id = Some(parent.id);
        comment.reply_to_user_id = Some(parent.user_id);
        comment.reply_to_user_name = Some(parent.user_name);
        Ok(())
    }

    /// Insert, progression, counters, notifications.
    async fn publish_comment(&self, target: &Target, comment: Comment) -> Result<Comment, AppError> {
        self.db.insert_comment(&comment).await?;
        tracing::info!(
            user_id = %comment.user_id,
            target_id = %target.id,
            comment_id = %comment.id,
            "Roast posted"
        );

        self.effects
            .dispatch(vec![
                SideEffect::ApplyProgress(
                    ProgressDelta::for_user(&comment.user_id)
                        .roasts(1)
                        .exp(ExpRules::COMMENT),
                ),
                SideEffect::sync_badges(&comment.user_id),
            ])
            .await;

        if let Err(e) = aggregate::refresh_target_counters(&self.db, &target.id).await {
            // Fall back to bumping the count we already read. Not reverted.
            tracing::warn!(target_id = %target.id, error = %e, "Counter refresh failed");
            let bumped = TargetCounters {
                roast_count: target.roast_count + 1,
                total_likes: target.total_likes,
            };
            if let Err(e) = self.db.update_target_counters(&target.id, &bumped).await {
                tracing::warn!(target_id = %target.id, error = %e, "Counter bump failed");
            }
        }

        let notifications = notify::comment_notifications(Some(target), &comment)
            .into_iter()
            .map(SideEffect::Notify)
            .collect();
        self.effects.dispatch(notifications).await;

        Ok(comment)
    }

    /// Like a comment. A repeat like by the same user is a no-op.
    pub async fn like(&self, liker: &AppUser, comment_id: &str) -> Result<LikeOutcome, AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;

        let key = (liker.id().to_string(), comment_id.to_string());
        if !self.liked.insert(key.clone()) {
            return Ok(LikeOutcome {
                comment_id: comment.id,
                likes: comment.likes,
                target: None,
                already_liked: true,
            });
        }

        let likes = comment.likes + 1;
        if let Err(e) = self.db.set_comment_likes(comment_id, likes).await {
            self.liked.remove(&key);
            tracing::warn!(
                comment_id,
                likes = comment.likes,
                error = %e,
                "Like write failed, rolled back"
            );
            return Err(e);
        }

        let mut outcome = LikeOutcome {
            comment_id: comment.id.clone(),
            likes,
            target: None,
            already_liked: false,
        };

        let aggregate = match aggregate::target_aggregate(&self.db, &comment.target_id).await {
            Ok(aggregate) => aggregate,
            Err(e) => {
                tracing::warn!(target_id = %comment.target_id, error = %e, "Like aggregate failed");
                return Ok(outcome);
            }
        };

        let counters = aggregate.counters();
        match self
            .db
            .update_target_counters(&comment.target_id, &counters)
            .await
        {
            Ok(()) => outcome.target = Some(counters),
            Err(e) => {
                tracing::warn!(target_id = %comment.target_id, error = %e, "Counter write failed")
            }
        }

        let mut effects = vec![
            SideEffect::ApplyProgress(ProgressDelta::for_user(liker.id()).exp(ExpRules::LIKE)),
            SideEffect::sync_badges(liker.id()),
        ];
        if let Some(notification) =
            notify::like_notification(&comment, liker.id(), &liker.profile.name)
        {
            effects.push(SideEffect::ApplyProgress(
                ProgressDelta::for_user(&comment.user_id)
                    .likes_received(1)
                    .exp(ExpRules::RECEIVED_LIKE),
            ));
            effects.push(SideEffect::sync_badges(&comment.user_id));
            effects.push(SideEffect::Notify(notification));
        }
        self.effects.dispatch(effects).await;

        Ok(outcome)
    }

    /// A target with its comments split into roasts and replies.
    pub async fn thread(&self, target_id: &str, sort: CommentSort) -> Result<ThreadView, AppError> {
        let (target, comments) = tokio::join!(
            self.require_target(target_id),
            self.db.list_comments_for_target(target_id)
        );
        let target = target?;
        let comments = comments?;

        let aggregate = TargetAggregate::from_comments(&comments);
        Ok(ThreadView {
            target,
            thread: CommentThread::build(comments, sort),
            roast_count: aggregate.roast_count,
            total_likes: aggregate.total_likes,
        })
    }

    /// One page of the home feed.
    pub async fn feed(&self, tab: FeedTab, page: u32) -> Result<FeedPage, AppError> {
        if !self.db.is_configured() {
            return Ok(FeedPage::empty(page));
        }

        let rows = self
            .db
            .list_targets(page.saturating_mul(PAGE_SIZE), PAGE_SIZE)
            .await?;
        let has_more = rows.len() >= PAGE_SIZE as usize;

        let mut targets = join_all(rows.into_iter().map(|target| self.enrich(target))).await;

        match tab {
            FeedTab::Hot => targets.sort_by(|a, b| b.heat_index.total_cmp(&a.heat_index)),
            FeedTab::New => targets.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            FeedTab::Champ => targets.sort_by(|a, b| b.total_likes.cmp(&a.total_likes)),
        }

        Ok(FeedPage {
            targets,
            page,
            has_more,
        })
    }

    /// Replace cached counters with derived ones; keep the cache on error.
    async fn enrich(&self, mut target: Target) -> Target {
        match aggregate::target_aggregate(&self.db, &target.id).await {
            Ok(aggregate) => {
                target.roast_count = aggregate.roast_count;
                target.total_likes = aggregate.total_likes;
                target.top_roast_preview = aggregate.top_roast_preview;
            }
            Err(e) => {
                tracing::warn!(target_id = %target.id, error = %e, "Feed enrichment failed")
            }
        }
        target
    }

    /// Everything the profile page shows for `user`.
    ///
    /// Counters are recomputed from rows and written back when a stats row
    /// exists.
    pub async fn profile_overview(&self, user: &AppUser) -> Result<ProfileOverview, AppError> {
        let user_id = user.id();
        let (profile, counts, catalog, unlocked, targets, recent) = tokio::join!(
            self.db.get_profile(user_id),
            aggregate::user_aggregate(&self.db, user_id),
            self.db.list_badges(),
            self.db.list_user_badges(user_id),
            self.db.list_targets_by_creator(user_id),
            self.db.list_comments_by_user(user_id, Some(RECENT_COMMENTS))
        );

        let profile = profile?.unwrap_or_else(|| user.profile.clone());
        let counts = counts?;
        let recent = recent?;

        let stats = match aggregate::write_back_user_counts(&self.db, user_id, &counts).await {
            Ok(Some(stats)) => stats,
            Ok(None) => UserStats {
                user_id: user_id.to_string(),
                targets_created: counts.targets_created,
                roasts_posted: counts.roasts_posted,
                likes_received: counts.likes_received,
                exp: user.stats.exp,
            },
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Stats write-back failed");
                user.stats.clone()
            }
        };

        let unlocked_ids: HashSet<String> = unlocked?
            .into_iter()
            .filter(|b| b.unlocked)
            .map(|b| b.badge_id)
            .collect();
        let badges: Vec<BadgeView> = catalog?
            .into_iter()
            .map(|badge| BadgeView {
                unlocked: unlocked_ids.contains(&badge.id),
                badge,
            })
            .collect();

        let target_ids: Vec<String> = recent
            .iter()
            .map(|c| c.target_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let names: HashMap<String, String> = self
            .db
            .get_targets_by_ids(&target_ids)
            .await?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let recent_comments = recent
            .into_iter()
            .map(|comment| RecentComment {
                target_name: names.get(&comment.target_id).cloned(),
                comment,
            })
            .collect();

        let mut badge_ids: Vec<String> = unlocked_ids.into_iter().collect();
        badge_ids.sort();

        Ok(ProfileOverview {
            user: AppUser {
                profile,
                stats,
                badges: badge_ids,
            },
            badges,
            recent_comments,
            targets: targets?,
        })
    }

    /// Public card for a comment's author, falling back to the name and
    /// avatar stored on the comment.
    pub async fn comment_author(&self, comment_id: &str) -> Result<PublicUser, AppError> {
        let comment = self
            .db
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;

        match self.db.get_public_user(&comment.user_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Ok(fallback_author(&comment)),
            Err(e) => {
                tracing::warn!(user_id = %comment.user_id, error = %e, "Public profile read failed");
                Ok(fallback_author(&comment))
            }
        }
    }
}

fn fallback_author(comment: &Comment) -> PublicUser {
    PublicUser {
        id: comment.user_id.clone(),
        name: comment.user_name.clone(),
        avatar: comment.user_avatar.clone(),
        quote: None,
        level: None,
    }
}
