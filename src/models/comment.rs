// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Roast comment model and thread assembly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Media kind of a roast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoastType {
    #[default]
    Text,
    Image,
    Audio,
}

/// A roast attached to a target. Replies are flat: a reply only records
/// which comment (and user) it answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub target_id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub user_avatar: String,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: RoastType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    /// Audio length in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub is_champion: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_comment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_user_name: Option<String>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.reply_to_comment_id.is_some()
    }
}

/// Ordering of a comment list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    /// Most liked first
    #[default]
    Hot,
    /// Newest first
    New,
}

impl CommentSort {
    pub fn sort(self, comments: &mut [Comment]) {
        match self {
            CommentSort::Hot => comments.sort_by(|a, b| b.likes.cmp(&a.likes)),
            CommentSort::New => comments.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}

/// Comments of one target split into top-level roasts and reply lists.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub comments: Vec<Comment>,
    /// Replies keyed by the comment they answer, in the same order as `comments`
    pub replies: HashMap<String, Vec<Comment>>,
}

impl CommentThread {
    /// Sort once, then route every reply under its parent id.
    pub fn build(mut all: Vec<Comment>, sort: CommentSort) -> Self {
        sort.sort(&mut all);

        let mut thread = CommentThread::default();
        for comment in all {
            match comment.reply_to_comment_id.clone() {
                Some(parent_id) => thread.replies.entry(parent_id).or_default().push(comment),
                None => thread.comments.push(comment),
            }
        }
        thread
    }
}
