// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Comment,
    Like,
}

/// Message addressed to `user_id`. Only `read` changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    /// Recipient
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub target_id: String,
    pub comment_id: String,
    pub actor_id: String,
    pub actor_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}
