// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Badge catalog and per-user unlock rows.

use serde::{Deserialize, Serialize};

/// A badge definition (`badges` collection).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    /// Human-readable unlock condition
    pub condition: String,
}

/// Unlock row, unique per (user, badge). Never flipped back to locked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
    pub user_id: String,
    pub badge_id: String,
    pub unlocked: bool,
}

impl UserBadge {
    pub fn unlocked(user_id: &str, badge_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            badge_id: badge_id.to_string(),
            unlocked: true,
        }
    }

    /// Document ID enforcing the (user, badge) uniqueness.
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.user_id, self.badge_id)
    }
}

/// Badge joined with the viewer's unlock state (profile page).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BadgeView {
    #[serde(flatten)]
    pub badge: Badge,
    pub unlocked: bool,
}

/// Catalog seeded into the in-memory store and used when the
/// `badges` collection is empty.
pub fn default_catalog() -> Vec<Badge> {
    [
        ("b1", "声优骂手", "🎙️", "发布语音骂评", "发布 1 条语音骂评"),
        ("b2", "有图有真相", "🖼️", "发布图片骂评", "发布 1 条图片骂评"),
        ("b3", "人气骂手", "🔥", "累计获赞 100", "获赞 ≥ 100"),
        ("b4", "骂坛传说", "👑", "累计获赞 1000", "获赞 ≥ 1000"),
        ("b5", "挂人达人", "🎯", "发布 10 个靶子", "发布靶子 ≥ 10"),
        ("b6", "键盘侠", "⌨️", "发布 100 条骂评", "骂评 ≥ 100"),
        ("b7", "初出茅庐", "🐣", "发布第一条骂评", "骂评 ≥ 1"),
        ("b8", "连骂七天", "📅", "连续 7 天发布骂评", "连续发布 7 天"),
    ]
    .into_iter()
    .map(|(id, name, icon, description, condition)| Badge {
        id: id.to_string(),
        name: name.to_string(),
        icon: icon.to_string(),
        description: description.to_string(),
        condition: condition.to_string(),
    })
    .collect()
}
