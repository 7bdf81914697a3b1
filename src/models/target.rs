// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Roast target model and the value normalization shared by manual posts
//! and AI-generated drafts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of tags kept on a target.
pub const MAX_TAGS: usize = 3;

/// A person posted to be roasted.
///
/// `roast_count` and `total_likes` are denormalized caches of the comment
/// rows; treat them as display hints only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    pub name: String,
    /// Category value, one of [`TargetType::ALL`] in canonical form
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub avatar_style: AvatarStyle,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub roast_count: u32,
    #[serde(default)]
    pub total_likes: u32,
    #[serde(default)]
    pub heat_index: f64,
    pub creator_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_roast_preview: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Denormalized counters written back onto a target.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TargetCounters {
    pub roast_count: u32,
    pub total_likes: u32,
}

/// Avatar presets offered when posting a target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AvatarStyle {
    SuitMan,
    CasualWoman,
    Uncle,
    FreshBoy,
    MatureWoman,
    #[default]
    Mystery,
}

impl AvatarStyle {
    pub const ALL: [AvatarStyle; 6] = [
        AvatarStyle::SuitMan,
        AvatarStyle::CasualWoman,
        AvatarStyle::Uncle,
        AvatarStyle::FreshBoy,
        AvatarStyle::MatureWoman,
        AvatarStyle::Mystery,
    ];

    pub fn id(self) -> &'static str {
        match self {
            AvatarStyle::SuitMan => "suit-man",
            AvatarStyle::CasualWoman => "casual-woman",
            AvatarStyle::Uncle => "uncle",
            AvatarStyle::FreshBoy => "fresh-boy",
            AvatarStyle::MatureWoman => "mature-woman",
            AvatarStyle::Mystery => "mystery",
        }
    }

    /// Match a free-form id, falling back to `mystery`.
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self::ALL
            .into_iter()
            .find(|style| style.id() == trimmed)
            .unwrap_or(AvatarStyle::Mystery)
    }
}

/// The eight target categories: (stored value, English label).
pub struct TargetType;

impl TargetType {
    pub const ALL: [(&'static str, &'static str); 8] = [
        ("领导", "Boss"),
        ("同事", "Coworker"),
        ("前任", "Ex"),
        ("室友", "Roommate"),
        ("甲方", "Client"),
        ("亲戚", "Relative"),
        ("陌生人", "Stranger"),
        ("其他", "Other"),
    ];

    pub const OTHER: &'static str = "其他";

    /// Map a value or English label to the stored value, defaulting to "其他".
    pub fn normalize(raw: &str) -> &'static str {
        let trimmed = raw.trim();
        Self::ALL
            .iter()
            .find(|(value, en)| *value == trimmed || en.eq_ignore_ascii_case(trimmed))
            .map(|(value, _)| *value)
            .unwrap_or(Self::OTHER)
    }
}

/// Trim, drop empties, keep the first [`MAX_TAGS`], and `#`-prefix each tag.
pub fn normalize_tags<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|tag| tag.as_ref().trim().to_string())
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .map(|tag| {
            if tag.starts_with('#') {
                tag
            } else {
                format!("#{}", tag)
            }
        })
        .collect()
}

/// Split a comma/whitespace separated tag string.
pub fn split_tag_string(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == '，' || c.is_whitespace())
        .map(str::to_string)
        .collect()
}

/// Deterministic persona avatar for a target.
pub fn persona_avatar_url(name: &str, kind: &str, tags: &[String], description: &str) -> String {
    let description_head: String = description.chars().take(24).collect();
    let seed = format!("{}-{}-{}-{}", name, kind, tags.join("-"), description_head);
    format!(
        "https://api.dicebear.com/7.x/personas/png?seed={}&size=400&backgroundColor=b6e3f4,c0aede,ffd5dc,d1d4f9,fde68a",
        urlencoding::encode(&seed)
    )
}
