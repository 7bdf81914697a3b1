// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

use crate::models::UserStats;

/// Profile row stored in `app_users` (document ID = auth user id).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Avatar URL
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub quote: String,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Email address (may be empty if the provider did not share it)
    #[serde(default)]
    pub email: String,
}

fn default_level() -> u32 {
    1
}

impl Profile {
    /// A profile without a name or quote still needs onboarding.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.quote.trim().is_empty()
    }
}

/// Publicly readable subset of a profile (`public_users`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

impl From<&Profile> for PublicUser {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            avatar: profile.avatar.clone(),
            quote: Some(profile.quote.clone()),
            level: Some(profile.level),
        }
    }
}

/// Signed-in user as held by the session: profile plus progression.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    #[serde(flatten)]
    pub profile: Profile,
    pub stats: UserStats,
    /// Unlocked badge ids
    pub badges: Vec<String>,
}

impl AppUser {
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}
