// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-user progression counters.
//!
//! Stored at: `user_stats/{user_id}`. Mutated only through
//! [`UserStats::apply`], which the store runs as one atomic step.

use serde::{Deserialize, Serialize};

/// Progression counters for a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub user_id: String,
    #[serde(default)]
    pub targets_created: u32,
    #[serde(default)]
    pub roasts_posted: u32,
    #[serde(default)]
    pub likes_received: u32,
    #[serde(default)]
    pub exp: u32,
}

impl UserStats {
    /// Zeroed row for a freshly onboarded user.
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    /// Add a delta to the counters. Saturates rather than wrapping.
    pub fn apply(&mut self, delta: &ProgressDelta) {
        self.targets_created = self.targets_created.saturating_add(delta.targets_created);
        self.roasts_posted = self.roasts_posted.saturating_add(delta.roasts_posted);
        self.likes_received = self.likes_received.saturating_add(delta.likes_received);
        self.exp = self.exp.saturating_add(delta.exp);
    }
}

/// Increments applied by one action. Absent fields are zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub user_id: String,
    #[serde(default)]
    pub targets_created: u32,
    #[serde(default)]
    pub roasts_posted: u32,
    #[serde(default)]
    pub likes_received: u32,
    #[serde(default)]
    pub exp: u32,
}

impl ProgressDelta {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    pub fn targets(mut self, n: u32) -> Self {
        self.targets_created = n;
        self
    }

    pub fn roasts(mut self, n: u32) -> Self {
        self.roasts_posted = n;
        self
    }

    pub fn likes_received(mut self, n: u32) -> Self {
        self.likes_received = n;
        self
    }

    pub fn exp(mut self, n: u32) -> Self {
        self.exp = n;
        self
    }
}

/// Counters recomputed from targets and comment rows.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedUserCounts {
    pub targets_created: u32,
    pub roasts_posted: u32,
    pub likes_received: u32,
}
