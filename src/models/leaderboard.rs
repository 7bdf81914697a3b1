// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Materialized leaderboard rows.

use serde::{Deserialize, Serialize};

use crate::db::collections;

/// The three boards shown on the leaderboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaderboard {
    /// Most liked roast of the last 24 hours
    Daily,
    /// Top 10 roasts by likes
    Top,
    /// Top 3 targets by total likes
    HallOfFame,
}

impl Leaderboard {
    pub const ALL: [Leaderboard; 3] = [Leaderboard::Daily, Leaderboard::Top, Leaderboard::HallOfFame];

    pub fn collection(self) -> &'static str {
        match self {
            Leaderboard::Daily => collections::LEADERBOARD_DAILY,
            Leaderboard::Top => collections::LEADERBOARD_TOP,
            Leaderboard::HallOfFame => collections::LEADERBOARD_HOF,
        }
    }

    pub fn limit(self) -> usize {
        match self {
            Leaderboard::Daily => 1,
            Leaderboard::Top => 10,
            Leaderboard::HallOfFame => 3,
        }
    }
}

/// One ranked row. `subject_id` is a comment id, or a target id for the
/// hall of fame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based rank, also the document ID
    pub rank: u32,
    pub subject_id: String,
    pub target_id: String,
    pub title: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub avatar: String,
    pub likes: u32,
}
