// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at the emulator.

use chrono::Utc;
use roast_board::models::{
    AvatarStyle, Comment, Leaderboard, LeaderboardEntry, Profile, ProgressDelta, RoastType,
    Target, TargetCounters,
};

mod common;
use common::test_db;

fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

fn test_target(id: &str, creator: &str) -> Target {
    Target {
        id: id.to_string(),
        name: "张总".to_string(),
        kind: "甲方".to_string(),
        description: "改稿".to_string(),
        tags: vec!["#甲方".to_string()],
        avatar_style: AvatarStyle::SuitMan,
        avatar_url: String::new(),
        roast_count: 0,
        total_likes: 0,
        heat_index: 0.0,
        creator_id: creator.to_string(),
        top_roast_preview: None,
        created_at: Utc::now(),
    }
}

fn test_comment(id: &str, target_id: &str, user_id: &str) -> Comment {
    Comment {
        id: id.to_string(),
        target_id: target_id.to_string(),
        user_id: user_id.to_string(),
        user_name: "测试".to_string(),
        user_avatar: String::new(),
        content: "骂一句".to_string(),
        kind: RoastType::Text,
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

#[tokio::test]
async fn test_profile_and_public_projection() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    assert!(db.get_profile(&user_id).await.unwrap().is_none());

    let profile = Profile {
        id: user_id.clone(),
        name: "测试用户".to_string(),
        avatar: "https://example.com/a.png".to_string(),
        quote: "签名".to_string(),
        level: 1,
        email: "t@example.com".to_string(),
    };
    db.upsert_profile(&profile).await.unwrap();

    assert_eq!(db.get_profile(&user_id).await.unwrap(), Some(profile));
    let public = db.get_public_user(&user_id).await.unwrap().unwrap();
    assert_eq!(public.name, "测试用户");
}

#[tokio::test]
async fn test_apply_progress_accumulates() {
    require_emulator!();

    let db = test_db().await;
    let user_id = unique_id("user");

    db.apply_progress(&ProgressDelta::for_user(&user_id).roasts(1).exp(10))
        .await
        .unwrap();
    let stats = db
        .apply_progress(&ProgressDelta::for_user(&user_id).likes_received(1).exp(5))
        .await
        .unwrap();

    assert_eq!(stats.roasts_posted, 1);
    assert_eq!(stats.likes_received, 1);
    assert_eq!(stats.exp, 15);
}

#[tokio::test]
async fn test_comments_and_counters() {
    require_emulator!();

    let db = test_db().await;
    let target_id = unique_id("target");
    let user_id = unique_id("user");

    db.insert_target(&test_target(&target_id, &user_id))
        .await
        .unwrap();
    let comment_id = unique_id("comment");
    db.insert_comment(&test_comment(&comment_id, &target_id, &user_id))
        .await
        .unwrap();
    db.set_comment_likes(&comment_id, 3).await.unwrap();

    let comments = db.list_comments_for_target(&target_id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].likes, 3);

    db.update_target_counters(
        &target_id,
        &TargetCounters {
            roast_count: 1,
            total_likes: 3,
        },
    )
    .await
    .unwrap();
    let target = db.get_target(&target_id).await.unwrap().unwrap();
    assert_eq!(target.roast_count, 1);
    assert_eq!(target.total_likes, 3);

    let by_ids = db
        .get_targets_by_ids(&[target_id.clone(), unique_id("missing")])
        .await
        .unwrap();
    assert_eq!(by_ids.len(), 1);
}

#[tokio::test]
async fn test_leaderboard_replace_shrinks() {
    require_emulator!();

    let db = test_db().await;
    let entry = |rank: u32| LeaderboardEntry {
        rank,
        subject_id: format!("s{}", rank),
        target_id: format!("t{}", rank),
        title: "标题".to_string(),
        author_name: String::new(),
        avatar: String::new(),
        likes: 10 - rank,
    };

    db.replace_leaderboard(Leaderboard::Top, &[entry(1), entry(2), entry(3)])
        .await
        .unwrap();
    db.replace_leaderboard(Leaderboard::Top, &[entry(1)])
        .await
        .unwrap();

    let board = db.list_leaderboard(Leaderboard::Top).await.unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].rank, 1);
}
