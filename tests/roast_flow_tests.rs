// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end roast flows: targets, roasts, replies, likes, and the
//! progression and notifications that follow them.

use axum::{body::Body, http::StatusCode};
use roast_board::db::collections;
use roast_board::models::TargetCounters;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_end_to_end_from_onboarding() {
    let app = common::create_test_app();
    let creator = app.token_for("creator");

    let (_, body) = app.get("/api/session?onboarding=1", Some(&creator)).await;
    assert_eq!(body["needsOnboarding"], true);

    let (status, _) = app
        .post(
            "/api/onboarding",
            Some(&creator),
            json!({ "name": "X", "quote": "Y" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.memory.get_profile("creator").await.unwrap().is_some());
    let stats = app.memory.get_user_stats("creator").await.unwrap().unwrap();
    assert_eq!((stats.targets_created, stats.exp), (0, 0));

    let target_id = app.create_target(&creator, "甲方").await;
    let stats = app.memory.get_user_stats("creator").await.unwrap().unwrap();
    assert_eq!(stats.targets_created, 1);

    let commenter = app.onboard("commenter", "路人").await;
    app.roast(&commenter, &target_id, "需求一天一变").await;

    let target = app.memory.get_target(&target_id).await.unwrap().unwrap();
    assert_eq!(target.roast_count, 1);
    let stats = app.memory.get_user_stats("commenter").await.unwrap().unwrap();
    assert_eq!(stats.roasts_posted, 1);

    let (_, inbox) = app.get("/api/notifications", Some(&creator)).await;
    assert_eq!(inbox.as_array().unwrap().len(), 1);
    assert_eq!(inbox[0]["actorId"], "commenter");
}

#[tokio::test]
async fn test_post_target_roast_and_like() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let bob = app.onboard("bob", "鲍勃").await;

    let target_id = app.create_target(&alice, "甲方张总").await;
    let roast_id = app.roast(&bob, &target_id, "改稿改到天亮").await;

    let (status, body) = app
        .post(&format!("/api/comments/{}/like", roast_id), Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 1);
    assert_eq!(body["alreadyLiked"], false);
    assert_eq!(body["target"]["roastCount"], 1);
    assert_eq!(body["target"]["totalLikes"], 1);

    // Creator: 30 for posting, 2 for liking.
    let alice_stats = app.memory.get_user_stats("alice").await.unwrap().unwrap();
    assert_eq!(alice_stats.targets_created, 1);
    assert_eq!(alice_stats.exp, 32);

    // Commenter: 10 for roasting, 5 for the received like.
    let bob_stats = app.memory.get_user_stats("bob").await.unwrap().unwrap();
    assert_eq!(bob_stats.roasts_posted, 1);
    assert_eq!(bob_stats.likes_received, 1);
    assert_eq!(bob_stats.exp, 15);

    // First roast unlocks b7.
    let (_, body) = app.get("/api/profile", Some(&bob)).await;
    assert!(body["user"]["badges"]
        .as_array()
        .unwrap()
        .contains(&json!("b7")));
}

#[tokio::test]
async fn test_double_like_counts_once() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let bob = app.onboard("bob", "鲍勃").await;
    let target_id = app.create_target(&alice, "室友").await;
    let roast_id = app.roast(&bob, &target_id, "洗碗池又堆满了").await;

    let uri = format!("/api/comments/{}/like", roast_id);
    let (_, first) = app.post(&uri, Some(&alice), json!({})).await;
    let (status, second) = app.post(&uri, Some(&alice), json!({})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["likes"], 1);
    assert_eq!(second["likes"], 1);
    assert_eq!(second["alreadyLiked"], true);

    let stored = app.memory.get_comment(&roast_id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 1);

    let bob_stats = app.memory.get_user_stats("bob").await.unwrap().unwrap();
    assert_eq!(bob_stats.likes_received, 1);
}

#[tokio::test]
async fn test_failed_like_rolls_back() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let bob = app.onboard("bob", "鲍勃").await;
    let target_id = app.create_target(&alice, "前任").await;
    let roast_id = app.roast(&bob, &target_id, "分手还要AA").await;
    let uri = format!("/api/comments/{}/like", roast_id);

    app.memory.fail_writes_to(collections::COMMENTS);
    let (status, _) = app.post(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let stored = app.memory.get_comment(&roast_id).await.unwrap().unwrap();
    assert_eq!(stored.likes, 0);
    let bob_stats = app.memory.get_user_stats("bob").await.unwrap().unwrap();
    assert_eq!(bob_stats.likes_received, 0);

    // The liked mark was rolled back, so a retry counts.
    app.memory.heal();
    let (status, body) = app.post(&uri, Some(&alice), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["likes"], 1);
    assert_eq!(body["alreadyLiked"], false);
}

#[tokio::test]
async fn test_like_unknown_comment_not_found() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let (status, _) = app
        .post("/api/comments/nope/like", Some(&alice), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_replies_grouped_under_parent() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let bob = app.onboard("bob", "鲍勃").await;
    let target_id = app.create_target(&alice, "领导").await;

    let parent = app.roast(&bob, &target_id, "周五下午五点开会").await;
    let reply = app
        .reply(&alice, &target_id, "还要求写会议纪要", Some(&parent))
        .await;

    let (status, body) = app
        .get(&format!("/api/targets/{}?sort=new", target_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target"]["id"], target_id.as_str());
    assert_eq!(body["roastCount"], 2);

    let roots = body["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], parent.as_str());

    let replies = body["replies"][&parent].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], reply.as_str());
    assert_eq!(replies[0]["replyToUserId"], "bob");
    assert_eq!(replies[0]["replyToUserName"], "鲍勃");
}

#[tokio::test]
async fn test_reply_to_other_target_rejected() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let first = app.create_target(&alice, "亲戚A").await;
    let second = app.create_target(&alice, "亲戚B").await;
    let parent = app.roast(&alice, &first, "过年问工资").await;

    let (status, _) = app
        .post(
            &format!("/api/targets/{}/comments", second),
            Some(&alice),
            json!({ "content": "跑错楼了", "replyToCommentId": parent }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notifications_for_creator_and_reply_target() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let bob = app.onboard("bob", "鲍勃").await;
    let carol = app.onboard("carol", "卡罗尔").await;
    let target_id = app.create_target(&alice, "同事").await;

    let bob_roast = app.roast(&bob, &target_id, "抢功第一名").await;
    app.reply(&carol, &target_id, "甩锅也是第一名", Some(&bob_roast))
        .await;

    let (_, alice_inbox) = app.get("/api/notifications", Some(&alice)).await;
    let alice_inbox = alice_inbox.as_array().unwrap();
    assert_eq!(alice_inbox.len(), 2);
    assert!(alice_inbox.iter().all(|n| n["type"] == "comment"));

    let (_, bob_inbox) = app.get("/api/notifications", Some(&bob)).await;
    let bob_inbox = bob_inbox.as_array().unwrap();
    assert_eq!(bob_inbox.len(), 1);
    assert_eq!(bob_inbox[0]["actorName"], "卡罗尔");
    assert_eq!(bob_inbox[0]["read"], false);

    // Opening marks it read and returns the target.
    let id = bob_inbox[0]["id"].as_str().unwrap();
    let (status, target) = app
        .post(&format!("/api/notifications/{}/read", id), Some(&bob), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(target["id"], target_id.as_str());

    let (_, bob_inbox) = app.get("/api/notifications", Some(&bob)).await;
    assert_eq!(bob_inbox[0]["read"], true);

    // Another user's notification is not theirs to open.
    let (status, _) = app
        .post(&format!("/api/notifications/{}/read", id), Some(&carol), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_no_self_notifications() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let target_id = app.create_target(&alice, "自己").await;

    let own = app.roast(&alice, &target_id, "自己骂自己").await;
    app.reply(&alice, &target_id, "再骂一遍", Some(&own)).await;
    app.post(&format!("/api/comments/{}/like", own), Some(&alice), json!({}))
        .await;

    let (_, inbox) = app.get("/api/notifications", Some(&alice)).await;
    assert_eq!(inbox, json!([]));

    // Liking your own roast earns no received-like credit.
    let stats = app.memory.get_user_stats("alice").await.unwrap().unwrap();
    assert_eq!(stats.likes_received, 0);
}

#[tokio::test]
async fn test_like_notifies_author() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let bob = app.onboard("bob", "鲍勃").await;
    let target_id = app.create_target(&alice, "陌生人").await;
    let roast_id = app.roast(&alice, &target_id, "地铁外放").await;

    app.post(&format!("/api/comments/{}/like", roast_id), Some(&bob), json!({}))
        .await;

    let (_, inbox) = app.get("/api/notifications", Some(&alice)).await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "like");
    assert_eq!(inbox[0]["commentId"], roast_id.as_str());
}

#[tokio::test]
async fn test_feed_lists_targets_with_derived_counts() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let first = app.create_target(&alice, "一号").await;
    let second = app.create_target(&alice, "二号").await;
    let roast = app.roast(&alice, &second, "二号最烦").await;
    app.roast(&alice, &second, "真的烦").await;
    app.post(&format!("/api/comments/{}/like", roast), Some(&alice), json!({}))
        .await;

    let (status, body) = app.get("/api/targets?tab=champ", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 0);
    assert_eq!(body["hasMore"], false);

    let targets = body["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0]["id"], second.as_str());
    assert_eq!(targets[0]["roastCount"], 2);
    assert_eq!(targets[0]["totalLikes"], 1);
    assert_eq!(targets[0]["topRoastPreview"], "二号最烦");
    assert_eq!(targets[1]["id"], first.as_str());

    let (_, body) = app.get("/api/targets?page=1", None).await;
    assert_eq!(body["targets"], json!([]));
}

#[tokio::test]
async fn test_profile_overview_recomputes_counts() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let target_id = app.create_target(&alice, "装修队").await;
    app.roast(&alice, &target_id, "早上七点电钻").await;

    // Drift the cached counter; the profile read repairs it.
    let mut stats = app.memory.get_user_stats("alice").await.unwrap().unwrap();
    stats.roasts_posted = 99;
    app.memory.upsert_user_stats(&stats).await.unwrap();

    let (status, body) = app.get("/api/profile", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["stats"]["roastsPosted"], 1);
    assert_eq!(body["user"]["stats"]["targetsCreated"], 1);
    assert_eq!(body["user"]["stats"]["exp"], 40);
    assert_eq!(body["targets"].as_array().unwrap().len(), 1);
    assert_eq!(body["recentComments"][0]["targetName"], "装修队");
    assert_eq!(body["badges"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_comment_author_card() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let target_id = app.create_target(&alice, "外卖").await;
    let roast_id = app.roast(&alice, &target_id, "汤洒了一半").await;

    let (status, body) = app
        .get(&format!("/api/comments/{}/author", roast_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "alice");
    assert_eq!(body["name"], "爱丽丝");
    assert_eq!(body["quote"], "来都来了");

    // Falls back to the name stored on the comment.
    app.memory.fail_reads_from(collections::PUBLIC_USERS);
    let (status, body) = app
        .get(&format!("/api/comments/{}/author", roast_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "爱丽丝");
    assert!(body.get("quote").is_none());
}

#[tokio::test]
async fn test_audio_roast_uploaded() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let target_id = app.create_target(&alice, "楼上").await;

    let uri = format!(
        "/api/targets/{}/comments/audio?duration=3.5&transcript={}",
        target_id,
        urlencoding::encode("半夜弹珠子")
    );
    let (status, body) = app
        .send(common::request(
            "POST",
            &uri,
            Some(&alice),
            Body::from(vec![1u8, 2, 3, 4]),
            Some("audio/webm"),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["type"], "audio");
    assert_eq!(body["content"], "半夜弹珠子");
    assert_eq!(body["duration"], 3.5);

    let id = body["id"].as_str().unwrap();
    let (bytes, content_type) = app.blobs.get(&format!("alice/{}.webm", id)).unwrap();
    assert_eq!(bytes, vec![1u8, 2, 3, 4]);
    assert_eq!(content_type, "audio/webm");
    assert!(body["mediaUrl"].as_str().unwrap().ends_with(&format!("alice/{}.webm", id)));
}

#[tokio::test]
async fn test_audio_upload_failure_posts_nothing() {
    let app = common::create_test_app();
    let alice = app.onboard("alice", "爱丽丝").await;
    let target_id = app.create_target(&alice, "楼下").await;
    app.blobs.set_failing(true);

    let (status, body) = app
        .send(common::request(
            "POST",
            &format!("/api/targets/{}/comments/audio", target_id),
            Some(&alice),
            Body::from(vec![9u8; 16]),
            Some("audio/webm"),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["details"], "语音上传失败，请重试");

    let comments = app
        .memory
        .list_comments_for_target(&target_id)
        .await
        .unwrap();
    assert!(comments.is_empty());
}

#[tokio::test]
async fn test_counter_bump_kept_when_refresh_fails() {
    let app = common::create_test_app();
    let creator = app.onboard("bump-creator", "甲").await;
    let target_id = app.create_target(&creator, "老板").await;
    app.memory
        .update_target_counters(
            &target_id,
            &TargetCounters {
                roast_count: 5,
                total_likes: 0,
            },
        )
        .await
        .unwrap();

    let commenter = app.onboard("bump-commenter", "乙").await;
    app.memory.fail_reads_from(collections::COMMENTS);
    let comment_id = app.roast(&commenter, &target_id, "又画饼").await;

    let target = app.memory.get_target(&target_id).await.unwrap().unwrap();
    assert_eq!(target.roast_count, 6);

    app.memory.heal();
    let comment = app.memory.get_comment(&comment_id).await.unwrap();
    assert!(comment.is_some());
}
