// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gating and onboarding through the HTTP surface.

use axum::http::StatusCode;
use roast_board::config::Config;
use roast_board::db::collections;
use roast_board::services::session::{DEFAULT_NAME, DEFAULT_QUOTE, PROFILE_RETRY_MESSAGE};
use serde_json::json;
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_new_user_needs_onboarding() {
    let app = common::create_test_app();
    let token = app.token_for("newbie");

    let (status, body) = app.get("/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "needs_onboarding");
    assert_eq!(body["needsOnboarding"], true);
}

#[tokio::test]
async fn test_writes_blocked_until_onboarded() {
    let app = common::create_test_app();
    let token = app.token_for("newbie");

    let (status, body) = app
        .post(
            "/api/targets",
            Some(&token),
            json!({ "name": "张总", "type": "领导" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"], "请先完成个人资料设置");
}

#[tokio::test]
async fn test_onboarding_then_profile_loaded() {
    let app = common::create_test_app();
    let token = app.token_for("u-onboard");

    let (status, body) = app
        .post(
            "/api/onboarding",
            Some(&token),
            json!({ "name": "  暴躁老哥  ", "quote": "不服来辩" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "暴躁老哥");
    assert_eq!(body["quote"], "不服来辩");
    assert_eq!(body["level"], 1);
    assert_eq!(body["email"], "u-onboard@example.com");
    assert_eq!(body["stats"]["exp"], 0);
    assert!(body["avatar"]
        .as_str()
        .unwrap()
        .starts_with("https://api.dicebear.com/7.x/personas/png?seed="));

    let (status, body) = app.get("/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "profile_loaded");
    assert_eq!(body["needsOnboarding"], false);
    assert_eq!(body["user"]["name"], "暴躁老哥");

    // Public projection written alongside.
    let public = app.memory.get_public_user("u-onboard").await.unwrap().unwrap();
    assert_eq!(public.name, "暴躁老哥");
}

#[tokio::test]
async fn test_empty_onboarding_uses_defaults() {
    let app = common::create_test_app();
    let token = app.token_for("u-blank");

    let (status, body) = app
        .post("/api/onboarding", Some(&token), json!({ "name": " ", "quote": "" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], DEFAULT_NAME);
    assert_eq!(body["quote"], DEFAULT_QUOTE);
}

#[tokio::test]
async fn test_onboarding_rejects_profanity() {
    let app = common::create_test_app();
    let token = app.token_for("u-rude");

    let (status, body) = app
        .post("/api/onboarding", Some(&token), json!({ "name": "傻逼", "quote": "hi" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"], "内容包含不当用语，请修改后再提交");
    assert!(app.memory.get_profile("u-rude").await.unwrap().is_none());
}

#[tokio::test]
async fn test_onboarding_write_failure_reported() {
    let app = common::create_test_app();
    let token = app.token_for("u-fail");
    app.memory.fail_writes_to(collections::APP_USERS);

    let (status, _) = app
        .post("/api/onboarding", Some(&token), json!({ "name": "a", "quote": "b" }))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.state.sessions.held("u-fail").is_none());
}

#[tokio::test]
async fn test_failed_read_asks_for_retry_not_onboarding() {
    let app = common::create_test_app();
    let token = app.token_for("u-flaky");
    app.memory.fail_reads_from(collections::APP_USERS);

    let (_, body) = app.get("/api/session", Some(&token)).await;
    assert_eq!(body["state"], "profile_unavailable");
    assert_eq!(body["message"], PROFILE_RETRY_MESSAGE);
    assert_eq!(body["needsOnboarding"], false);

    // A confirmation redirect does not turn the failure into onboarding.
    let (_, body) = app.get("/api/session?onboarding=1", Some(&token)).await;
    assert_eq!(body["state"], "profile_unavailable");
    assert_eq!(body["needsOnboarding"], false);
}

#[tokio::test]
async fn test_failed_refresh_keeps_held_profile() {
    let app = common::create_test_app();
    let token = app.onboard("u-held", "老王").await;

    app.memory.fail_reads_from(collections::APP_USERS);
    let (_, body) = app.get("/api/session", Some(&token)).await;
    assert_eq!(body["state"], "profile_loaded");
    assert_eq!(body["stale"], true);
    assert_eq!(body["user"]["name"], "老王");

    // Writes keep working off the held copy.
    app.memory.heal();
    let target_id = app.create_target(&token, "隔壁装修").await;
    assert!(!target_id.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_profile_read_times_out() {
    let mut config = Config::test_default();
    config.profile_fetch_timeout = Duration::from_millis(2000);
    let app = common::create_test_app_with_config(config);
    let token = app.onboard("u-slow", "慢慢来").await;

    app.memory
        .set_read_delay(collections::APP_USERS, Duration::from_secs(10));

    let (status, body) = app.get("/api/session", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "profile_loaded");
    assert_eq!(body["stale"], true);

    // A brand-new user with the same stall gets the retry prompt.
    let other = app.token_for("u-slow-new");
    let (_, body) = app.get("/api/session", Some(&other)).await;
    assert_eq!(body["state"], "profile_unavailable");

    let (_, body) = app.get("/api/session?onboarding=1", Some(&other)).await;
    assert_eq!(body["state"], "profile_unavailable");
    assert_eq!(body["needsOnboarding"], false);
}

#[tokio::test]
async fn test_signed_out_event_forgets_profile() {
    let app = common::create_test_app();
    let token = app.onboard("u-out", "再见").await;

    let (status, body) = app
        .post(
            "/api/session/events",
            Some(&token),
            json!({ "event": "SIGNED_OUT" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "no_session");
    assert!(app.state.sessions.held("u-out").is_none());

    let (_, body) = app
        .post(
            "/api/session/events",
            Some(&token),
            json!({ "event": "TOKEN_REFRESHED" }),
        )
        .await;
    assert_eq!(body["state"], "profile_loaded");
}
