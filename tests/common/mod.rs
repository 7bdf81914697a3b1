// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use roast_board::config::Config;
use roast_board::db::{Db, FirestoreDb, MemoryDb};
use roast_board::middleware::auth::create_jwt;
use roast_board::routes::create_router;
use roast_board::services::{BlobStore, MemoryBlobStore, SideEffects};
use roast_board::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// App wired over the in-memory store, with handles for fault injection.
#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub memory: MemoryDb,
    pub blobs: MemoryBlobStore,
}

#[allow(dead_code)]
impl TestApp {
    pub fn token_for(&self, user_id: &str) -> String {
        create_jwt(
            user_id,
            Some(&format!("{}@example.com", user_id)),
            &self.state.config.jwt_signing_key,
        )
        .expect("Failed to mint test token")
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, Body::empty(), None))
            .await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request(
            "POST",
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }

    /// Complete onboarding for `user_id` and return their token.
    pub async fn onboard(&self, user_id: &str, name: &str) -> String {
        let token = self.token_for(user_id);
        let (status, body) = self
            .post(
                "/api/onboarding",
                Some(&token),
                serde_json::json!({ "name": name, "quote": "来都来了" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "onboarding failed: {body}");
        token
    }

    /// Post a target as the token's user and return its id.
    pub async fn create_target(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/targets",
                Some(token),
                serde_json::json!({
                    "name": name,
                    "type": "甲方",
                    "description": "改了八版又用回第一版",
                    "avatarStyle": "suit-man",
                    "tags": ["#五彩斑斓的黑"]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create target failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }

    /// Post a text roast and return its id.
    pub async fn roast(&self, token: &str, target_id: &str, content: &str) -> String {
        self.reply(token, target_id, content, None).await
    }

    pub async fn reply(
        &self,
        token: &str,
        target_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> String {
        let (status, body) = self
            .post(
                &format!("/api/targets/{}/comments", target_id),
                Some(token),
                serde_json::json!({ "content": content, "replyToCommentId": reply_to }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "post comment failed: {body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

/// Create a test app over a fresh in-memory store, side effects inline.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> TestApp {
    let (state, memory, blobs) = test_state(config);
    finish(state, memory, blobs)
}

/// State over a fresh in-memory store, before it is wrapped in a router.
#[allow(dead_code)]
pub fn test_state(config: Config) -> (AppState, MemoryDb, MemoryBlobStore) {
    let memory = MemoryDb::new();
    let blobs = MemoryBlobStore::new(&config.storage_bucket);
    let db = Db::Memory(memory.clone());
    let state = AppState::new(
        config,
        db.clone(),
        SideEffects::Inline(db),
        BlobStore::Memory(blobs.clone()),
    );
    (state, memory, blobs)
}

#[allow(dead_code)]
pub fn finish(state: AppState, memory: MemoryDb, blobs: MemoryBlobStore) -> TestApp {
    let state = Arc::new(state);
    TestApp {
        router: create_router(state.clone()),
        state,
        memory,
        blobs,
    }
}

/// Create a test app with no store configured.
#[allow(dead_code)]
pub fn create_unconfigured_app() -> TestApp {
    let config = Config::test_default();
    let blobs = MemoryBlobStore::new(&config.storage_bucket);
    let db = Db::Firestore(FirestoreDb::offline());
    let state = Arc::new(AppState::new(
        config,
        db.clone(),
        SideEffects::Inline(db),
        BlobStore::Memory(blobs.clone()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        memory: MemoryDb::new(),
        blobs,
    }
}
