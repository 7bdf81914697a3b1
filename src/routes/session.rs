// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session gate routes. The session is optional here: without one the
//! answer is simply `no_session`.

use crate::middleware::auth::extract_auth_user;
use crate::services::{AuthEvent, GateState};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(current_session))
        .route("/api/session/events", post(auth_event))
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    /// Set by the post-confirmation and OAuth redirects.
    #[serde(default)]
    pub onboarding: Option<String>,
}

impl SessionQuery {
    fn hint(&self) -> bool {
        matches!(self.onboarding.as_deref(), Some("1") | Some("true"))
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthEventRequest {
    pub event: AuthEvent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub gate: GateState,
    pub needs_onboarding: bool,
}

impl From<GateState> for SessionResponse {
    fn from(gate: GateState) -> Self {
        Self {
            needs_onboarding: gate.needs_onboarding(),
            gate,
        }
    }
}

/// GET /api/session - load (or retry loading) the caller's profile.
async fn current_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Json<SessionResponse> {
    let gate = match extract_auth_user(&state, &jar, &headers) {
        Some(user) => {
            state
                .sessions
                .load_profile(&user.user_id, user.email.as_deref(), query.hint())
                .await
        }
        None => GateState::NoSession,
    };
    Json(gate.into())
}

/// POST /api/session/events - forward a client-side auth state change.
async fn auth_event(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(req): Json<AuthEventRequest>,
) -> Json<SessionResponse> {
    let user = extract_auth_user(&state, &jar, &headers);
    let session = user
        .as_ref()
        .map(|u| (u.user_id.as_str(), u.email.as_deref()));
    let gate = state.sessions.on_auth_event(req.event, session).await;
    Json(gate.into())
}
