// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in, sign-up, and sign-out routes backed by the hosted auth provider.
//!
//! A successful sign-in stores the provider's access token in the
//! `roast_token` cookie; the token is also returned for Bearer use.

use crate::error::Result;
use crate::middleware::auth::{extract_auth_user, SESSION_COOKIE};
use crate::services::{AuthEvent, GateState};
use crate::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub const SIGNUP_MESSAGE: &str = "注册成功，请检查邮箱进行验证。";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/resend", post(resend))
        .route("/auth/logout", post(logout))
        .route("/auth/google", get(google))
}

#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email(message = "请输入有效的邮箱地址"))]
    pub email: String,
    #[validate(length(min = 6, message = "密码至少 6 位"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendRequest {
    #[validate(email(message = "请输入有效的邮箱地址"))]
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
    pub access_token: String,
    #[serde(flatten)]
    pub gate: GateState,
    pub needs_onboarding: bool,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Redirect target after email confirmation or OAuth, flagged so the
/// session check sends new users to onboarding.
fn onboarding_redirect(state: &AppState) -> String {
    format!("{}/?onboarding=1", state.config.frontend_url)
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(30))
        .build()
}

/// POST /auth/login
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(creds): Json<Credentials>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    creds.validate()?;

    let session = state
        .auth
        .sign_in_with_password(creds.email.trim(), &creds.password)
        .await?;
    let user_id = session.user.id.clone();
    tracing::info!(user_id = %user_id, "Signed in");

    let gate = state
        .sessions
        .on_auth_event(
            AuthEvent::SignedIn,
            Some((user_id.as_str(), session.user.email.as_deref())),
        )
        .await;

    let jar = jar.add(session_cookie(&state, session.access_token.clone()));
    Ok((
        jar,
        Json(LoginResponse {
            user_id,
            access_token: session.access_token,
            needs_onboarding: gate.needs_onboarding(),
            gate,
        }),
    ))
}

/// POST /auth/signup
async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(creds): Json<Credentials>,
) -> Result<(StatusCode, CookieJar, Json<MessageResponse>)> {
    creds.validate()?;

    let result = state
        .auth
        .sign_up(
            creds.email.trim(),
            &creds.password,
            &onboarding_redirect(&state),
        )
        .await?;
    tracing::info!(user_id = ?result.id, "Signed up");

    // Providers with confirmation disabled return a session right away.
    let jar = match result.access_token {
        Some(token) => jar.add(session_cookie(&state, token)),
        None => jar,
    };

    Ok((
        StatusCode::CREATED,
        jar,
        Json(MessageResponse {
            message: SIGNUP_MESSAGE.to_string(),
        }),
    ))
}

/// POST /auth/resend
async fn resend(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResendRequest>,
) -> Result<StatusCode> {
    req.validate()?;
    state.auth.resend_verification(req.email.trim()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/logout
///
/// Always clears the cookie. Revoking the token at the provider is
/// best-effort.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Some(user) = extract_auth_user(&state, &jar, &headers) {
        state
            .sessions
            .on_auth_event(AuthEvent::SignedOut, Some((user.user_id.as_str(), None)))
            .await;

        if state.auth.is_configured() {
            if let Err(e) = state.auth.sign_out(&user.token).await {
                tracing::warn!(user_id = %user.user_id, error = %e, "Provider sign-out failed");
            }
        }
        tracing::info!(user_id = %user.user_id, "Signed out");
    }

    let removal = Cookie::build(SESSION_COOKIE)
        .path("/")
        .http_only(true)
        .secure(state.config.frontend_url.starts_with("https://"))
        .same_site(SameSite::Lax);
    (StatusCode::NO_CONTENT, jar.remove(removal))
}

/// GET /auth/google - redirect to the provider's Google sign-in.
async fn google(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let url = state
        .auth
        .google_authorize_url(&onboarding_redirect(&state))?;
    Ok(Redirect::temporary(&url))
}
