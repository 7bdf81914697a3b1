// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Protected API routes. Every handler here runs behind `require_auth`,
//! and every write additionally needs a completed profile.

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{AppUser, Comment, Notification, Target};
use crate::services::generator::TargetDraft;
use crate::services::moderation::{contains_profanity, validate_clean, PROFANITY_MESSAGE};
use crate::services::notify;
use crate::services::roast::{
    LikeOutcome, NewAudioComment, NewComment, NewTarget, ProfileOverview,
};
use crate::services::GateState;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Upper bound on a voice roast upload.
const MAX_AUDIO_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/onboarding", post(complete_onboarding))
        .route("/api/profile", get(get_profile))
        .route("/api/targets", post(create_target))
        .route("/api/targets/draft", post(draft_target))
        .route("/api/targets/{id}/comments", post(post_comment))
        .route(
            "/api/targets/{id}/comments/audio",
            post(post_audio_comment).layer(DefaultBodyLimit::max(MAX_AUDIO_BYTES)),
        )
        .route("/api/comments/{id}/like", post(like_comment))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}/read", post(open_notification))
}

/// The caller's loaded profile. Writes are refused until onboarding is done.
async fn require_profile(state: &AppState, auth: &AuthUser) -> Result<AppUser> {
    if let Some(user) = state.sessions.held(&auth.user_id) {
        return Ok(user);
    }

    match state
        .sessions
        .load_profile(&auth.user_id, auth.email.as_deref(), false)
        .await
    {
        GateState::ProfileLoaded { user, .. } => Ok(user),
        GateState::NeedsOnboarding => {
            Err(AppError::Validation("请先完成个人资料设置".to_string()))
        }
        GateState::BackendUnavailable => Err(AppError::BackendUnavailable),
        GateState::ProfileUnavailable { message } => Err(AppError::Timeout(message)),
        GateState::Loading => Err(AppError::Timeout("profile still loading".to_string())),
        GateState::NoSession => Err(AppError::Unauthorized),
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    #[serde(default)]
    #[validate(
        length(max = 20, message = "昵称不能超过 20 字"),
        custom(function = "validate_clean")
    )]
    pub name: String,
    #[serde(default)]
    #[validate(
        length(max = 60, message = "签名不能超过 60 字"),
        custom(function = "validate_clean")
    )]
    pub quote: String,
}

/// POST /api/onboarding
async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<OnboardingRequest>,
) -> Result<Json<AppUser>> {
    req.validate()?;
    let user = state
        .sessions
        .complete_onboarding(&auth.user_id, auth.email.as_deref(), &req.name, &req.quote)
        .await?;
    Ok(Json(user))
}

/// GET /api/profile
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileOverview>> {
    let user = require_profile(&state, &auth).await?;
    let overview = state.roasts.profile_overview(&user).await?;

    // Keep the held copy's counters current.
    let mut held = user;
    held.stats = overview.user.stats.clone();
    held.badges = overview.user.badges.clone();
    state.sessions.hold(held);

    Ok(Json(overview))
}

/// POST /api/targets
async fn create_target(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<NewTarget>,
) -> Result<(StatusCode, Json<Target>)> {
    let user = require_profile(&state, &auth).await?;
    let target = state.roasts.create_target(&user, req).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub experience: String,
}

/// POST /api/targets/draft - extract target fields from a free-text story.
async fn draft_target(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DraftRequest>,
) -> Result<Json<TargetDraft>> {
    require_profile(&state, &auth).await?;

    if contains_profanity(&req.experience) {
        return Err(AppError::Validation(PROFANITY_MESSAGE.to_string()));
    }
    let draft = state.generator.draft_target(&req.experience).await?;
    let flagged = [&draft.name, &draft.description]
        .into_iter()
        .chain(draft.tags.iter())
        .any(|text| contains_profanity(text));
    if flagged {
        tracing::info!(user_id = %auth.user_id, "Generated draft failed moderation");
        return Err(AppError::Validation(PROFANITY_MESSAGE.to_string()));
    }
    Ok(Json(draft))
}

/// POST /api/targets/{id}/comments
async fn post_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(target_id): Path<String>,
    Json(req): Json<NewComment>,
) -> Result<(StatusCode, Json<Comment>)> {
    let user = require_profile(&state, &auth).await?;
    let comment = state.roasts.post_comment(&user, &target_id, req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioQuery {
    pub transcript: Option<String>,
    pub duration: Option<f64>,
    pub reply_to: Option<String>,
}

/// POST /api/targets/{id}/comments/audio - body is the raw recording.
async fn post_audio_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(target_id): Path<String>,
    Query(query): Query<AudioQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<Comment>)> {
    let user = require_profile(&state, &auth).await?;
    let req = NewAudioComment {
        audio: body.to_vec(),
        transcript: query.transcript,
        duration: query.duration,
        reply_to_comment_id: query.reply_to,
    };
    let comment = state
        .roasts
        .post_audio_comment(&user, &target_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /api/comments/{id}/like
async fn like_comment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(comment_id): Path<String>,
) -> Result<Json<LikeOutcome>> {
    let user = require_profile(&state, &auth).await?;
    Ok(Json(state.roasts.like(&user, &comment_id).await?))
}

/// GET /api/notifications
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Notification>>> {
    if !state.db.is_configured() {
        return Ok(Json(Vec::new()));
    }
    Ok(Json(notify::list_for_user(&state.db, &auth.user_id).await?))
}

/// POST /api/notifications/{id}/read - mark read and return the target to open.
async fn open_notification(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(notification_id): Path<String>,
) -> Result<Json<Target>> {
    let target = notify::open(&state.db, &auth.user_id, &notification_id).await?;
    Ok(Json(target))
}
