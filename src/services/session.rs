// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Session gating: decides whether a signed-in user sees the app, the
//! onboarding form, or a retry prompt.
//!
//! Rules:
//! - A missing or incomplete profile means onboarding, unless a profile
//!   for the user is already held, which is then kept.
//! - A profile read that fails or times out never forces onboarding and
//!   never replaces a held profile.
//! - One profile fetch per user at a time; overlapping requests are
//!   answered from what is held instead of queueing.

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::db::Db;
use crate::error::AppError;
use crate::models::{AppUser, Profile, UserStats};

/// Placeholder name when onboarding is submitted empty.
pub const DEFAULT_NAME: &str = "匿名骂手";
/// Placeholder quote when onboarding is submitted empty.
pub const DEFAULT_QUOTE: &str = "“生活不易，全靠骂人”";
pub const PROFILE_RETRY_MESSAGE: &str = "个人资料加载失败，请点击重试";
/// Longest session token lifetime. A held profile untouched for this long
/// has no live token left pointing at it.
pub const HELD_PROFILE_IDLE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Auth provider state-change events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    TokenRefreshed,
    UserUpdated,
    SignedOut,
}

/// Outcome of a gating decision.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    NoSession,
    /// Another fetch for this user is running and nothing is held yet
    Loading,
    NeedsOnboarding,
    ProfileLoaded {
        user: AppUser,
        /// True when the held copy was served because a refresh failed
        stale: bool,
    },
    ProfileUnavailable { message: String },
    BackendUnavailable,
}

impl GateState {
    pub fn needs_onboarding(&self) -> bool {
        matches!(self, GateState::NeedsOnboarding)
    }
}

/// Removes the user from the in-flight set when the fetch ends, however
/// it ends.
struct InFlight {
    set: Arc<DashSet<String>>,
    user_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set.remove(&self.user_id);
    }
}

struct HeldProfile {
    user: AppUser,
    touched: Instant,
}

/// Per-process gate state: held profiles and in-flight fetches.
#[derive(Clone)]
pub struct SessionGate {
    db: Db,
    held: Arc<DashMap<String, HeldProfile>>,
    in_flight: Arc<DashSet<String>>,
    timeout: Duration,
}

impl SessionGate {
    pub fn new(db: Db, timeout: Duration) -> Self {
        Self {
            db,
            held: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashSet::new()),
            timeout,
        }
    }

    /// Profile held for a user, if any. Counts as activity for eviction.
    pub fn held(&self, user_id: &str) -> Option<AppUser> {
        self.held.get_mut(user_id).map(|mut held| {
            held.touched = Instant::now();
            held.user.clone()
        })
    }

    /// Drop the held profile (sign-out).
    pub fn forget(&self, user_id: &str) {
        self.held.remove(user_id);
    }

    /// Replace the held copy after a local change (e.g. new stats).
    pub fn hold(&self, user: AppUser) {
        self.held.insert(
            user.id().to_string(),
            HeldProfile {
                user,
                touched: Instant::now(),
            },
        );
    }

    /// Evict held profiles idle for longer than `max_idle`. Returns how
    /// many were dropped.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.held.len();
        self.held.retain(|_, held| held.touched.elapsed() <= max_idle);
        before.saturating_sub(self.held.len())
    }

    /// React to an auth state change.
    pub async fn on_auth_event(
        &self,
        event: AuthEvent,
        session: Option<(&str, Option<&str>)>,
    ) -> GateState {
        match (event, session) {
            (AuthEvent::SignedOut, Some((user_id, _))) => {
                self.forget(user_id);
                GateState::NoSession
            }
            (_, None) => GateState::NoSession,
            (_, Some((user_id, email))) => self.load_profile(user_id, email, false).await,
        }
    }

    /// Load (or refresh) the profile for a signed-in user.
    ///
    /// `onboarding_hint` is the `?onboarding=1` redirect marker: while another
    /// fetch is still running and nothing is held, go to onboarding. A failed
    /// or timed-out read still answers with the retry prompt.
    pub async fn load_profile(
        &self,
        user_id: &str,
        email: Option<&str>,
        onboarding_hint: bool,
    ) -> GateState {
        if !self.db.is_configured() {
            return GateState::BackendUnavailable;
        }

        let state = match self.try_begin(user_id) {
            Some(_guard) => self.fetch(user_id, email).await,
            None => {
                tracing::debug!(user_id, "Profile fetch already in flight");
                match self.held(user_id) {
                    Some(user) => GateState::ProfileLoaded { user, stale: false },
                    None => GateState::Loading,
                }
            }
        };

        match state {
            GateState::Loading if onboarding_hint && self.held(user_id).is_none() => {
                GateState::NeedsOnboarding
            }
            other => other,
        }
    }

    fn try_begin(&self, user_id: &str) -> Option<InFlight> {
        self.in_flight
            .insert(user_id.to_string())
            .then(|| InFlight {
                set: self.in_flight.clone(),
                user_id: user_id.to_string(),
            })
    }

    async fn with_timeout<T, F>(&self, what: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout(what.to_string())),
        }
    }

    /// Serve the held copy after a failed read, or ask for a retry.
    fn fallback(&self, user_id: &str, error: &AppError) -> GateState {
        tracing::warn!(user_id, error = %error, "Profile load failed");
        match self.held(user_id) {
            Some(user) => GateState::ProfileLoaded { user, stale: true },
            None => GateState::ProfileUnavailable {
                message: PROFILE_RETRY_MESSAGE.to_string(),
            },
        }
    }

    async fn fetch(&self, user_id: &str, email: Option<&str>) -> GateState {
        let profile = match self
            .with_timeout("profile", self.db.get_profile(user_id))
            .await
        {
            Ok(profile) => profile,
            Err(e) => return self.fallback(user_id, &e),
        };

        let mut profile = match profile {
            Some(profile) if profile.is_complete() => profile,
            _ => {
                return match self.held(user_id) {
                    Some(user) => GateState::ProfileLoaded { user, stale: true },
                    None => GateState::NeedsOnboarding,
                };
            }
        };

        let stats = match self
            .with_timeout("stats", self.db.get_user_stats(user_id))
            .await
        {
            Ok(stats) => stats.unwrap_or_else(|| UserStats::empty(user_id)),
            Err(e) => return self.fallback(user_id, &e),
        };

        let badges = match self
            .with_timeout("badges", self.db.list_user_badges(user_id))
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .filter(|b| b.unlocked)
                .map(|b| b.badge_id)
                .collect(),
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Badge load failed");
                Vec::new()
            }
        };

        if profile.email.is_empty() {
            if let Some(email) = email {
                profile.email = email.to_string();
            }
        }

        let user = AppUser {
            profile,
            stats,
            badges,
        };
        self.hold(user.clone());
        GateState::ProfileLoaded { user, stale: false }
    }

    /// One-shot onboarding: write the profile and zeroed stats, then
    /// re-read the profile. The profile is held on success.
    pub async fn complete_onboarding(
        &self,
        user_id: &str,
        email: Option<&str>,
        name: &str,
        quote: &str,
    ) -> Result<AppUser, AppError> {
        if !self.db.is_configured() {
            return Err(AppError::BackendUnavailable);
        }

        let name = match name.trim() {
            "" => DEFAULT_NAME,
            trimmed => trimmed,
        };
        let quote = match quote.trim() {
            "" => DEFAULT_QUOTE,
            trimmed => trimmed,
        };

        let profile = Profile {
            id: user_id.to_string(),
            name: name.to_string(),
            avatar: onboarding_avatar_url(name),
            quote: quote.to_string(),
            level: 1,
            email: email.unwrap_or_default().to_string(),
        };

        self.db.upsert_profile(&profile).await?;
        self.db
            .upsert_user_stats(&UserStats::empty(user_id))
            .await?;

        let saved = self
            .with_timeout("profile", self.db.get_profile(user_id))
            .await?
            .ok_or_else(|| AppError::Database("profile not found after save".to_string()))?;

        tracing::info!(user_id, "Onboarding complete");

        let user = AppUser {
            profile: saved,
            stats: UserStats::empty(user_id),
            badges: Vec::new(),
        };
        self.hold(user.clone());
        Ok(user)
    }
}

/// Persona avatar derived from the display name.
pub fn onboarding_avatar_url(name: &str) -> String {
    format!(
        "https://api.dicebear.com/7.x/personas/png?seed={}&size=200",
        urlencoding::encode(name)
    )
}
