// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Post-action side effects.
//!
//! Every action ends with progression, badge and notification writes.
//! They are described as [`SideEffect`] values and handed to
//! [`SideEffects`], which either runs them inline (errors logged and
//! dropped) or queues them for a background worker that retries with
//! exponential backoff.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::Db;
use crate::error::AppError;
use crate::models::{Notification, ProgressDelta};
use crate::services::progression;

const BASE_BACKOFF: Duration = Duration::from_millis(200);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// Queued effects before `dispatch` waits for the worker.
pub const OUTBOX_CAPACITY: usize = 1024;

/// A deferred write triggered by an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    ApplyProgress(ProgressDelta),
    SyncBadges { user_id: String },
    Notify(Notification),
}

impl SideEffect {
    pub fn sync_badges(user_id: &str) -> Self {
        SideEffect::SyncBadges {
            user_id: user_id.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SideEffect::ApplyProgress(_) => "apply_progress",
            SideEffect::SyncBadges { .. } => "sync_badges",
            SideEffect::Notify(_) => "notify",
        }
    }

    fn user_id(&self) -> &str {
        match self {
            SideEffect::ApplyProgress(delta) => &delta.user_id,
            SideEffect::SyncBadges { user_id } => user_id,
            SideEffect::Notify(n) => &n.user_id,
        }
    }

    pub async fn run(&self, db: &Db) -> Result<(), AppError> {
        match self {
            SideEffect::ApplyProgress(delta) => {
                progression::apply_progress(db, delta).await.map(|_| ())
            }
            SideEffect::SyncBadges { user_id } => {
                progression::sync_badges(db, user_id).await.map(|_| ())
            }
            SideEffect::Notify(notification) => db.insert_notification(notification).await,
        }
    }
}

/// Where side effects go.
#[derive(Clone)]
pub enum SideEffects {
    /// Run in order on the caller's task; failures are logged and dropped.
    Inline(Db),
    /// Hand off to the outbox worker.
    Queued {
        db: Db,
        sender: mpsc::Sender<SideEffect>,
    },
}

impl SideEffects {
    pub async fn dispatch(&self, effects: Vec<SideEffect>) {
        match self {
            SideEffects::Inline(db) => {
                for effect in effects {
                    run_logged(db, &effect).await;
                }
            }
            SideEffects::Queued { db, sender } => {
                for effect in effects {
                    if let Err(mpsc::error::SendError(effect)) = sender.send(effect).await {
                        // Worker gone (shutdown); do it here instead of losing it.
                        run_logged(db, &effect).await;
                    }
                }
            }
        }
    }
}

async fn run_logged(db: &Db, effect: &SideEffect) {
    if let Err(e) = effect.run(db).await {
        tracing::warn!(
            effect = effect.name(),
            user_id = %effect.user_id(),
            error = %e,
            "Side effect failed"
        );
    }
}

/// Start the outbox worker. Effects are processed one at a time in
/// arrival order; a full queue makes `dispatch` wait.
pub fn spawn_outbox(db: Db, max_attempts: u32) -> (SideEffects, JoinHandle<()>) {
    spawn_outbox_with_capacity(db, max_attempts, OUTBOX_CAPACITY)
}

pub fn spawn_outbox_with_capacity(
    db: Db,
    max_attempts: u32,
    capacity: usize,
) -> (SideEffects, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::channel::<SideEffect>(capacity.max(1));
    let worker_db = db.clone();

    let handle = tokio::spawn(async move {
        while let Some(effect) = receiver.recv().await {
            run_with_retry(&worker_db, &effect, max_attempts).await;
        }
        tracing::info!("Outbox worker stopped");
    });

    (SideEffects::Queued { db, sender }, handle)
}

/// Exponential backoff before attempt `attempt + 1`.
pub fn backoff(attempt: u32) -> Duration {
    BASE_BACKOFF
        .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_BACKOFF)
}

async fn run_with_retry(db: &Db, effect: &SideEffect, max_attempts: u32) {
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match effect.run(db).await {
            Ok(()) => return,
            Err(e) if attempt < max_attempts => {
                let delay = backoff(attempt);
                tracing::debug!(
                    effect = effect.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Side effect failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                tracing::warn!(
                    effect = effect.name(),
                    user_id = %effect.user_id(),
                    attempts = max_attempts,
                    error = %e,
                    "Side effect dropped after retries"
                );
            }
        }
    }
}
