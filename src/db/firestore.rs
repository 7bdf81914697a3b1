// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (`app_users` plus the `public_users` projection)
//! - Progression counters and badge unlocks
//! - Targets and comments
//! - Notifications and leaderboards
//!
//! Rows are written whole (read-modify-write) rather than through field
//! masks, so the serde names on the models are the only field mapping.

use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    Badge, Comment, Leaderboard, LeaderboardEntry, Notification, Profile, ProgressDelta,
    PublicUser, Target, TargetCounters, UserBadge, UserStats,
};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore caps `in` filters at 30 values.
const IN_FILTER_LIMIT: usize = 30;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Client with no store behind it (missing credentials).
    ///
    /// Every operation returns [`AppError::BackendUnavailable`].
    pub fn offline() -> Self {
        Self { client: None }
    }

    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or(AppError::BackendUnavailable)
    }

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Profile Operations ─────────────────────────────────────

    pub async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        self.get_doc(collections::APP_USERS, user_id).await
    }

    /// Write the private profile and its public projection together.
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let client = self.get_client()?;
        let public = PublicUser::from(profile);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::APP_USERS)
            .document_id(&profile.id)
            .object(profile)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        client
            .fluent()
            .update()
            .in_col(collections::PUBLIC_USERS)
            .document_id(&profile.id)
            .object(&public)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(e.to_string()))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    pub async fn get_public_user(&self, user_id: &str) -> Result<Option<PublicUser>, AppError> {
        self.get_doc(collections::PUBLIC_USERS, user_id).await
    }

    // ─── User Stats Operations ──────────────────────────────────

    pub async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, AppError> {
        self.get_doc(collections::USER_STATS, user_id).await
    }

    pub async fn upsert_user_stats(&self, stats: &UserStats) -> Result<(), AppError> {
        self.set_doc(collections::USER_STATS, &stats.user_id, stats)
            .await
    }

    /// Atomically add `delta` to the user's counters.
    ///
    /// The read registers the stats document with the transaction, so a
    /// concurrent writer makes the commit fail instead of losing an update.
    pub async fn apply_progress(&self, delta: &ProgressDelta) -> Result<UserStats, AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<UserStats> = client
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(&delta.user_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read stats in transaction: {}", e))
            })?;

        let mut stats = current.unwrap_or_else(|| UserStats::empty(&delta.user_id));
        stats.apply(delta);

        client
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(&delta.user_id)
            .object(&stats)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add stats to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(
            user_id = %delta.user_id,
            exp = stats.exp,
            "Progress applied atomically"
        );

        Ok(stats)
    }

    // ─── Target Operations ──────────────────────────────────────

    pub async fn get_target(&self, target_id: &str) -> Result<Option<Target>, AppError> {
        self.get_doc(collections::TARGETS, target_id).await
    }

    pub async fn insert_target(&self, target: &Target) -> Result<(), AppError> {
        self.set_doc(collections::TARGETS, &target.id, target).await
    }

    pub async fn list_targets(&self, offset: u32, limit: u32) -> Result<Vec<Target>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TARGETS)
            .order_by([("heatIndex", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_targets_by_creator(
        &self,
        creator_id: &str,
    ) -> Result<Vec<Target>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TARGETS)
            .filter(|q| q.for_all([q.field("creatorId").eq(creator_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch targets by id, chunked to the `in` filter limit.
    pub async fn get_targets_by_ids(&self, ids: &[String]) -> Result<Vec<Target>, AppError> {
        let client = self.get_client()?;

        let chunks: Vec<Vec<String>> = ids.chunks(IN_FILTER_LIMIT).map(<[String]>::to_vec).collect();

        let results = stream::iter(chunks)
            .map(|chunk| async move {
                client
                    .fluent()
                    .select()
                    .from(collections::TARGETS)
                    .filter(|q| q.for_all([q.field("id").is_in(chunk.clone())]))
                    .obj::<Target>()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Vec<Target>, AppError>>>()
            .await;

        let mut targets = Vec::with_capacity(ids.len());
        for chunk in results {
            targets.extend(chunk?);
        }
        Ok(targets)
    }

    pub async fn all_targets(&self) -> Result<Vec<Target>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TARGETS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn update_target_counters(
        &self,
        target_id: &str,
        counters: &TargetCounters,
    ) -> Result<(), AppError> {
        let mut target = self
            .get_target(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("target {}", target_id)))?;
        target.roast_count = counters.roast_count;
        target.total_likes = counters.total_likes;
        self.insert_target(&target).await
    }

    // ─── Comment Operations ─────────────────────────────────────

    pub async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.set_doc(collections::COMMENTS, &comment.id, comment)
            .await
    }

    pub async fn get_comment(&self, comment_id: &str) -> Result<Option<Comment>, AppError> {
        self.get_doc(collections::COMMENTS, comment_id).await
    }

    pub async fn list_comments_for_target(
        &self,
        target_id: &str,
    ) -> Result<Vec<Comment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .filter(|q| q.for_all([q.field("targetId").eq(target_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn list_comments_by_user(
        &self,
        user_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Comment>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)]);

        let query = match limit {
            Some(limit) => query.limit(limit),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn set_comment_likes(&self, comment_id: &str, likes: u32) -> Result<(), AppError> {
        let mut comment = self
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;
        comment.likes = likes;
        self.insert_comment(&comment).await
    }

    pub async fn list_comments_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<Comment>, AppError> {
        let since = since.to_rfc3339();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .filter(|q| q.for_all([q.field("createdAt").greater_than_or_equal(since.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn top_comments(&self, limit: u32) -> Result<Vec<Comment>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMENTS)
            .order_by([("likes", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Badge Operations ───────────────────────────────────────

    pub async fn list_badges(&self) -> Result<Vec<Badge>, AppError> {
        let badges: Vec<Badge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BADGES)
            .order_by([("id", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if badges.is_empty() {
            return Ok(crate::models::badge::default_catalog());
        }
        Ok(badges)
    }

    pub async fn list_user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_BADGES)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upsert unlock rows, all in one transaction.
    pub async fn upsert_user_badges(&self, rows: &[UserBadge]) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for row in rows {
            client
                .fluent()
                .update()
                .in_col(collections::USER_BADGES)
                .document_id(row.doc_id())
                .object(row)
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add badge to transaction: {}", e))
                })?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    // ─── Notification Operations ────────────────────────────────

    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.set_doc(collections::NOTIFICATIONS, &notification.id, notification)
            .await
    }

    pub async fn list_notifications(&self, user_id: &str) -> Result<Vec<Notification>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(|q| q.for_all([q.field("userId").eq(user_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        self.get_doc(collections::NOTIFICATIONS, id).await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), AppError> {
        if let Some(mut row) = self.get_notification(id).await? {
            row.read = true;
            self.insert_notification(&row).await?;
        }
        Ok(())
    }

    // ─── Leaderboard Operations ─────────────────────────────────

    /// Overwrite ranks `1..=entries.len()` and delete any stale ranks up to
    /// the board's size, in one transaction.
    pub async fn replace_leaderboard(
        &self,
        board: Leaderboard,
        entries: &[LeaderboardEntry],
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let collection = board.collection();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for rank in 1..=board.limit().max(entries.len()) {
            let doc_id = rank.to_string();
            match entries.get(rank - 1) {
                Some(entry) => {
                    client
                        .fluent()
                        .update()
                        .in_col(collection)
                        .document_id(&doc_id)
                        .object(entry)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| AppError::Database(e.to_string()))?;
                }
                None => {
                    client
                        .fluent()
                        .delete()
                        .from(collection)
                        .document_id(&doc_id)
                        .add_to_transaction(&mut transaction)
                        .map_err(|e| AppError::Database(e.to_string()))?;
                }
            }
        }

        transaction.commit().await.map_err(|e| {
            AppError::Database(format!("Failed to commit {} rebuild: {}", collection, e))
        })?;
        Ok(())
    }

    pub async fn list_leaderboard(
        &self,
        board: Leaderboard,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(board.collection())
            .order_by([("rank", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
