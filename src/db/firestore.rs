// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile documents, also the leaderboard source)
//! - User stats (progression aggregates)
//! - Challenge progress (per-user progress map + claimed set)
//! - Commutes (append-only log entries)
//!
//! The in-memory `GameProfile` is authoritative during a session; documents
//! here are overwritten whole from it (fetch-modify-write), which realizes
//! the store's merge semantics without partial-field updates.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{ChallengeState, CommuteLog, User, UserStats};
use crate::services::GameProfile;
use futures_util::future::{try_join, try_join3};

/// Cursor for commute pagination: the sort key of the last row served.
#[derive(Debug, Clone)]
pub struct CommuteQueryCursor {
    /// `logged_at` of the last entry (RFC3339 with milliseconds)
    pub logged_at: String,
    /// Entry id, for cursor integrity checks
    pub commute_id: String,
}

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
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
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

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user profile by id.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user profile.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.user_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Top users by points, descending. The leaderboard source.
    pub async fn query_leaderboard(&self, limit: u32) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([(
                "total_points",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Stats Operations ────────────────────────────────────────

    /// Get a user's progression stats.
    pub async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a user's progression stats.
    pub async fn set_user_stats(&self, user_id: &str, stats: &UserStats) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(user_id)
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Challenge State Operations ──────────────────────────────

    /// Get a user's challenge progress document.
    pub async fn get_challenge_state(
        &self,
        user_id: &str,
    ) -> Result<Option<ChallengeState>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::CHALLENGE_PROGRESS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a user's challenge progress document.
    pub async fn set_challenge_state(
        &self,
        user_id: &str,
        state: &ChallengeState,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::CHALLENGE_PROGRESS)
            .document_id(user_id)
            .object(state)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Commute Operations ──────────────────────────────────────

    /// Store a commute log entry.
    pub async fn set_commute(&self, commute: &CommuteLog) -> Result<(), AppError> {
        let doc_id = commute_doc_id(&commute.user_id, &commute.id);

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::COMMUTES)
            .document_id(&doc_id)
            .object(commute)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get commutes for a user, most recent first, with cursor pagination.
    pub async fn get_commutes_for_user(
        &self,
        user_id: &str,
        cursor: Option<&CommuteQueryCursor>,
        limit: u32,
    ) -> Result<Vec<CommuteLog>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COMMUTES);

        let user_id = user_id.to_string();
        let query = if let Some(cursor) = cursor {
            let logged_at = cursor.logged_at.clone();
            query.filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(user_id.clone()),
                    q.field("logged_at").less_than(logged_at.clone()),
                ])
            })
        } else {
            query.filter(move |q| q.field("user_id").eq(user_id.clone()))
        };

        query
            .order_by([(
                "logged_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Profile Load/Save ───────────────────────────────────────

    /// Hydrate a full game profile, or `None` when the user is unknown.
    ///
    /// Missing stats/challenge documents fall back to defaults so a profile
    /// written by an older build still loads.
    pub async fn load_profile(
        &self,
        user_id: &str,
        commute_limit: u32,
    ) -> Result<Option<GameProfile>, AppError> {
        let (user, stats, challenges) = try_join3(
            self.get_user(user_id),
            self.get_user_stats(user_id),
            self.get_challenge_state(user_id),
        )
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let commutes = self
            .get_commutes_for_user(user_id, None, commute_limit)
            .await?;

        Ok(Some(GameProfile::from_parts(
            user,
            stats.unwrap_or_default(),
            challenges.unwrap_or_default(),
            commutes,
        )))
    }

    /// Persist a profile's user, stats, and challenge documents.
    ///
    /// Commute entries are appended separately via [`set_commute`] as they
    /// are created.
    ///
    /// [`set_commute`]: FirestoreDb::set_commute
    pub async fn save_profile(&self, profile: &GameProfile) -> Result<(), AppError> {
        let user_id = &profile.user.user_id;

        try_join3(
            self.upsert_user(&profile.user),
            self.set_user_stats(user_id, &profile.stats),
            self.set_challenge_state(user_id, &profile.challenges),
        )
        .await?;

        Ok(())
    }

    /// Persist a profile together with a freshly-logged commute entry.
    pub async fn save_profile_with_commute(
        &self,
        profile: &GameProfile,
        commute: &CommuteLog,
    ) -> Result<(), AppError> {
        try_join(self.save_profile(profile), self.set_commute(commute)).await?;
        Ok(())
    }
}

/// Commute document id: user id and entry id, percent-encoded for safety.
fn commute_doc_id(user_id: &str, commute_id: &str) -> String {
    format!(
        "{}_{}",
        urlencoding::encode(user_id),
        urlencoding::encode(commute_id)
    )
}
