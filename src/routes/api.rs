// SPDX-License-Identifier: MIT

//! API routes for authenticated users.
//!
//! Mutating handlers apply the engine operation on the cached in-memory
//! profile and dispatch persistence as a spawned task: the response never
//! waits on Firestore, and a failed write is logged without rolling the
//! in-memory state back.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::firestore::CommuteQueryCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::commute::CommuteLog;
use crate::models::vehicle::{VehicleType, CATALOG};
use crate::models::{Badge, Challenge, LatLng, UserStats};
use crate::services::leaderboard::{self, LeaderboardEntry};
use crate::services::progression::{GameProfile, SESSION_LOG_LIMIT};
use crate::AppState;

const DEFAULT_PER_PAGE: u32 = 20;
const MAX_PER_PAGE: u32 = 100;
const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;
const MAX_LEADERBOARD_LIMIT: u32 = 50;
const CURSOR_PARTS: usize = 2;

/// API routes (require authentication via session JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/profile", get(get_profile))
        .route("/api/vehicles", get(get_vehicles))
        .route("/api/vehicle", put(select_vehicle))
        .route("/api/commutes", post(log_commute).get(get_commutes))
        .route("/api/challenges", get(get_challenges))
        .route("/api/challenges/{id}/complete", post(complete_challenge))
        .route("/api/challenges/{id}/progress", post(advance_challenge))
        .route("/api/challenges/{id}/claim", post(claim_challenge))
        .route("/api/leaderboard", get(get_leaderboard))
}

// ─── Profile Cache Access ────────────────────────────────────

/// Ensure the user's profile is hydrated into the in-memory cache.
async fn hydrate(state: &AppState, user_id: &str) -> Result<()> {
    if state.profiles.contains_key(user_id) {
        return Ok(());
    }

    let profile = state
        .db
        .load_profile(user_id, SESSION_LOG_LIMIT as u32)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

    state.profiles.entry(user_id.to_string()).or_insert(profile);
    Ok(())
}

/// Run an engine operation on the exclusively-held profile entry.
///
/// Returns the operation's output together with a snapshot for persistence.
/// The DashMap entry lock serializes operations for the same user.
fn with_profile<T>(
    state: &AppState,
    user_id: &str,
    op: impl FnOnce(&mut GameProfile) -> T,
) -> Result<(T, GameProfile)> {
    let mut entry = state
        .profiles
        .get_mut(user_id)
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;

    let out = op(entry.value_mut());
    let snapshot = entry.value().clone();
    Ok((out, snapshot))
}

/// Dispatch a best-effort profile write. Failures are logged, never rolled
/// back, and never retried.
fn persist(state: &Arc<AppState>, snapshot: GameProfile, commute: Option<CommuteLog>) {
    let state = Arc::clone(state);
    tokio::spawn(async move {
        let result = match &commute {
            Some(entry) => state.db.save_profile_with_commute(&snapshot, entry).await,
            None => state.db.save_profile(&snapshot).await,
        };

        if let Err(e) = result {
            tracing::warn!(
                user_id = %snapshot.user.user_id,
                error = %e,
                "Profile persistence failed; in-memory state retained"
            );
        }
    });
}

// ─── Profile ─────────────────────────────────────────────────

/// Full game state for the dashboard.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub commute_mode: VehicleType,
    pub selected_vehicle: VehicleType,
    pub stats: UserStats,
    pub badges: Vec<Badge>,
    pub challenges: Vec<Challenge>,
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    hydrate(&state, &user.user_id).await?;

    let (response, _) = with_profile(&state, &user.user_id, |profile| ProfileResponse {
        user_id: profile.user.user_id.clone(),
        name: profile.user.name.clone(),
        avatar: profile.user.avatar.clone(),
        commute_mode: profile.user.commute_mode,
        selected_vehicle: profile.user.selected_vehicle,
        stats: profile.stats.clone(),
        badges: profile.badges(),
        challenges: profile.challenges_view(chrono::Utc::now()),
    })?;

    Ok(Json(response))
}

// ─── Vehicles ────────────────────────────────────────────────

/// A catalog vehicle with this user's unlock state.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct VehicleResponse {
    pub id: VehicleType,
    pub name: String,
    pub icon: String,
    pub eco_factor: f64,
    pub description: String,
    pub unlock_level: u32,
    pub unlocked: bool,
    pub selected: bool,
}

async fn get_vehicles(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<VehicleResponse>>> {
    hydrate(&state, &user.user_id).await?;

    let (response, _) = with_profile(&state, &user.user_id, |profile| {
        CATALOG
            .iter()
            .map(|v| VehicleResponse {
                id: v.id,
                name: v.name.to_string(),
                icon: v.icon.to_string(),
                eco_factor: v.eco_factor,
                description: v.description.to_string(),
                unlock_level: v.unlock_level,
                unlocked: v.unlock_level <= profile.stats.level,
                selected: v.id == profile.user.selected_vehicle,
            })
            .collect::<Vec<_>>()
    })?;

    Ok(Json(response))
}

#[derive(Deserialize)]
pub struct SelectVehicleRequest {
    pub vehicle: VehicleType,
}

/// Selection result. A refused selection (locked vehicle) is reported
/// in-body, not as an error status: the control was supposed to be
/// disabled, and the engine simply declines to mutate anything.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SelectVehicleResponse {
    pub selected_vehicle: VehicleType,
    pub applied: bool,
}

async fn select_vehicle(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SelectVehicleRequest>,
) -> Result<Json<SelectVehicleResponse>> {
    hydrate(&state, &user.user_id).await?;

    let ((applied, selected), snapshot) = with_profile(&state, &user.user_id, |profile| {
        let applied = profile.select_vehicle(payload.vehicle, chrono::Utc::now());
        (applied, profile.user.selected_vehicle)
    })?;

    if applied {
        persist(&state, snapshot, None);
    }

    Ok(Json(SelectVehicleResponse {
        selected_vehicle: selected,
        applied,
    }))
}

// ─── Commutes ────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct LogCommuteRequest {
    #[validate(range(min = 0.0))]
    pub distance_km: f64,
    pub mode: VehicleType,
    #[validate(range(min = 0.0))]
    pub duration_minutes: f64,
    #[validate(range(min = 0.0))]
    pub carbon_saved_kg: f64,
    #[serde(default)]
    pub route: Option<Vec<LatLng>>,
}

/// A commute entry as served to the client.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommuteResponse {
    pub id: String,
    pub logged_at: String,
    pub distance_km: f64,
    pub mode: VehicleType,
    pub duration_minutes: f64,
    pub carbon_saved_kg: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    pub route: Option<Vec<LatLng>>,
    /// Haversine length of the recorded route, when one exists
    pub route_km: Option<f64>,
}

impl From<&CommuteLog> for CommuteResponse {
    fn from(log: &CommuteLog) -> Self {
        Self {
            id: log.id.clone(),
            logged_at: log.logged_at.clone(),
            distance_km: log.distance_km,
            mode: log.mode,
            duration_minutes: log.duration_minutes,
            carbon_saved_kg: log.carbon_saved_kg,
            points: log.points,
            route: log.route(),
            route_km: log.route_length_km(),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogCommuteResponse {
    pub commute: CommuteResponse,
    pub leveled_up: bool,
    pub stats: UserStats,
}

async fn log_commute(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<LogCommuteRequest>,
) -> Result<Json<LogCommuteResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    hydrate(&state, &user.user_id).await?;

    let (outcome, snapshot) = with_profile(&state, &user.user_id, |profile| {
        profile.log_commute(
            payload.distance_km,
            payload.mode,
            payload.duration_minutes,
            payload.carbon_saved_kg,
            payload.route.as_deref(),
            chrono::Utc::now(),
        )
    })?;

    let response = LogCommuteResponse {
        commute: CommuteResponse::from(&outcome.entry),
        leveled_up: outcome.leveled_up,
        stats: snapshot.stats.clone(),
    };

    persist(&state, snapshot, Some(outcome.entry));

    Ok(Json(response))
}

#[derive(Deserialize)]
struct CommutesQuery {
    /// Cursor for forward pagination (opaque token)
    cursor: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<CommuteQueryCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor =
                || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let parts: Vec<&str> = decoded_str.splitn(CURSOR_PARTS, '|').collect();
            if parts.len() != CURSOR_PARTS || parts.iter().any(|p| p.is_empty()) {
                return Err(invalid_cursor());
            }

            chrono::DateTime::parse_from_rfc3339(parts[0]).map_err(|_| invalid_cursor())?;

            Ok(CommuteQueryCursor {
                logged_at: parts[0].to_string(),
                commute_id: parts[1].to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(last: &CommuteLog) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}|{}", last.logged_at, last.id))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommutesResponse {
    pub commutes: Vec<CommuteResponse>,
    /// Pass back to fetch the next page; absent on the last page
    pub next_cursor: Option<String>,
}

async fn get_commutes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CommutesQuery>,
) -> Result<Json<CommutesResponse>> {
    let cursor = parse_cursor(query.cursor.as_deref())?;
    let per_page = query.per_page.clamp(1, MAX_PER_PAGE);

    let commutes = state
        .db
        .get_commutes_for_user(&user.user_id, cursor.as_ref(), per_page)
        .await?;

    let next_cursor = if commutes.len() == per_page as usize {
        commutes.last().map(encode_cursor)
    } else {
        None
    };

    Ok(Json(CommutesResponse {
        commutes: commutes.iter().map(CommuteResponse::from).collect(),
        next_cursor,
    }))
}

// ─── Challenges ──────────────────────────────────────────────

async fn get_challenges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Challenge>>> {
    hydrate(&state, &user.user_id).await?;

    let (challenges, _) = with_profile(&state, &user.user_id, |profile| {
        profile.challenges_view(chrono::Utc::now())
    })?;

    Ok(Json(challenges))
}

/// Outcome of a challenge mutation. `found: false` means the id matched no
/// template and nothing changed (silent no-op, not a 404).
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChallengeMutationResponse {
    pub found: bool,
    pub current: f64,
    pub complete: bool,
}

async fn complete_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ChallengeMutationResponse>> {
    hydrate(&state, &user.user_id).await?;

    let ((found, current), snapshot) = with_profile(&state, &user.user_id, |profile| {
        let found = profile.complete_challenge(&id, chrono::Utc::now());
        (found, profile.challenges.current(&id))
    })?;

    if found {
        persist(&state, snapshot, None);
    }

    Ok(Json(ChallengeMutationResponse {
        found,
        current,
        complete: found, // force-complete leaves a known challenge complete
    }))
}

#[derive(Deserialize, Validate)]
pub struct AdvanceChallengeRequest {
    #[validate(range(min = 0.0))]
    pub amount: f64,
}

async fn advance_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(payload): Json<AdvanceChallengeRequest>,
) -> Result<Json<ChallengeMutationResponse>> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    hydrate(&state, &user.user_id).await?;

    let ((found, current, complete), snapshot) =
        with_profile(&state, &user.user_id, |profile| {
            let found = profile.advance_challenge(&id, payload.amount, chrono::Utc::now());
            let complete = crate::models::challenge::lookup(&id)
                .map(|t| profile.challenges.is_complete(t))
                .unwrap_or(false);
            (found, profile.challenges.current(&id), complete)
        })?;

    if found {
        persist(&state, snapshot, None);
    }

    Ok(Json(ChallengeMutationResponse {
        found,
        current,
        complete,
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClaimChallengeResponse {
    pub claimed: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points_awarded: u64,
    pub stats: UserStats,
}

async fn claim_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ClaimChallengeResponse>> {
    hydrate(&state, &user.user_id).await?;

    let (reward, snapshot) = with_profile(&state, &user.user_id, |profile| {
        profile.claim_challenge_reward(&id, chrono::Utc::now())
    })?;

    if reward.is_some() {
        persist(&state, snapshot.clone(), None);
    }

    Ok(Json(ClaimChallengeResponse {
        claimed: reward.is_some(),
        points_awarded: reward.unwrap_or(0),
        stats: snapshot.stats,
    }))
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    #[serde(default = "default_leaderboard_limit")]
    limit: u32,
}

fn default_leaderboard_limit() -> u32 {
    DEFAULT_LEADERBOARD_LIMIT
}

async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let limit = query.limit.clamp(1, MAX_LEADERBOARD_LIMIT);

    let page = state.db.query_leaderboard(limit).await?;
    let entries = leaderboard::assign_ranks(page);

    // Refresh the caller's cached rank when they appear in the page
    if let Some(own) = entries.iter().find(|e| e.user_id == user.user_id) {
        if let Some(mut profile) = state.profiles.get_mut(&user.user_id) {
            profile.set_rank(own.rank);
        }
    }

    Ok(Json(entries))
}
