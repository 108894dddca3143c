// SPDX-License-Identifier: MIT

//! Session and onboarding routes.
//!
//! The SPA signs in with Firebase Auth and presents its ID token here. A
//! verified token either opens a session for an existing profile or, for
//! new users, creates the profile with the onboarding defaults. Sessions
//! are carried by an HS256 JWT cookie.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE};
use crate::models::VehicleType;
use crate::services::firebase_auth::FirebaseAuthError;
use crate::services::progression::{GameProfile, SESSION_LOG_LIMIT};
use crate::services::VerifiedFirebaseUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(open_session))
        .route("/auth/onboard", post(onboard))
        .route("/auth/logout", get(logout))
}

/// Session summary returned after sign-in or onboarding.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub level: u32,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: u64,
}

/// Onboarding payload.
#[derive(Deserialize, Validate)]
pub struct OnboardRequest {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
    #[validate(length(min = 1, max = 16))]
    pub avatar: String,
    pub commute_mode: VehicleType,
}

/// Verify the Firebase ID token on the Authorization header.
async fn verify_firebase(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<VerifiedFirebaseUser> {
    state
        .firebase_auth
        .verify_id_token(headers.get(header::AUTHORIZATION))
        .await
        .map_err(|e| match e {
            FirebaseAuthError::Rejected(msg) => {
                tracing::debug!(reason = %msg, "Firebase ID token rejected");
                AppError::InvalidToken
            }
            FirebaseAuthError::Transient(msg) => {
                AppError::Internal(anyhow::anyhow!("Firebase JWKS unavailable: {msg}"))
            }
        })
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(!state.config.frontend_url.starts_with("http://localhost"))
        .max_age(time::Duration::days(30))
        .build()
}

fn session_response(profile: &GameProfile) -> SessionResponse {
    SessionResponse {
        user_id: profile.user.user_id.clone(),
        name: profile.user.name.clone(),
        avatar: profile.user.avatar.clone(),
        level: profile.stats.level,
        total_points: profile.stats.total_points,
    }
}

/// Open a session for an existing profile.
///
/// Returns 404 when the uid has no profile yet; the frontend then runs
/// onboarding.
async fn open_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let firebase_user = verify_firebase(&state, &headers).await?;
    let uid = firebase_user.uid;

    let profile = state
        .db
        .load_profile(&uid, SESSION_LOG_LIMIT as u32)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", uid)))?;

    let response = session_response(&profile);
    state.profiles.insert(uid.clone(), profile);

    let token = create_jwt(&uid, &state.config.jwt_signing_key)?;

    tracing::info!(user_id = %uid, "Session opened");

    Ok((jar.add(session_cookie(&state, token)), Json(response)))
}

/// Create a profile with the onboarding defaults and open a session.
///
/// Idempotent: an existing profile is returned as-is rather than reset
/// (a returning user re-running onboarding must not lose progress).
async fn onboard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<OnboardRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let firebase_user = verify_firebase(&state, &headers).await?;
    let uid = firebase_user.uid;

    let profile = match state.db.load_profile(&uid, SESSION_LOG_LIMIT as u32).await? {
        Some(existing) => {
            tracing::info!(user_id = %uid, "Onboarding skipped, profile exists");
            existing
        }
        None => {
            let profile = GameProfile::onboard(
                &uid,
                &payload.name,
                &payload.avatar,
                payload.commute_mode,
                chrono::Utc::now(),
            );

            // Profile creation is the one write that must land before the
            // session starts, so it is awaited rather than fire-and-forget.
            state.db.save_profile(&profile).await?;

            tracing::info!(user_id = %uid, name = %payload.name, "Profile created");
            profile
        }
    };

    let response = session_response(&profile);
    state.profiles.insert(uid.clone(), profile);

    let token = create_jwt(&uid, &state.config.jwt_signing_key)?;

    Ok((jar.add(session_cookie(&state, token)), Json(response)))
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .build();
    (jar.remove(removal), StatusCode::NO_CONTENT)
}
