// SPDX-License-Identifier: MIT

use ecorace::config::Config;
use ecorace::db::FirestoreDb;
use ecorace::routes::create_router;
use ecorace::services::FirebaseTokenVerifier;
use ecorace::AppState;
use std::sync::Arc;

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

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Mint a session JWT the way the auth routes do.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    ecorace::middleware::auth::create_jwt(user_id, signing_key).expect("JWT creation failed")
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let firebase_auth =
        Arc::new(FirebaseTokenVerifier::new(&config).expect("Failed to build verifier"));

    let state = Arc::new(AppState {
        config,
        db,
        firebase_auth,
        profiles: dashmap::DashMap::new(),
    });

    (create_router(state.clone()), state)
}

/// Seed an in-memory profile so protected routes can run without a database.
#[allow(dead_code)]
pub fn seed_profile(state: &AppState, user_id: &str) {
    use ecorace::models::VehicleType;
    use ecorace::services::GameProfile;

    let profile = GameProfile::onboard(
        user_id,
        "Test Racer",
        "🌟",
        VehicleType::Bike,
        chrono::Utc::now(),
    );
    state.profiles.insert(user_id.to_string(), profile);
}
