// SPDX-License-Identifier: MIT

//! EcoRace API Server
//!
//! Backend for the EcoRace commuting game: records eco-friendly commutes,
//! drives the points/XP/level progression, and serves badges, challenges,
//! and the leaderboard to the SPA.

use ecorace::{
    config::Config, db::FirestoreDb, services::FirebaseTokenVerifier, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting EcoRace API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize Firebase ID token verifier
    let firebase_auth =
        Arc::new(FirebaseTokenVerifier::new(&config).expect("Failed to initialize Firebase Auth"));

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        firebase_auth,
        profiles: dashmap::DashMap::new(),
    });

    // Build router
    let app = ecorace::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecorace=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
