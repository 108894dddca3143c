// SPDX-License-Identifier: MIT

//! EcoRace: gamified commute tracking backend.
//!
//! This crate provides the API behind the EcoRace SPA: a progression engine
//! (points, XP, levels, badges, challenges) over per-user game profiles,
//! persisted to Firestore with optimistic in-memory state.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use dashmap::DashMap;
use db::FirestoreDb;
use services::{FirebaseTokenVerifier, GameProfile};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub firebase_auth: Arc<FirebaseTokenVerifier>,
    /// Per-user session state; the authoritative copy between persistence
    /// writes. Entries are hydrated from Firestore on first use.
    pub profiles: DashMap<String, GameProfile>,
}
