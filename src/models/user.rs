// SPDX-License-Identifier: MIT

//! User profile model for storage and API.

use serde::{Deserialize, Serialize};

use crate::models::vehicle::VehicleType;

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Firebase uid (also used as document ID)
    pub user_id: String,
    /// Display name chosen at onboarding
    pub name: String,
    /// Avatar emoji/identifier
    pub avatar: String,
    /// Usual commute mode declared at onboarding
    pub commute_mode: VehicleType,
    /// Currently selected race vehicle
    pub selected_vehicle: VehicleType,
    /// Unlocked badge ids; eligibility is evaluated externally
    #[serde(default)]
    pub unlocked_badges: Vec<String>,
    /// Denormalized from stats so the leaderboard is a single ordered query
    #[serde(default)]
    pub total_points: u64,
    /// When the profile was created (RFC3339)
    pub created_at: String,
    /// Last mutating operation timestamp (RFC3339)
    pub last_active: String,
}
