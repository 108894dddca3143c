// SPDX-License-Identifier: MIT

//! Per-user progression stats and the leveling transition.
//!
//! Stored at: `user_stats/{user_id}`
//!
//! The in-memory copy inside a `GameProfile` is authoritative for the
//! session; writes to Firestore are best-effort after each mutation.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::is_next_utc_day;

/// XP needed to go from level 1 to level 2.
pub const BASE_XP_TO_NEXT_LEVEL: u64 = 1000;

/// One-time point grant applied at onboarding. Credited to the point total
/// directly, outside the XP path.
pub const STARTER_BONUS_POINTS: u64 = 100;

/// Progression stats for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserStats {
    /// Lifetime points, never decreases
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_points: u64,
    /// Current level, starts at 1
    pub level: u32,
    /// XP toward the next level; stays below `xp_to_next_level` between calls
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp: u64,
    /// Threshold for the next level-up; grows 20% per level
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub xp_to_next_level: u64,
    #[serde(default)]
    pub total_distance_km: f64,
    #[serde(default)]
    pub total_carbon_saved_kg: f64,
    #[serde(default)]
    pub total_commutes: u32,
    /// Consecutive UTC days with at least one commute
    #[serde(default)]
    pub current_streak: u32,
    /// Fastest positive commute duration logged (minutes); 0 = none yet
    #[serde(default)]
    pub best_lap_time_minutes: f64,
    /// Leaderboard position, supplied externally; 0 = unranked
    #[serde(default)]
    pub rank: u32,
    /// UTC day key ("YYYY-MM-DD") of the most recent commute
    #[serde(default)]
    pub last_commute_date: Option<String>,
    /// Last update timestamp (RFC3339)
    #[serde(default)]
    pub updated_at: String,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            total_points: 0,
            level: 1,
            xp: 0,
            xp_to_next_level: BASE_XP_TO_NEXT_LEVEL,
            total_distance_km: 0.0,
            total_carbon_saved_kg: 0.0,
            total_commutes: 0,
            current_streak: 0,
            best_lap_time_minutes: 0.0,
            rank: 0,
            last_commute_date: None,
            updated_at: String::new(),
        }
    }
}

impl UserStats {
    /// Fresh stats for a new profile, with the onboarding starter bonus
    /// already credited (points only, no XP).
    pub fn with_starter_bonus() -> Self {
        Self {
            total_points: STARTER_BONUS_POINTS,
            ..Self::default()
        }
    }

    /// Credit points and advance XP, leveling up at most once.
    ///
    /// Returns `true` if a level-up occurred. Reaching the threshold exactly
    /// counts as a level-up and leaves `xp` at 0. A grant large enough to
    /// cross two thresholds still levels up only once; the surplus XP levels
    /// up on the next grant.
    pub fn add_points(&mut self, points: u64) -> bool {
        self.total_points += points;

        let new_xp = self.xp + points;
        if new_xp >= self.xp_to_next_level {
            self.level += 1;
            self.xp = new_xp - self.xp_to_next_level;
            // floor(threshold * 1.2), kept exact in integer arithmetic
            self.xp_to_next_level = self.xp_to_next_level * 12 / 10;
            true
        } else {
            self.xp = new_xp;
            false
        }
    }

    /// Fold a commute into the aggregates and credit its points.
    ///
    /// `today` is the commute's UTC day key, used for streak accounting.
    /// Returns `true` if the point credit caused a level-up.
    pub fn apply_commute(
        &mut self,
        distance_km: f64,
        carbon_saved_kg: f64,
        duration_minutes: f64,
        points: u64,
        today: &str,
        now: &str,
    ) -> bool {
        self.total_distance_km += distance_km;
        self.total_carbon_saved_kg += carbon_saved_kg;
        self.total_commutes += 1;

        self.current_streak = match self.last_commute_date.as_deref() {
            Some(last) if last == today => self.current_streak,
            Some(last) if is_next_utc_day(last, today) => self.current_streak + 1,
            _ => 1,
        };
        self.last_commute_date = Some(today.to_string());

        if duration_minutes > 0.0
            && (self.best_lap_time_minutes == 0.0 || duration_minutes < self.best_lap_time_minutes)
        {
            self.best_lap_time_minutes = duration_minutes;
        }

        self.updated_at = now.to_string();
        self.add_points(points)
    }
}
