// SPDX-License-Identifier: MIT

//! The progression engine.
//!
//! Owns a user's full game state (`GameProfile`) and the state transitions
//! behind every user intent: selecting a vehicle, logging a commute,
//! completing/advancing/claiming challenges. Operations run synchronously to
//! completion on an exclusively-held profile; persistence happens afterwards
//! and never rolls an operation back.

use chrono::{DateTime, Utc};

use crate::models::badge::{self, Badge, STARTER_BADGE};
use crate::models::challenge::{self, Challenge, ChallengeState};
use crate::models::commute::{encode_route, CommuteLog, LatLng};
use crate::models::stats::UserStats;
use crate::models::vehicle::{self, VehicleType};
use crate::models::User;
use crate::time_utils::{format_utc_rfc3339, format_utc_rfc3339_millis, utc_day_key};

/// How many recent commutes a hydrated profile keeps in memory.
pub const SESSION_LOG_LIMIT: usize = 50;

/// A user's complete in-memory game state.
#[derive(Debug, Clone)]
pub struct GameProfile {
    pub user: User,
    pub stats: UserStats,
    pub challenges: ChallengeState,
    /// Most-recent-first commute log (bounded session window)
    pub commutes: Vec<CommuteLog>,
}

/// Outcome of logging a commute.
#[derive(Debug, Clone)]
pub struct CommuteOutcome {
    pub entry: CommuteLog,
    pub leveled_up: bool,
}

impl GameProfile {
    /// Create a fresh profile at onboarding.
    ///
    /// Applies the fixed defaults: level 1, xp 0, the 100-point starter
    /// bonus, the starter badge, and the declared commute mode as the
    /// initial vehicle selection.
    pub fn onboard(
        user_id: &str,
        name: &str,
        avatar: &str,
        commute_mode: VehicleType,
        now: DateTime<Utc>,
    ) -> Self {
        let stats = UserStats::with_starter_bonus();
        let timestamp = format_utc_rfc3339(now);

        let user = User {
            user_id: user_id.to_string(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            commute_mode,
            selected_vehicle: commute_mode,
            unlocked_badges: vec![STARTER_BADGE.to_string()],
            total_points: stats.total_points,
            created_at: timestamp.clone(),
            last_active: timestamp,
        };

        Self {
            user,
            stats,
            challenges: ChallengeState::default(),
            commutes: Vec::new(),
        }
    }

    /// Reassemble a profile from stored documents.
    pub fn from_parts(
        user: User,
        stats: UserStats,
        challenges: ChallengeState,
        commutes: Vec<CommuteLog>,
    ) -> Self {
        Self {
            user,
            stats,
            challenges,
            commutes,
        }
    }

    /// Select a vehicle, refusing when its unlock level exceeds the user's.
    ///
    /// Returns whether the selection was applied. A refused selection
    /// mutates nothing; the UI is expected to have disabled the control, so
    /// refusal is a quiet signal rather than an error.
    pub fn select_vehicle(&mut self, id: VehicleType, now: DateTime<Utc>) -> bool {
        let Some(v) = vehicle::lookup(id) else {
            return false;
        };
        if v.unlock_level > self.stats.level {
            tracing::debug!(
                user_id = %self.user.user_id,
                vehicle = v.id.as_str(),
                unlock_level = v.unlock_level,
                level = self.stats.level,
                "Vehicle selection refused (locked)"
            );
            return false;
        }

        self.user.selected_vehicle = id;
        self.touch(now);
        true
    }

    /// Log a commute: compute points, append the entry, credit the stats.
    ///
    /// The entry, the point credit, and the aggregate updates all land in
    /// this one call, so no observer sees a commute counted without its
    /// points.
    pub fn log_commute(
        &mut self,
        distance_km: f64,
        mode: VehicleType,
        duration_minutes: f64,
        carbon_saved_kg: f64,
        route: Option<&[LatLng]>,
        now: DateTime<Utc>,
    ) -> CommuteOutcome {
        let points = vehicle::commute_points(distance_km, vehicle::lookup(mode));

        let entry = CommuteLog {
            id: format!(
                "{}-{}",
                now.timestamp_millis(),
                self.stats.total_commutes + 1
            ),
            user_id: self.user.user_id.clone(),
            logged_at: format_utc_rfc3339_millis(now),
            distance_km,
            mode,
            duration_minutes,
            carbon_saved_kg,
            points,
            route_polyline: route.and_then(encode_route),
        };

        let leveled_up = self.stats.apply_commute(
            distance_km,
            carbon_saved_kg,
            duration_minutes,
            points,
            &utc_day_key(now),
            &format_utc_rfc3339(now),
        );

        self.commutes.insert(0, entry.clone());
        self.commutes.truncate(SESSION_LOG_LIMIT);
        self.touch(now);

        tracing::info!(
            user_id = %self.user.user_id,
            mode = mode.as_str(),
            distance_km,
            points,
            leveled_up,
            "Commute logged"
        );

        CommuteOutcome { entry, leveled_up }
    }

    /// Force a challenge to completion. Unknown ids are a silent no-op.
    ///
    /// Completion does not credit the reward; see [`claim_challenge_reward`].
    ///
    /// [`claim_challenge_reward`]: GameProfile::claim_challenge_reward
    pub fn complete_challenge(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let changed = self.challenges.force_complete(id);
        if changed {
            self.challenges.updated_at = format_utc_rfc3339(now);
            self.touch(now);
        }
        changed
    }

    /// Advance a challenge's progress by a non-negative delta.
    pub fn advance_challenge(&mut self, id: &str, delta: f64, now: DateTime<Utc>) -> bool {
        let changed = self.challenges.advance(id, delta);
        if changed {
            self.challenges.updated_at = format_utc_rfc3339(now);
            self.touch(now);
        }
        changed
    }

    /// Claim a completed challenge's reward, crediting its points once.
    ///
    /// Returns the points credited, or `None` when the challenge is
    /// unknown, incomplete, or already claimed.
    pub fn claim_challenge_reward(&mut self, id: &str, now: DateTime<Utc>) -> Option<u64> {
        let reward = self.challenges.claim(id)?;
        self.stats.add_points(reward);
        self.challenges.updated_at = format_utc_rfc3339(now);
        self.touch(now);

        tracing::info!(
            user_id = %self.user.user_id,
            challenge = id,
            reward,
            "Challenge reward claimed"
        );
        Some(reward)
    }

    /// Record the externally-computed leaderboard rank.
    pub fn set_rank(&mut self, rank: u32) {
        self.stats.rank = rank;
    }

    /// Badge catalog merged with this user's unlock state.
    pub fn badges(&self) -> Vec<Badge> {
        badge::merge_unlocked(&self.user.unlocked_badges)
    }

    /// Challenge catalog merged with this user's progress.
    pub fn challenges_view(&self, now: DateTime<Utc>) -> Vec<Challenge> {
        challenge::merge_state(&self.challenges, now)
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.user.last_active = format_utc_rfc3339(now);
        // Keep the leaderboard denormalization in step with the stats
        self.user.total_points = self.stats.total_points;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn new_profile() -> GameProfile {
        GameProfile::onboard(
            "u1",
            "EcoRacer",
            "🌟",
            VehicleType::Bike,
            at("2024-03-15T08:00:00Z"),
        )
    }

    #[test]
    fn onboarding_defaults() {
        let profile = new_profile();
        assert_eq!(profile.stats.total_points, 100);
        assert_eq!(profile.stats.level, 1);
        assert_eq!(profile.stats.xp, 0);
        assert_eq!(profile.stats.xp_to_next_level, 1000);
        assert_eq!(profile.user.selected_vehicle, VehicleType::Bike);
        assert_eq!(profile.user.total_points, 100);
        assert!(profile.commutes.is_empty());

        let badges = profile.badges();
        let starter = badges.iter().find(|b| b.id == STARTER_BADGE).unwrap();
        assert!(starter.unlocked);
        assert_eq!(badges.iter().filter(|b| b.unlocked).count(), 1);
    }

    #[test]
    fn locked_vehicle_selection_is_refused() {
        let mut profile = new_profile();
        profile.stats.level = 2;

        // Electric car unlocks at level 10
        let applied = profile.select_vehicle(VehicleType::ElectricCar, at("2024-03-15T09:00:00Z"));

        assert!(!applied);
        assert_eq!(profile.user.selected_vehicle, VehicleType::Bike);
    }

    #[test]
    fn unlocked_vehicle_selection_applies() {
        let mut profile = new_profile();
        profile.stats.level = 5;

        assert!(profile.select_vehicle(VehicleType::Bus, at("2024-03-15T09:00:00Z")));
        assert_eq!(profile.user.selected_vehicle, VehicleType::Bus);
    }

    #[test]
    fn commute_awards_formula_points_to_log_and_stats() {
        let mut profile = new_profile();
        let before = profile.stats.total_points;

        let outcome = profile.log_commute(
            10.0,
            VehicleType::Bike,
            32.0,
            2.1,
            None,
            at("2024-03-15T08:30:00Z"),
        );

        // floor(10 * 1.8 * 10) = 180, in the entry and in the stats
        assert_eq!(outcome.entry.points, 180);
        assert_eq!(profile.stats.total_points, before + 180);
        assert_eq!(profile.stats.xp, 180);
        assert_eq!(profile.commutes[0].id, outcome.entry.id);
    }

    #[test]
    fn commute_aggregates_stay_consistent() {
        let mut profile = new_profile();
        let inputs = [(5.0, 1.0, 20.0), (3.5, 0.7, 15.0), (8.0, 1.8, 40.0)];

        for (i, (dist, carbon, dur)) in inputs.iter().enumerate() {
            profile.log_commute(
                *dist,
                VehicleType::Walk,
                *dur,
                *carbon,
                None,
                at(&format!("2024-03-15T0{}:00:00Z", i + 1)),
            );
        }

        assert_eq!(profile.stats.total_commutes, 3);
        assert_eq!(profile.commutes.len(), 3);
        assert!((profile.stats.total_distance_km - 16.5).abs() < 1e-9);
        assert!((profile.stats.total_carbon_saved_kg - 3.5).abs() < 1e-9);

        // Most recent first
        assert!(profile.commutes[0].logged_at > profile.commutes[1].logged_at);
        assert!(profile.commutes[1].logged_at > profile.commutes[2].logged_at);
    }

    #[test]
    fn commute_can_level_up() {
        let mut profile = new_profile();

        // 56 km walking -> floor(56 * 2.0 * 10) = 1120 >= 1000
        let outcome = profile.log_commute(
            56.0,
            VehicleType::Walk,
            600.0,
            12.0,
            None,
            at("2024-03-15T08:30:00Z"),
        );

        assert!(outcome.leveled_up);
        assert_eq!(profile.stats.level, 2);
        assert_eq!(profile.stats.xp, 120);
    }

    #[test]
    fn commute_route_is_stored_encoded() {
        let mut profile = new_profile();
        let route = vec![
            LatLng {
                lat: 37.7749,
                lng: -122.4194,
            },
            LatLng {
                lat: 37.7793,
                lng: -122.4192,
            },
        ];

        let outcome = profile.log_commute(
            1.0,
            VehicleType::Bike,
            5.0,
            0.2,
            Some(&route),
            at("2024-03-15T08:30:00Z"),
        );

        assert!(outcome.entry.route_polyline.is_some());
        let decoded = outcome.entry.route().unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn session_log_is_bounded() {
        let mut profile = new_profile();
        for i in 0..SESSION_LOG_LIMIT + 10 {
            profile.log_commute(
                1.0,
                VehicleType::Walk,
                5.0,
                0.1,
                None,
                at("2024-03-15T08:00:00Z") + chrono::Duration::minutes(i as i64),
            );
        }
        assert_eq!(profile.commutes.len(), SESSION_LOG_LIMIT);
        // Stats still count everything
        assert_eq!(
            profile.stats.total_commutes as usize,
            SESSION_LOG_LIMIT + 10
        );
    }

    #[test]
    fn completing_a_challenge_does_not_credit_points() {
        let mut profile = new_profile();
        let before = profile.stats.total_points;

        assert!(profile.complete_challenge("morning_rush", at("2024-03-15T08:30:00Z")));

        assert_eq!(profile.stats.total_points, before);
        let view = profile.challenges_view(at("2024-03-15T08:30:00Z"));
        assert!(view.iter().find(|c| c.id == "morning_rush").unwrap().complete);
    }

    #[test]
    fn claiming_credits_reward_exactly_once() {
        let mut profile = new_profile();
        let before = profile.stats.total_points;
        let now = at("2024-03-15T08:30:00Z");

        profile.complete_challenge("morning_rush", now);

        assert_eq!(profile.claim_challenge_reward("morning_rush", now), Some(50));
        assert_eq!(profile.stats.total_points, before + 50);

        // Second claim is refused and credits nothing
        assert_eq!(profile.claim_challenge_reward("morning_rush", now), None);
        assert_eq!(profile.stats.total_points, before + 50);
    }

    #[test]
    fn unknown_challenge_ids_are_silent_noops() {
        let mut profile = new_profile();
        let now = at("2024-03-15T08:30:00Z");

        assert!(!profile.complete_challenge("bogus", now));
        assert!(!profile.advance_challenge("bogus", 1.0, now));
        assert_eq!(profile.claim_challenge_reward("bogus", now), None);
    }
}
