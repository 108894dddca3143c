// SPDX-License-Identifier: MIT

//! End-to-end engine behavior across commutes, leveling, vehicles, and
//! challenges.

use chrono::{DateTime, Duration, Utc};
use ecorace::models::VehicleType;
use ecorace::services::GameProfile;


fn at(rfc3339: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(rfc3339)
        .unwrap()
        .with_timezone(&Utc)
}

fn fresh_profile() -> GameProfile {
    GameProfile::onboard(
        "racer-1",
        "EcoRacer",
        "🌟",
        VehicleType::Walk,
        at("2024-03-01T07:00:00Z"),
    )
}

#[test]
fn aggregates_match_the_sum_of_logged_commutes() {
    let mut profile = fresh_profile();
    let commutes = [
        (4.0, VehicleType::Walk, 38.0, 0.9),
        (12.0, VehicleType::Bike, 41.0, 2.6),
        (7.5, VehicleType::Bike, 26.0, 1.7),
        (0.0, VehicleType::Walk, 0.0, 0.0),
    ];

    let mut start = at("2024-03-01T08:00:00Z");
    for (distance, mode, duration, carbon) in commutes {
        profile.log_commute(distance, mode, duration, carbon, None, start);
        start = start + Duration::hours(2);
    }

    assert_eq!(profile.stats.total_commutes, 4);
    assert_eq!(profile.commutes.len(), 4);
    assert!((profile.stats.total_distance_km - 23.5).abs() < 1e-9);
    assert!((profile.stats.total_carbon_saved_kg - 5.2).abs() < 1e-9);

    // Most recent first, and every entry's points are reflected in the total
    let logged_points: u64 = profile.commutes.iter().map(|c| c.points).sum();
    assert_eq!(profile.stats.total_points, 100 + logged_points);
    for pair in profile.commutes.windows(2) {
        assert!(pair[0].logged_at >= pair[1].logged_at);
    }
}

#[test]
fn leveling_up_unlocks_vehicles() {
    let mut profile = fresh_profile();
    let mut now = at("2024-03-01T08:00:00Z");

    // Level 1: scooter (unlock level 3) is refused
    assert!(!profile.select_vehicle(VehicleType::Scooter, now));

    // Grind commutes until level 3
    while profile.stats.level < 3 {
        profile.log_commute(25.0, VehicleType::Walk, 240.0, 5.0, None, now);
        now = now + Duration::hours(3);
    }

    assert!(profile.select_vehicle(VehicleType::Scooter, now));
    assert_eq!(profile.user.selected_vehicle, VehicleType::Scooter);

    // Electric car needs level 10, still locked
    assert!(!profile.select_vehicle(VehicleType::ElectricCar, now));
    assert_eq!(profile.user.selected_vehicle, VehicleType::Scooter);
}

#[test]
fn xp_invariant_holds_across_a_full_day_of_play() {
    let mut profile = fresh_profile();
    let mut now = at("2024-03-01T06:00:00Z");

    for i in 0..40 {
        let distance = 1.0 + (i % 9) as f64 * 2.5;
        profile.log_commute(distance, VehicleType::Bike, 10.0, 0.4, None, now);
        now = now + Duration::minutes(20);

        assert!(
            profile.stats.xp < profile.stats.xp_to_next_level,
            "xp {} >= threshold {} after commute {}",
            profile.stats.xp,
            profile.stats.xp_to_next_level,
            i
        );
    }
}

#[test]
fn challenge_progress_feeds_into_points_only_via_claim() {
    let mut profile = fresh_profile();
    let now = at("2024-03-01T08:00:00Z");

    profile.advance_challenge("green_miles", 6.0, now);
    profile.advance_challenge("green_miles", 5.5, now);

    let view = profile.challenges_view(now);
    let green = view.iter().find(|c| c.id == "green_miles").unwrap();
    assert!(green.complete);
    assert_eq!(green.current, 11.5);

    let before = profile.stats.total_points;
    let reward = profile.claim_challenge_reward("green_miles", now);
    assert_eq!(reward, Some(100));
    assert_eq!(profile.stats.total_points, before + 100);
}

#[test]
fn rank_is_externally_supplied_and_stored_verbatim() {
    let mut profile = fresh_profile();
    assert_eq!(profile.stats.rank, 0);

    profile.set_rank(3);
    assert_eq!(profile.stats.rank, 3);

    // Engine operations never touch it
    profile.log_commute(
        5.0,
        VehicleType::Bike,
        20.0,
        1.0,
        None,
        at("2024-03-01T09:00:00Z"),
    );
    assert_eq!(profile.stats.rank, 3);
}
