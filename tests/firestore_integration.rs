// SPDX-License-Identifier: MIT

//! Firestore integration tests. Require the emulator:
//!
//! ```sh
//! gcloud emulators firestore start --host-port=localhost:8681
//! FIRESTORE_EMULATOR_HOST=localhost:8681 cargo test --test firestore_integration
//! ```

use chrono::Utc;
use ecorace::models::VehicleType;
use ecorace::services::GameProfile;

mod common;

#[tokio::test]
async fn test_profile_save_load_round_trip() {
    require_emulator!();
    let db = common::test_db().await;

    let user_id = format!("it-roundtrip-{}", Utc::now().timestamp_millis());
    let mut profile =
        GameProfile::onboard(&user_id, "Integration Racer", "🚀", VehicleType::Bike, Utc::now());

    let outcome = profile.log_commute(10.0, VehicleType::Bike, 30.0, 2.0, None, Utc::now());
    profile.complete_challenge("morning_rush", Utc::now());

    db.save_profile_with_commute(&profile, &outcome.entry)
        .await
        .expect("save should succeed");

    let loaded = db
        .load_profile(&user_id, 50)
        .await
        .expect("load should succeed")
        .expect("profile should exist");

    assert_eq!(loaded.user.name, "Integration Racer");
    assert_eq!(loaded.stats.total_points, profile.stats.total_points);
    assert_eq!(loaded.stats.total_commutes, 1);
    assert_eq!(loaded.commutes.len(), 1);
    assert_eq!(loaded.commutes[0].points, 180);
    assert_eq!(loaded.challenges.current("morning_rush"), 1.0);
}

#[tokio::test]
async fn test_unknown_user_loads_as_none() {
    require_emulator!();
    let db = common::test_db().await;

    let loaded = db
        .load_profile("it-definitely-missing-user", 50)
        .await
        .expect("load should succeed");

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_commute_pagination_is_most_recent_first() {
    require_emulator!();
    let db = common::test_db().await;

    let user_id = format!("it-pagination-{}", Utc::now().timestamp_millis());
    let mut profile =
        GameProfile::onboard(&user_id, "Paging Racer", "🚲", VehicleType::Bike, Utc::now());

    let base = Utc::now();
    for i in 0..5i64 {
        let outcome = profile.log_commute(
            1.0 + i as f64,
            VehicleType::Walk,
            10.0,
            0.2,
            None,
            base + chrono::Duration::minutes(i),
        );
        db.set_commute(&outcome.entry).await.expect("set_commute");
    }
    db.save_profile(&profile).await.expect("save_profile");

    let first_page = db
        .get_commutes_for_user(&user_id, None, 3)
        .await
        .expect("query");
    assert_eq!(first_page.len(), 3);
    for pair in first_page.windows(2) {
        assert!(pair[0].logged_at > pair[1].logged_at);
    }

    let cursor = ecorace::db::firestore::CommuteQueryCursor {
        logged_at: first_page.last().unwrap().logged_at.clone(),
        commute_id: first_page.last().unwrap().id.clone(),
    };
    let second_page = db
        .get_commutes_for_user(&user_id, Some(&cursor), 3)
        .await
        .expect("query");
    assert_eq!(second_page.len(), 2);
    assert!(second_page[0].logged_at < cursor.logged_at);
}

#[tokio::test]
async fn test_leaderboard_orders_by_points_descending() {
    require_emulator!();
    let db = common::test_db().await;

    let stamp = Utc::now().timestamp_millis();
    let scores = [("alpha", 500u64), ("beta", 1500), ("gamma", 900)];

    for (name, points) in scores {
        let mut profile = GameProfile::onboard(
            &format!("it-lb-{}-{}", name, stamp),
            name,
            "🏎️",
            VehicleType::Bike,
            Utc::now(),
        );
        profile.stats.total_points = points;
        profile.user.total_points = points;
        db.save_profile(&profile).await.expect("save_profile");
    }

    let page = db.query_leaderboard(50).await.expect("query");
    let ours: Vec<_> = page
        .iter()
        .filter(|u| u.user_id.ends_with(&stamp.to_string()))
        .collect();

    assert_eq!(ours.len(), 3);
    for pair in ours.windows(2) {
        assert!(pair[0].total_points >= pair[1].total_points);
    }
}
