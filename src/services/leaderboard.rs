// SPDX-License-Identifier: MIT

//! Leaderboard ranking.
//!
//! The store supplies an ordered page of users (points descending); this
//! module assigns dense 1-based ranks in result order. Ranks are not
//! maintained incrementally.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::User;

/// A ranked leaderboard row.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub name: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub points: u64,
    pub avatar: String,
    /// Profile id, used to spot the requesting user in the page
    #[serde(skip)]
    pub user_id: String,
}

/// Assign 1-based ranks to an already-ordered page of users.
pub fn assign_ranks(users: Vec<User>) -> Vec<LeaderboardEntry> {
    users
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: (i + 1) as u32,
            name: u.name,
            points: u.total_points,
            avatar: u.avatar,
            user_id: u.user_id,
        })
        .collect()
}
