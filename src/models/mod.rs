// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod badge;
pub mod challenge;
pub mod commute;
pub mod stats;
pub mod user;
pub mod vehicle;

pub use badge::Badge;
pub use challenge::{Challenge, ChallengeKind, ChallengeState};
pub use commute::{CommuteLog, LatLng};
pub use stats::UserStats;
pub use user::User;
pub use vehicle::{Vehicle, VehicleType};
