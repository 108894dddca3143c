// SPDX-License-Identifier: MIT

//! Business logic services.

pub mod firebase_auth;
pub mod leaderboard;
pub mod progression;

pub use firebase_auth::{FirebaseAuthError, FirebaseTokenVerifier, VerifiedFirebaseUser};
pub use leaderboard::LeaderboardEntry;
pub use progression::{CommuteOutcome, GameProfile};
