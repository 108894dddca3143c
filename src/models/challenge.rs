// SPDX-License-Identifier: MIT

//! Challenge templates and per-user progress state.
//!
//! Templates are fixed; per-user state is a progress map plus the set of
//! already-claimed rewards, stored at `challenge_progress/{user_id}`.
//! Expiry is bookkeeping only: nothing here evicts or resets an expired
//! challenge; an external refresh swaps in the next period's template set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::time_utils::format_utc_rfc3339;

/// Challenge cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeKind {
    Daily,
    Weekly,
    Special,
}

impl ChallengeKind {
    /// Template validity period from instantiation.
    fn period(&self) -> Duration {
        match self {
            ChallengeKind::Daily => Duration::hours(24),
            ChallengeKind::Weekly | ChallengeKind::Special => Duration::days(7),
        }
    }
}

/// Immutable challenge template.
#[derive(Debug, Clone)]
pub struct ChallengeTemplate {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub target: f64,
    pub reward: u64,
    pub kind: ChallengeKind,
}

/// The fixed challenge catalog.
pub static TEMPLATES: &[ChallengeTemplate] = &[
    ChallengeTemplate {
        id: "morning_rush",
        title: "Morning Rush",
        description: "Complete a commute before 9 AM",
        target: 1.0,
        reward: 50,
        kind: ChallengeKind::Daily,
    },
    ChallengeTemplate {
        id: "green_miles",
        title: "Green Miles",
        description: "Travel 10km by bike or walking",
        target: 10.0,
        reward: 100,
        kind: ChallengeKind::Daily,
    },
    ChallengeTemplate {
        id: "transit_streak",
        title: "Transit Streak",
        description: "Take public transit on 5 commutes this week",
        target: 5.0,
        reward: 250,
        kind: ChallengeKind::Weekly,
    },
    ChallengeTemplate {
        id: "earth_day_grand_prix",
        title: "Earth Day Grand Prix",
        description: "Participate in the global eco race",
        target: 50.0,
        reward: 500,
        kind: ChallengeKind::Special,
    },
];

/// Look up a challenge template.
pub fn lookup(id: &str) -> Option<&'static ChallengeTemplate> {
    TEMPLATES.iter().find(|t| t.id == id)
}

/// Per-user challenge state document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChallengeState {
    /// Current progress per challenge id
    #[serde(default)]
    pub progress: HashMap<String, f64>,
    /// Challenge ids whose reward has been claimed
    #[serde(default)]
    pub claimed: Vec<String>,
    #[serde(default)]
    pub updated_at: String,
}

impl ChallengeState {
    /// Current progress value for a challenge (0 if none recorded).
    pub fn current(&self, id: &str) -> f64 {
        self.progress.get(id).copied().unwrap_or(0.0)
    }

    /// Whether the challenge has reached its target.
    pub fn is_complete(&self, template: &ChallengeTemplate) -> bool {
        self.current(template.id) >= template.target
    }

    /// Force a challenge to its target, regardless of prior progress.
    ///
    /// Unknown ids mutate nothing. Idempotent.
    pub fn force_complete(&mut self, id: &str) -> bool {
        let Some(template) = lookup(id) else {
            return false;
        };
        self.progress.insert(id.to_string(), template.target);
        true
    }

    /// Advance progress by a non-negative delta. Unknown ids mutate nothing.
    pub fn advance(&mut self, id: &str, delta: f64) -> bool {
        if lookup(id).is_none() || !delta.is_finite() || delta < 0.0 {
            return false;
        }
        *self.progress.entry(id.to_string()).or_insert(0.0) += delta;
        true
    }

    /// Mark a completed, unclaimed challenge as claimed.
    ///
    /// Returns the reward to credit, or `None` when the challenge is
    /// unknown, incomplete, or already claimed. The caller credits the
    /// points; claiming here only records that the reward was taken.
    pub fn claim(&mut self, id: &str) -> Option<u64> {
        let template = lookup(id)?;
        if !self.is_complete(template) || self.claimed.iter().any(|c| c == id) {
            return None;
        }
        self.claimed.push(id.to_string());
        Some(template.reward)
    }
}

/// A challenge as presented to the client: template, progress, and expiry.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Challenge {
    pub id: String,
    pub title: String,
    pub description: String,
    pub target: f64,
    pub current: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub reward: u64,
    pub kind: ChallengeKind,
    /// RFC3339; informational only, progress keeps accruing past it
    pub expires_at: String,
    pub complete: bool,
    pub claimed: bool,
}

/// Merge per-user state onto the template catalog.
pub fn merge_state(state: &ChallengeState, now: DateTime<Utc>) -> Vec<Challenge> {
    TEMPLATES
        .iter()
        .map(|t| Challenge {
            id: t.id.to_string(),
            title: t.title.to_string(),
            description: t.description.to_string(),
            target: t.target,
            current: state.current(t.id),
            reward: t.reward,
            kind: t.kind,
            expires_at: format_utc_rfc3339(now + t.kind.period()),
            complete: state.is_complete(t),
            claimed: state.claimed.iter().any(|c| c == t.id),
        })
        .collect()
}
