// SPDX-License-Identifier: MIT

//! Badge templates and the per-user unlock merge.
//!
//! Badge eligibility is decided outside this service (the result arrives as
//! a list of unlocked ids on the user document); this module only merges
//! that list onto the static template catalog.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Badge id granted during onboarding.
pub const STARTER_BADGE: &str = "first_ride";

/// Immutable badge template.
#[derive(Debug, Clone)]
pub struct BadgeTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

/// The fixed badge catalog.
pub static TEMPLATES: &[BadgeTemplate] = &[
    BadgeTemplate {
        id: "first_ride",
        name: "First Lap",
        description: "Complete your first commute",
        icon: "🏁",
    },
    BadgeTemplate {
        id: "green_pit_boss",
        name: "Green Pit Boss",
        description: "Save 10kg of CO2",
        icon: "🌿",
    },
    BadgeTemplate {
        id: "speed_demon",
        name: "Speed Demon",
        description: "Complete 5 commutes in one day",
        icon: "⚡",
    },
    BadgeTemplate {
        id: "eco_champion",
        name: "Eco Champion",
        description: "Reach Level 10",
        icon: "🏆",
    },
    BadgeTemplate {
        id: "streak_master",
        name: "Streak Master",
        description: "7 day commute streak",
        icon: "🔥",
    },
    BadgeTemplate {
        id: "carbon_hero",
        name: "Carbon Hero",
        description: "Save 100kg of CO2",
        icon: "🌍",
    },
];

/// A badge as presented to the client: template plus unlock state.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub unlocked: bool,
}

/// Merge a set of unlocked badge ids onto the template catalog.
///
/// Ids not present in the catalog are ignored.
pub fn merge_unlocked(unlocked: &[String]) -> Vec<Badge> {
    TEMPLATES
        .iter()
        .map(|t| Badge {
            id: t.id.to_string(),
            name: t.name.to_string(),
            description: t.description.to_string(),
            icon: t.icon.to_string(),
            unlocked: unlocked.iter().any(|u| u == t.id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn template_ids_are_unique() {
        let ids: HashSet<_> = TEMPLATES.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), TEMPLATES.len());
    }

    #[test]
    fn merge_flags_only_listed_badges() {
        let unlocked = vec!["first_ride".to_string(), "carbon_hero".to_string()];
        let merged = merge_unlocked(&unlocked);

        assert_eq!(merged.len(), TEMPLATES.len());
        for badge in &merged {
            let expected = badge.id == "first_ride" || badge.id == "carbon_hero";
            assert_eq!(badge.unlocked, expected, "badge {}", badge.id);
        }
    }

    #[test]
    fn unknown_unlocked_ids_are_ignored() {
        let unlocked = vec!["no_such_badge".to_string()];
        let merged = merge_unlocked(&unlocked);
        assert!(merged.iter().all(|b| !b.unlocked));
    }

    #[test]
    fn starter_badge_exists_in_catalog() {
        assert!(TEMPLATES.iter().any(|t| t.id == STARTER_BADGE));
    }
}
