// SPDX-License-Identifier: MIT

//! Vehicle catalog and the distance-to-points formula.
//!
//! The catalog is a fixed table shared by all users. A vehicle's eco-factor
//! converts distance into points; its unlock level gates selection.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Points awarded per eco-weighted kilometer.
pub const POINTS_PER_ECO_KM: f64 = 10.0;

/// Eco-factor applied when a commute's mode has no catalog entry.
pub const DEFAULT_ECO_FACTOR: f64 = 1.0;

/// Transport mode identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Walk,
    Bike,
    Scooter,
    Bus,
    ElectricCar,
}

impl VehicleType {
    /// Wire/storage identifier, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Walk => "walk",
            VehicleType::Bike => "bike",
            VehicleType::Scooter => "scooter",
            VehicleType::Bus => "bus",
            VehicleType::ElectricCar => "electric_car",
        }
    }
}

/// Static catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Vehicle {
    pub id: VehicleType,
    pub name: &'static str,
    pub icon: &'static str,
    /// Multiplier applied to distance when computing points
    pub eco_factor: f64,
    pub description: &'static str,
    /// Vehicle usable only once the user's level reaches this value
    pub unlock_level: u32,
}

/// The fixed vehicle catalog, ordered by eco-factor descending.
pub static CATALOG: &[Vehicle] = &[
    Vehicle {
        id: VehicleType::Walk,
        name: "Walking",
        icon: "🚶",
        eco_factor: 2.0,
        description: "Zero emissions, maximum eco points",
        unlock_level: 1,
    },
    Vehicle {
        id: VehicleType::Bike,
        name: "Bicycle",
        icon: "🚲",
        eco_factor: 1.8,
        description: "Fast and eco-friendly",
        unlock_level: 1,
    },
    Vehicle {
        id: VehicleType::Scooter,
        name: "E-Scooter",
        icon: "🛴",
        eco_factor: 1.5,
        description: "Electric mobility",
        unlock_level: 3,
    },
    Vehicle {
        id: VehicleType::Bus,
        name: "Public Transit",
        icon: "🚌",
        eco_factor: 1.3,
        description: "Shared transportation",
        unlock_level: 5,
    },
    Vehicle {
        id: VehicleType::ElectricCar,
        name: "Electric Car",
        icon: "⚡",
        eco_factor: 1.2,
        description: "Premium electric racing",
        unlock_level: 10,
    },
];

/// Look up a vehicle in the catalog.
pub fn lookup(id: VehicleType) -> Option<&'static Vehicle> {
    CATALOG.iter().find(|v| v.id == id)
}

/// Compute the points awarded for a commute.
///
/// `floor(distance_km * eco_factor * 10)`, with eco-factor 1.0 when the
/// vehicle is absent from the catalog.
pub fn commute_points(distance_km: f64, vehicle: Option<&Vehicle>) -> u64 {
    let factor = vehicle.map_or(DEFAULT_ECO_FACTOR, |v| v.eco_factor);
    (distance_km * factor * POINTS_PER_ECO_KM).floor() as u64
}
