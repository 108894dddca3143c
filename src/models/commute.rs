// SPDX-License-Identifier: MIT

//! Commute log entries.
//!
//! Entries are immutable once created and stored most-recent-first. Routes
//! are persisted as encoded polylines (precision 5) rather than coordinate
//! arrays to keep documents compact.

use geo::{Coord, Haversine, Length, LineString};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::vehicle::VehicleType;

/// Polyline precision used for stored routes (5 digits, ~1m resolution).
pub const ROUTE_PRECISION: u32 = 5;

/// A geographic point on a commute route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Stored commute record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteLog {
    /// Unique within the user's log; document id is `{user_id}_{id}`
    pub id: String,
    pub user_id: String,
    /// When the commute was logged (RFC3339)
    pub logged_at: String,
    pub distance_km: f64,
    pub mode: VehicleType,
    pub duration_minutes: f64,
    pub carbon_saved_kg: f64,
    /// Points awarded for this commute (also credited to the user's stats)
    pub points: u64,
    /// Encoded polyline of the travelled route, if one was recorded
    #[serde(default)]
    pub route_polyline: Option<String>,
}

impl CommuteLog {
    /// Decode the stored route back into coordinates.
    pub fn route(&self) -> Option<Vec<LatLng>> {
        let encoded = self.route_polyline.as_deref()?;
        let line = polyline::decode_polyline(encoded, ROUTE_PRECISION).ok()?;
        Some(
            line.coords()
                .map(|c| LatLng { lat: c.y, lng: c.x })
                .collect(),
        )
    }

    /// Haversine length of the stored route in kilometers.
    ///
    /// Derived metadata only; the point formula always uses the logged
    /// distance.
    pub fn route_length_km(&self) -> Option<f64> {
        let encoded = self.route_polyline.as_deref()?;
        let line = polyline::decode_polyline(encoded, ROUTE_PRECISION).ok()?;
        Some(Haversine.length(&line) / 1000.0)
    }
}

/// Encode a submitted route for storage.
///
/// Returns `None` for empty routes or coordinates the encoder rejects
/// (out-of-range lat/lng).
pub fn encode_route(points: &[LatLng]) -> Option<String> {
    if points.is_empty() {
        return None;
    }
    let line = LineString::new(
        points
            .iter()
            .map(|p| Coord { x: p.lng, y: p.lat })
            .collect(),
    );
    polyline::encode_coordinates(line, ROUTE_PRECISION).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_route() -> Vec<LatLng> {
        vec![
            LatLng {
                lat: 37.7749,
                lng: -122.4194,
            },
            LatLng {
                lat: 37.7793,
                lng: -122.4192,
            },
            LatLng {
                lat: 37.7850,
                lng: -122.4064,
            },
        ]
    }

    fn make_log(route: Option<String>) -> CommuteLog {
        CommuteLog {
            id: "1700000000000-1".to_string(),
            user_id: "u1".to_string(),
            logged_at: "2024-03-15T08:00:00Z".to_string(),
            distance_km: 2.0,
            mode: VehicleType::Bike,
            duration_minutes: 9.0,
            carbon_saved_kg: 0.4,
            points: 36,
            route_polyline: route,
        }
    }

    #[test]
    fn route_round_trips_within_precision() {
        let original = sample_route();
        let encoded = encode_route(&original).expect("route should encode");
        let log = make_log(Some(encoded));

        let decoded = log.route().expect("route should decode");
        assert_eq!(decoded.len(), original.len());
        for (a, b) in decoded.iter().zip(original.iter()) {
            assert!((a.lat - b.lat).abs() < 1e-5);
            assert!((a.lng - b.lng).abs() < 1e-5);
        }
    }

    #[test]
    fn route_length_is_positive_and_finite() {
        let encoded = encode_route(&sample_route()).unwrap();
        let log = make_log(Some(encoded));

        let km = log.route_length_km().unwrap();
        assert!(km.is_finite());
        assert!(km > 0.0);
        // Three downtown-SF points span roughly 1-2 km
        assert!(km < 5.0);
    }

    #[test]
    fn missing_route_yields_none() {
        let log = make_log(None);
        assert!(log.route().is_none());
        assert!(log.route_length_km().is_none());
    }

    #[test]
    fn empty_route_does_not_encode() {
        assert!(encode_route(&[]).is_none());
    }
}
