//! Geographic primitives: validated coordinates, worker identifiers and
//! great-circle distance.
//!
//! A [`Coordinate`] can only be built through [`Coordinate::new`] (or a
//! deserializer that routes through it), so every coordinate reaching a
//! store has already passed range validation.

use std::fmt;

use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Mean earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = Error;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Validate and build a coordinate. Latitude must lie in [-90, 90] and
    /// longitude in [-180, 180]; NaN and infinities are rejected.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::invalid_input(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::invalid_input(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Haversine distance in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let (lat1, lon1) = (self.latitude.to_radians(), self.longitude.to_radians());
        let (lat2, lon2) = (other.latitude.to_radians(), other.longitude.to_radians());
        let sin_dlat = ((lat2 - lat1) * 0.5).sin();
        let sin_dlon = ((lon2 - lon1) * 0.5).sin();
        let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
        let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// H3 cell containing this coordinate at `resolution`.
    pub fn to_cell(&self, resolution: Resolution) -> Result<CellIndex, Error> {
        LatLng::new(self.latitude, self.longitude)
            .map(|ll| ll.to_cell(resolution))
            .map_err(|err| Error::invalid_input(err.to_string()))
    }

    /// Coordinate displaced by the given kilometre offsets. Used to place
    /// workers at known distances; latitude is clamped to the valid range and
    /// longitude wrapped.
    pub fn offset_km(&self, north_km: f64, east_km: f64) -> Coordinate {
        let dlat = (north_km / EARTH_RADIUS_KM).to_degrees();
        let cos_lat = self.latitude.to_radians().cos().max(1e-9);
        let dlon = (east_km / (EARTH_RADIUS_KM * cos_lat)).to_degrees();
        let latitude = (self.latitude + dlat).clamp(-90.0, 90.0);
        let mut longitude = self.longitude + dlon;
        if longitude > 180.0 {
            longitude -= 360.0;
        } else if longitude < -180.0 {
            longitude += 360.0;
        }
        Coordinate {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Opaque worker identifier. Ordered lexically, which is the tie-break for
/// equidistant candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_latitude() {
        let err = Coordinate::new(91.0, 13.4).expect_err("latitude 91 must fail");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(Coordinate::new(-90.5, 0.0).is_err());
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn rejects_out_of_range_longitude() {
        assert!(Coordinate::new(0.0, 180.1).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn haversine_matches_known_city_pair() {
        // Jakarta -> Bandung is roughly 120-130 km.
        let jakarta = Coordinate::new(-6.2088, 106.8456).expect("jakarta");
        let bandung = Coordinate::new(-6.9175, 107.6191).expect("bandung");
        let distance = jakarta.distance_km(&bandung);
        assert!(distance > 100.0 && distance < 150.0, "got {distance}");
        assert_eq!(jakarta.distance_km(&jakarta), 0.0);
    }

    #[test]
    fn offset_moves_by_requested_distance() {
        let origin = Coordinate::new(52.52, 13.405).expect("berlin");
        let moved = origin.offset_km(3.0, 4.0);
        let distance = origin.distance_km(&moved);
        assert!((distance - 5.0).abs() < 0.05, "got {distance}");
    }

    #[test]
    fn deserialization_validates_ranges() {
        let ok: Coordinate =
            serde_json::from_str(r#"{"latitude": 12.97, "longitude": 77.59}"#).expect("valid");
        assert_eq!(ok.latitude(), 12.97);
        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude": 91.0, "longitude": 0.0}"#);
        assert!(bad.is_err());
    }
}
