use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A raw fix as reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub lat: f64,
    pub lng: f64,
    pub accuracy_m: f64,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(lat: f64, lng: f64, accuracy_m: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lng,
            accuracy_m,
            timestamp,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Velocity in a local east/north frame, meters per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub east_mps: f64,
    pub north_mps: f64,
}

impl Velocity {
    pub fn speed(&self) -> f64 {
        self.east_mps.hypot(self.north_mps)
    }
}

/// What consumers of a track see.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedPosition {
    pub lat: f64,
    pub lng: f64,
    pub velocity: Velocity,
}

impl SmoothedPosition {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}
