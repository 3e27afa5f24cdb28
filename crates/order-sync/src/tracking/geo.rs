//! Spherical geometry helpers.

use crate::model::GeoPoint;

/// Mean Earth radius (IUGG), meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance in meters.
pub fn haversine_m(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Projects `p` onto a flat east/north plane (meters) centred on `origin`.
///
/// Equirectangular; accurate to well under a meter across a city.
pub fn to_local(origin: GeoPoint, p: GeoPoint) -> (f64, f64) {
    let east = (p.lng - origin.lng).to_radians() * origin.lat.to_radians().cos() * EARTH_RADIUS_M;
    let north = (p.lat - origin.lat).to_radians() * EARTH_RADIUS_M;
    (east, north)
}

/// Inverse of [`to_local`].
pub fn from_local(origin: GeoPoint, east: f64, north: f64) -> GeoPoint {
    let lat = origin.lat + (north / EARTH_RADIUS_M).to_degrees();
    let cos_lat = origin.lat.to_radians().cos().max(1e-9);
    let lng = origin.lng + (east / (EARTH_RADIUS_M * cos_lat)).to_degrees();
    GeoPoint::new(lat, lng)
}

pub fn is_valid(p: GeoPoint) -> bool {
    p.lat.is_finite()
        && p.lng.is_finite()
        && (-90.0..=90.0).contains(&p.lat)
        && (-180.0..=180.0).contains(&p.lng)
}
