//! Local planar projection and great-circle distance.
//!
//! The engine does all of its geometry in a local metric plane so that the
//! segment-intersection math operates in Euclidean meters rather than angular
//! degrees. The plane uses an equirectangular approximation anchored at one
//! origin per recording (the bounding box's minimum corner), which is accurate
//! to well under a meter at race-track spans of a few kilometers. Callers must
//! not assume correctness beyond that scale.
//!
//! Inter-sample distances stay in GPS space via haversine, where great-circle
//! accuracy matters more than a shared planar frame.

use geo::{Distance, Haversine, Point};

use crate::geometry::Vec2;
use crate::GpsPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Project a GPS coordinate into the local metric plane anchored at `origin`.
///
/// Longitude deltas are scaled by `cos(origin latitude)`, latitude deltas by
/// the Earth radius alone.
pub fn to_meters(point: &GpsPoint, origin: &GpsPoint) -> Vec2 {
    let lat_scale = origin.latitude.to_radians().cos();
    Vec2::new(
        (point.longitude - origin.longitude).to_radians() * lat_scale * EARTH_RADIUS_M,
        (point.latitude - origin.latitude).to_radians() * EARTH_RADIUS_M,
    )
}

/// Convert a local metric position back to GPS coordinates.
///
/// Inverse of [`to_meters`] for the same origin.
pub fn to_gps(position: Vec2, origin: &GpsPoint) -> GpsPoint {
    let lat_scale = origin.latitude.to_radians().cos();
    GpsPoint::new(
        origin.latitude + (position.y / EARTH_RADIUS_M).to_degrees(),
        origin.longitude + (position.x / (lat_scale * EARTH_RADIUS_M)).to_degrees(),
    )
}

/// Great-circle distance between two GPS points in meters.
pub fn haversine_distance(a: &GpsPoint, b: &GpsPoint) -> f64 {
    Haversine::distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}
