//! GPS samples, derived-field enrichment, and boundary-sample interpolation.
//!
//! A [`Sample`] is one fix from the data logger plus everything the pipeline
//! derives from it: the metric-plane position, per-pair elapsed time and
//! distance, unit movement direction, and lap-relative time/distance once the
//! sample belongs to a lap. Samples synthesized at detected crossings carry
//! the same fields as recorded ones and are marked `interpolated`.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::projection::{haversine_distance, to_gps, to_meters};
use crate::GpsPoint;

/// One GPS fix with its derived and lap-relative fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Number of satellites in the fix
    pub satellites: u16,
    /// Milliseconds since midnight, monotonic within a recording
    pub timestamp_ms: f64,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Speed in km/h
    pub speed_kmh: f64,
    /// Heading in degrees
    pub heading_deg: f64,
    /// Altitude in meters
    pub altitude_m: f64,

    /// Position in the local metric plane, set by projection
    pub position: Vec2,

    /// Time since the previous sample in milliseconds, set by enrichment
    pub elapsed_ms: f64,
    /// Haversine distance to the previous sample in meters, set by enrichment
    pub step_distance_m: f64,
    /// Unit movement direction in the metric plane, set by enrichment
    pub direction: Vec2,
    /// Unit perpendicular of the movement direction, set by enrichment
    pub perpendicular: Vec2,

    /// Time since the start of the containing lap in milliseconds
    pub lap_time_ms: f64,
    /// Distance from the start of the containing lap in meters
    pub lap_distance_m: f64,

    /// Whether this sample was synthesized at a detected crossing rather
    /// than recorded
    pub interpolated: bool,
    /// Which sector transition (0..2) this sample sits on, if any
    pub sector_boundary: Option<u8>,
}

impl Sample {
    /// Create a sample from the raw logger channels.
    ///
    /// Derived fields start zeroed; the pipeline fills them via projection,
    /// enrichment and lap construction.
    pub fn new(
        satellites: u16,
        timestamp_ms: f64,
        latitude: f64,
        longitude: f64,
        speed_kmh: f64,
        heading_deg: f64,
        altitude_m: f64,
    ) -> Self {
        Self {
            satellites,
            timestamp_ms,
            latitude,
            longitude,
            speed_kmh,
            heading_deg,
            altitude_m,
            position: Vec2::default(),
            elapsed_ms: 0.0,
            step_distance_m: 0.0,
            direction: Vec2::default(),
            perpendicular: Vec2::default(),
            lap_time_ms: 0.0,
            lap_distance_m: 0.0,
            interpolated: false,
            sector_boundary: None,
        }
    }

    /// The sample's GPS coordinate.
    pub fn gps(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// Synthesize a sample between `a` and `b` at parameter `t ∈ [0, 1]`.
    ///
    /// Every numeric channel is linearly interpolated; the metric position is
    /// interpolated and back-converted to GPS so position and coordinates stay
    /// consistent. The satellite count, the only integer channel, is rounded.
    /// Direction vectors are copied from `b`, whose enrichment describes the
    /// movement along exactly this pair. Lap-relative fields are left zeroed
    /// for the containing lap to recompute.
    pub fn interpolate_between(a: &Sample, b: &Sample, t: f64, origin: &GpsPoint) -> Sample {
        let position = Vec2::new(
            lerp(a.position.x, b.position.x, t),
            lerp(a.position.y, b.position.y, t),
        );
        let gps = to_gps(position, origin);

        Sample {
            satellites: lerp(a.satellites as f64, b.satellites as f64, t).round() as u16,
            timestamp_ms: lerp(a.timestamp_ms, b.timestamp_ms, t),
            latitude: gps.latitude,
            longitude: gps.longitude,
            speed_kmh: lerp(a.speed_kmh, b.speed_kmh, t),
            heading_deg: lerp(a.heading_deg, b.heading_deg, t),
            altitude_m: lerp(a.altitude_m, b.altitude_m, t),
            position,
            elapsed_ms: b.elapsed_ms * t,
            step_distance_m: b.step_distance_m * t,
            direction: b.direction,
            perpendicular: b.perpendicular,
            lap_time_ms: 0.0,
            lap_distance_m: 0.0,
            interpolated: true,
            sector_boundary: None,
        }
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Project every sample into the local metric plane anchored at `origin`.
pub fn project(samples: &mut [Sample], origin: &GpsPoint) {
    for sample in samples.iter_mut() {
        sample.position = to_meters(&sample.gps(), origin);
    }
}

/// Fill per-pair derived fields for the whole recording.
///
/// For every consecutive pair: elapsed time from the timestamps, haversine
/// distance, and the unit movement direction in the metric plane with its
/// perpendicular. The first sample copies the second's vectors and keeps zero
/// elapsed time and distance. Must run exactly once, after projection and
/// before any geometry-dependent detection.
pub fn enrich(samples: &mut [Sample]) {
    for i in 1..samples.len() {
        let (head, tail) = samples.split_at_mut(i);
        let prev = &head[i - 1];
        let curr = &mut tail[0];

        curr.elapsed_ms = curr.timestamp_ms - prev.timestamp_ms;
        curr.step_distance_m = haversine_distance(&prev.gps(), &curr.gps());
        curr.direction = curr.position.sub(prev.position).normalized();
        curr.perpendicular = curr.direction.perpendicular();
    }

    if samples.len() > 1 {
        let direction = samples[1].direction;
        let perpendicular = samples[1].perpendicular;
        samples[0].direction = direction;
        samples[0].perpendicular = perpendicular;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::to_meters;
    use crate::Bounds;

    fn enriched_pair() -> Vec<Sample> {
        let mut samples = vec![
            Sample::new(9, 1000.0, 47.2195, 14.7646, 100.0, 90.0, 650.0),
            Sample::new(9, 1100.0, 47.2195, 14.7650, 110.0, 90.0, 651.0),
            Sample::new(10, 1200.0, 47.2195, 14.7654, 120.0, 90.0, 652.0),
        ];
        let origin = Bounds::from_points(&[samples[0].gps(), samples[2].gps()])
            .unwrap()
            .min_corner();
        project(&mut samples, &origin);
        enrich(&mut samples);
        samples
    }

    #[test]
    fn test_enrich_pairs() {
        let samples = enriched_pair();

        assert_eq!(samples[0].elapsed_ms, 0.0);
        assert_eq!(samples[0].step_distance_m, 0.0);
        assert_eq!(samples[1].elapsed_ms, 100.0);
        assert!(samples[1].step_distance_m > 0.0);

        // Eastward travel: direction ~(1, 0) in the metric plane
        assert!((samples[1].direction.x - 1.0).abs() < 1e-3);
        assert!(samples[1].direction.y.abs() < 1e-3);
        assert!((samples[1].direction.length() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_enrich_first_sample_copies_second() {
        let samples = enriched_pair();
        assert_eq!(samples[0].direction, samples[1].direction);
        assert_eq!(samples[0].perpendicular, samples[1].perpendicular);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let samples = enriched_pair();
        let origin = GpsPoint::new(47.2195, 14.7646);

        let mid = Sample::interpolate_between(&samples[1], &samples[2], 0.5, &origin);
        assert!(mid.interpolated);
        assert_eq!(mid.timestamp_ms, 1150.0);
        assert_eq!(mid.speed_kmh, 115.0);
        assert_eq!(mid.altitude_m, 651.5);
        // 9.5 rounds up
        assert_eq!(mid.satellites, 10);
        assert_eq!(mid.direction, samples[2].direction);

        // Back-converted GPS agrees with the interpolated metric position
        let reprojected = to_meters(&mid.gps(), &origin);
        assert!((reprojected.x - mid.position.x).abs() < 1e-6);
        assert!((reprojected.y - mid.position.y).abs() < 1e-6);
    }

    #[test]
    fn test_interpolate_at_ends() {
        let samples = enriched_pair();
        let origin = GpsPoint::new(47.2195, 14.7646);

        let start = Sample::interpolate_between(&samples[1], &samples[2], 0.0, &origin);
        assert_eq!(start.timestamp_ms, samples[1].timestamp_ms);
        let end = Sample::interpolate_between(&samples[1], &samples[2], 1.0, &origin);
        assert_eq!(end.timestamp_ms, samples[2].timestamp_ms);
    }
}
