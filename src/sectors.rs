//! Sector boundaries: derivation from the reference lap and propagation
//! onto every lap.
//!
//! Boundaries are materialized once, at the quarter points of the fastest
//! valid lap, as detection lines half the width of start/finish. Every lap is
//! then swept with the same segment-intersection test used for lap splitting;
//! a crossing identity is purely geometric, never a distance match. After the
//! synthesized crossing samples are spliced in, the lap's relative fields are
//! rebuilt from scratch because insertion invalidates every running total
//! after the insertion point.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionLine;
use crate::geometry::segment_intersection;
use crate::lap::{Lap, SectorTime};
use crate::sample::Sample;
use crate::{AnalysisConfig, GpsPoint};

/// A sector boundary: a detection line plus display metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorBoundary {
    /// The crossing-detection segment
    pub line: DetectionLine,
    /// Distance from lap start at which this boundary sits on the reference
    /// lap, in meters. Display/labeling only.
    pub start_distance_m: f64,
    /// Nominal sector length in meters. Display/labeling only.
    pub length_m: f64,
}

/// Derive the sector boundaries from the reference (fastest valid) lap.
///
/// The reference lap's total distance defines the track length; boundaries
/// sit at its quarter points (for the default four sectors). Each boundary's
/// anchor, direction and perpendicular come from a sample interpolated at the
/// exact boundary distance between the bracketing pair, exactly as lap-split
/// boundary samples are synthesized. Returns an empty list when the reference
/// lap is degenerate (no length).
pub fn compute_sector_boundaries(
    reference: &Lap,
    config: &AnalysisConfig,
    origin: &GpsPoint,
) -> Vec<SectorBoundary> {
    let samples = reference.samples();
    let total = reference.total_distance_m();
    if samples.len() < 2 || total <= 0.0 || config.sector_count < 2 {
        return Vec::new();
    }

    let sector_length = total / config.sector_count as f64;
    let mut boundaries = Vec::with_capacity(config.sector_count - 1);

    for k in 1..config.sector_count {
        let target = sector_length * k as f64;
        let hi = samples
            .partition_point(|s| s.lap_distance_m < target)
            .min(samples.len() - 1)
            .max(1);
        let lo = hi - 1;

        let span = samples[hi].lap_distance_m - samples[lo].lap_distance_m;
        let t = if span > 0.0 {
            (target - samples[lo].lap_distance_m) / span
        } else {
            0.0
        };
        let anchor = Sample::interpolate_between(&samples[lo], &samples[hi], t, origin);

        boundaries.push(SectorBoundary {
            line: DetectionLine {
                anchor_gps: anchor.gps(),
                anchor: anchor.position,
                direction: anchor.direction,
                perpendicular: anchor.perpendicular,
                half_width_m: config.line_half_width_m / 2.0,
            },
            start_distance_m: target,
            length_m: sector_length,
        });
    }

    debug!(
        "Fixed {} sector boundaries from lap {} ({:.0} m track)",
        boundaries.len(),
        reference.index(),
        total
    );
    boundaries
}

impl Lap {
    /// Derive a new lap with sector-crossing samples spliced in and sector
    /// times computed.
    ///
    /// Every consecutive sample pair is swept against each boundary in time
    /// order; the first crossing wins per boundary (repeated crossings from
    /// GPS noise near a line are ignored). There is no minimum-sample guard
    /// here: distinct boundaries may legitimately be crossed close together.
    ///
    /// The returned lap preserves index and color; lap-relative fields are
    /// recomputed over the extended sample list, and series are left for the
    /// caller to rebuild.
    pub fn with_injected_sectors(
        &self,
        boundaries: &[SectorBoundary],
        origin: &GpsPoint,
    ) -> Lap {
        let samples = self.samples();
        let mut crossings: Vec<Sample> = Vec::new();

        for (k, boundary) in boundaries.iter().enumerate() {
            let (q1, q2) = boundary.line.endpoints();
            for i in 1..samples.len() {
                if let Some(t) =
                    segment_intersection(samples[i - 1].position, samples[i].position, q1, q2)
                {
                    let mut synth = Sample::interpolate_between(&samples[i - 1], &samples[i], t, origin);
                    synth.sector_boundary = Some(k as u8);
                    crossings.push(synth);
                    break;
                }
            }
        }

        crossings.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));

        // Splice in time order; a crossing at an existing sample's exact
        // timestamp lands after it.
        let mut merged = Vec::with_capacity(samples.len() + crossings.len());
        let mut pending = crossings.into_iter().peekable();
        for sample in samples {
            while pending
                .peek()
                .is_some_and(|c| c.timestamp_ms < sample.timestamp_ms)
            {
                merged.push(pending.next().unwrap());
            }
            merged.push(sample.clone());
        }
        merged.extend(pending);

        let mut lap = self.replaced_with(merged);
        let sectors = derive_sector_times(&lap, boundaries.len());
        lap.set_sectors(sectors);
        lap
    }
}

/// Sector times from the positions of tagged crossing samples.
///
/// Sector `k` runs from boundary `k-1` to boundary `k`; sector 0 opens at the
/// lap's first sample and the last sector closes at its last. A sector whose
/// bounding crossing is missing is omitted rather than estimated.
fn derive_sector_times(lap: &Lap, boundary_count: usize) -> Vec<SectorTime> {
    let samples = lap.samples();
    if samples.is_empty() || boundary_count == 0 {
        return Vec::new();
    }

    let mut crossing_index: Vec<Option<usize>> = vec![None; boundary_count];
    for (i, sample) in samples.iter().enumerate() {
        if let Some(k) = sample.sector_boundary {
            let k = k as usize;
            if k < boundary_count && crossing_index[k].is_none() {
                crossing_index[k] = Some(i);
            }
        }
    }

    let mut sectors = Vec::with_capacity(boundary_count + 1);
    for sector in 0..=boundary_count {
        let start_index = if sector == 0 {
            Some(0)
        } else {
            crossing_index[sector - 1]
        };
        let end_index = if sector == boundary_count {
            Some(samples.len() - 1)
        } else {
            crossing_index[sector]
        };

        if let (Some(start_index), Some(end_index)) = (start_index, end_index) {
            sectors.push(SectorTime {
                sector,
                time_ms: samples[end_index].lap_time_ms - samples[start_index].lap_time_ms,
                start_index,
                end_index,
            });
        }
    }
    sectors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vec2;
    use crate::projection::to_gps;
    use crate::sample::{enrich, project};

    const ORIGIN: GpsPoint = GpsPoint {
        latitude: 47.2195,
        longitude: 14.7646,
    };
    const RADIUS_M: f64 = 200.0;

    fn circle_lap(n: usize, circuits: f64) -> Lap {
        let mut samples: Vec<Sample> = (0..n)
            .map(|i| {
                let theta = circuits * std::f64::consts::TAU * i as f64 / (n - 1) as f64;
                let position = Vec2::new(
                    500.0 + RADIUS_M * theta.cos(),
                    500.0 + RADIUS_M * theta.sin(),
                );
                let gps = to_gps(position, &ORIGIN);
                Sample::new(
                    9,
                    i as f64 * 100.0,
                    gps.latitude,
                    gps.longitude,
                    100.0,
                    0.0,
                    650.0,
                )
            })
            .collect();
        project(&mut samples, &ORIGIN);
        enrich(&mut samples);
        Lap::new(0, samples)
    }

    #[test]
    fn test_boundaries_at_quarter_points() {
        let reference = circle_lap(200, 1.0);
        let config = AnalysisConfig::default();
        let boundaries = compute_sector_boundaries(&reference, &config, &ORIGIN);

        assert_eq!(boundaries.len(), 3);
        let total = reference.total_distance_m();
        for (k, boundary) in boundaries.iter().enumerate() {
            let expected = total * (k + 1) as f64 / 4.0;
            assert!((boundary.start_distance_m - expected).abs() < 1e-9);
            assert!((boundary.length_m - total / 4.0).abs() < 1e-9);
            assert_eq!(boundary.line.half_width_m, 10.0);
            // Anchors sit on the circle
            let radial = boundary.line.anchor.sub(Vec2::new(500.0, 500.0)).length();
            assert!((radial - RADIUS_M).abs() < 1.0);
        }
    }

    #[test]
    fn test_degenerate_reference() {
        let lap = Lap::new(0, Vec::new());
        let boundaries = compute_sector_boundaries(&lap, &AnalysisConfig::default(), &ORIGIN);
        assert!(boundaries.is_empty());
    }

    #[test]
    fn test_injection_full_lap() {
        let reference = circle_lap(200, 1.0);
        let config = AnalysisConfig::default();
        let boundaries = compute_sector_boundaries(&reference, &config, &ORIGIN);

        let injected = reference.with_injected_sectors(&boundaries, &ORIGIN);
        assert_eq!(injected.samples().len(), reference.samples().len() + 3);

        let sectors = injected.sector_data();
        assert_eq!(sectors.len(), 4);

        // Strictly increasing sector extents, non-negative times
        for pair in sectors.windows(2) {
            assert!(pair[1].start_index == pair[0].end_index);
            let start_d = injected.samples()[pair[1].start_index].lap_distance_m;
            let end_d = injected.samples()[pair[1].end_index].lap_distance_m;
            assert!(end_d > start_d);
        }
        for sector in sectors {
            assert!(sector.time_ms >= 0.0);
        }

        // Telescoping sum equals the lap time
        let sum: f64 = sectors.iter().map(|s| s.time_ms).sum();
        assert!((sum - injected.total_time_ms()).abs() < 1e-6);
        assert!(!injected.sector_sum_mismatch(config.sector_sum_tolerance_ms));
    }

    #[test]
    fn test_relative_fields_rebuilt_after_splice() {
        let reference = circle_lap(200, 1.0);
        let boundaries =
            compute_sector_boundaries(&reference, &AnalysisConfig::default(), &ORIGIN);
        let injected = reference.with_injected_sectors(&boundaries, &ORIGIN);

        let samples = injected.samples();
        assert_eq!(samples[0].lap_distance_m, 0.0);
        for pair in samples.windows(2) {
            assert!(pair[1].lap_distance_m >= pair[0].lap_distance_m);
            assert!(pair[1].lap_time_ms >= pair[0].lap_time_ms);
        }
    }

    #[test]
    fn test_first_crossing_wins_on_repeated_pass() {
        // Boundaries from a one-circuit reference; the target lap keeps going
        // for 1.3 circuits and crosses the first boundary twice.
        let reference = circle_lap(200, 1.0);
        let boundaries =
            compute_sector_boundaries(&reference, &AnalysisConfig::default(), &ORIGIN);

        let long_lap = circle_lap(260, 1.3);
        let injected = long_lap.with_injected_sectors(&boundaries, &ORIGIN);

        let tagged: Vec<_> = injected
            .samples()
            .iter()
            .filter(|s| s.sector_boundary == Some(0))
            .collect();
        assert_eq!(tagged.len(), 1);
        // The earlier pass (~25% of the lap) was kept, not the one near 96%
        assert!(tagged[0].lap_time_ms < injected.total_time_ms() * 0.5);

        assert_eq!(injected.sector_data().len(), 4);
    }

    #[test]
    fn test_uncrossed_boundary_leaves_sector_absent() {
        let reference = circle_lap(200, 1.0);
        let mut boundaries =
            compute_sector_boundaries(&reference, &AnalysisConfig::default(), &ORIGIN);
        // Move the middle boundary far off the track
        boundaries[1].line.anchor = Vec2::new(5000.0, 5000.0);

        let injected = reference.with_injected_sectors(&boundaries, &ORIGIN);
        let sectors = injected.sector_data();

        // Sectors 1 and 2 both need boundary 1; only sectors 0 and 3 remain
        assert_eq!(sectors.len(), 2);
        assert_eq!(sectors[0].sector, 0);
        assert_eq!(sectors[1].sector, 3);
        assert!(injected.sector_sum_mismatch(10.0));
    }
}
