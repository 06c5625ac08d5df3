//! Comparable per-lap series and multi-key interpolation.
//!
//! A series is an ordered list of points carrying a value plus three parallel
//! x-axes: distance from lap start, time from lap start, and normalized
//! position. One bracket-and-lerp routine, parameterized over x and y
//! extraction, answers queries on any axis; the series kinds are tagged
//! variants over that single engine rather than a type hierarchy.
//!
//! Delta series match the reference lap by lap-relative distance, never by
//! sample index, because sample density differs between laps.

use serde::{Deserialize, Serialize};

use crate::lap::Lap;

/// A single point of a comparable series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// The series value (km/h, ms, ...)
    pub value: f64,
    /// Distance from lap start in meters
    pub distance_m: f64,
    /// Time from lap start in milliseconds
    pub time_ms: f64,
    /// Distance divided by total lap distance, in `[0, 1]`
    pub normalized: f64,
}

/// The named series kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    /// Speed over the lap
    Speed,
    /// Time gained/lost versus the reference lap, in milliseconds
    TimeDelta,
    /// Speed difference versus the reference lap, in km/h
    SpeedDelta,
    /// First difference of the time delta between consecutive samples
    DeltaRate,
}

impl ChartKind {
    /// Whether this series can only be computed against a reference lap.
    pub fn needs_reference(&self) -> bool {
        !matches!(self, ChartKind::Speed)
    }

    /// Whether higher values are better (used for delta coloring).
    pub fn higher_is_better(&self) -> bool {
        matches!(self, ChartKind::Speed | ChartKind::SpeedDelta)
    }
}

/// A queryable, ordered series of points for one lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub kind: ChartKind,
    pub points: Vec<SeriesPoint>,
}

impl Series {
    /// Value at a distance from lap start, or `None` outside the covered range.
    pub fn value_at_distance(&self, distance_m: f64) -> Option<f64> {
        interpolate(&self.points, |p| p.distance_m, |p| p.value, distance_m)
    }

    /// Value at a time from lap start, or `None` outside the covered range.
    pub fn value_at_time(&self, time_ms: f64) -> Option<f64> {
        interpolate(&self.points, |p| p.time_ms, |p| p.value, time_ms)
    }

    /// Value at a normalized position, or `None` outside the covered range.
    pub fn value_at_normalized(&self, normalized: f64) -> Option<f64> {
        interpolate(&self.points, |p| p.normalized, |p| p.value, normalized)
    }
}

/// Bracket-and-lerp over any pair of extracted axes.
///
/// `points` must be non-decreasing in the x extraction. Queries outside the
/// covered span return `None`; no extrapolation, no clamping. A query landing
/// exactly on a knot returns that knot's y.
pub fn interpolate<X, Y>(points: &[SeriesPoint], x: X, y: Y, at: f64) -> Option<f64>
where
    X: Fn(&SeriesPoint) -> f64,
    Y: Fn(&SeriesPoint) -> f64,
{
    if points.is_empty() {
        return None;
    }

    let hi = points.partition_point(|p| x(p) < at);
    if hi == points.len() {
        return None;
    }
    if hi == 0 {
        return if x(&points[0]) == at {
            Some(y(&points[0]))
        } else {
            None
        };
    }

    let (lo, hi) = (&points[hi - 1], &points[hi]);
    if x(hi) == at {
        // Exact knot hit: return the knot value with no interpolation error
        return Some(y(hi));
    }
    let t = (at - x(lo)) / (x(hi) - x(lo));
    Some(y(lo) + (y(hi) - y(lo)) * t)
}

/// Build every series available for a lap.
///
/// `reference_speed` is the reference lap's speed series; without it only the
/// raw speed series is produced and the delta series are absent.
pub fn build_lap_series(lap: &Lap, reference_speed: Option<&Series>) -> Vec<Series> {
    let base = lap_points(lap);
    let mut series = vec![Series {
        kind: ChartKind::Speed,
        points: base.clone(),
    }];

    let reference = match reference_speed {
        Some(reference) => reference,
        None => return series,
    };

    // Reference values looked up at the current lap's distances; points
    // beyond the reference's covered range are dropped, not extrapolated.
    let time_delta: Vec<SeriesPoint> = base
        .iter()
        .filter_map(|p| {
            let ref_time = interpolate(
                &reference.points,
                |r| r.distance_m,
                |r| r.time_ms,
                p.distance_m,
            )?;
            Some(SeriesPoint {
                value: p.time_ms - ref_time,
                ..*p
            })
        })
        .collect();

    let speed_delta: Vec<SeriesPoint> = base
        .iter()
        .filter_map(|p| {
            let ref_speed = reference.value_at_distance(p.distance_m)?;
            Some(SeriesPoint {
                value: p.value - ref_speed,
                ..*p
            })
        })
        .collect();

    let delta_rate: Vec<SeriesPoint> = time_delta
        .iter()
        .enumerate()
        .map(|(i, p)| SeriesPoint {
            value: if i == 0 {
                0.0
            } else {
                p.value - time_delta[i - 1].value
            },
            ..*p
        })
        .collect();

    series.push(Series {
        kind: ChartKind::TimeDelta,
        points: time_delta,
    });
    series.push(Series {
        kind: ChartKind::SpeedDelta,
        points: speed_delta,
    });
    series.push(Series {
        kind: ChartKind::DeltaRate,
        points: delta_rate,
    });
    series
}

fn lap_points(lap: &Lap) -> Vec<SeriesPoint> {
    let total = lap.total_distance_m();
    lap.samples()
        .iter()
        .map(|s| SeriesPoint {
            value: s.speed_kmh,
            distance_m: s.lap_distance_m,
            time_ms: s.lap_time_ms,
            normalized: if total > 0.0 {
                s.lap_distance_m / total
            } else {
                0.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{enrich, project, Sample};
    use crate::GpsPoint;

    /// Straight eastward lap, ~8.3 m between samples, `interval_ms` apart.
    fn straight_lap(n: usize, interval_ms: f64, speed: f64) -> Lap {
        let mut samples: Vec<Sample> = (0..n)
            .map(|i| {
                Sample::new(
                    9,
                    i as f64 * interval_ms,
                    47.2195,
                    14.7646 + i as f64 * 1.1e-4,
                    speed,
                    90.0,
                    650.0,
                )
            })
            .collect();
        let origin = GpsPoint::new(47.2195, 14.7646);
        project(&mut samples, &origin);
        enrich(&mut samples);
        Lap::new(0, samples)
    }

    #[test]
    fn test_query_at_knots() {
        let lap = straight_lap(10, 100.0, 120.0);
        let series = &build_lap_series(&lap, None)[0];

        for point in &series.points {
            assert_eq!(series.value_at_distance(point.distance_m), Some(point.value));
            assert_eq!(series.value_at_time(point.time_ms), Some(point.value));
            assert_eq!(series.value_at_normalized(point.normalized), Some(point.value));
        }
    }

    #[test]
    fn test_query_out_of_range() {
        let lap = straight_lap(10, 100.0, 120.0);
        let series = &build_lap_series(&lap, None)[0];
        let total = lap.total_distance_m();

        assert_eq!(series.value_at_distance(-1.0), None);
        assert_eq!(series.value_at_distance(total + 1.0), None);
        assert_eq!(series.value_at_time(-0.1), None);
        assert_eq!(series.value_at_time(901.0), None);
        assert_eq!(series.value_at_normalized(1.0001), None);
    }

    #[test]
    fn test_linear_between_knots() {
        let points = vec![
            SeriesPoint {
                value: 10.0,
                distance_m: 0.0,
                time_ms: 0.0,
                normalized: 0.0,
            },
            SeriesPoint {
                value: 20.0,
                distance_m: 100.0,
                time_ms: 1000.0,
                normalized: 1.0,
            },
        ];
        let series = Series {
            kind: ChartKind::Speed,
            points,
        };
        assert_eq!(series.value_at_distance(25.0), Some(12.5));
        assert_eq!(series.value_at_time(500.0), Some(15.0));
        assert_eq!(series.value_at_normalized(0.75), Some(17.5));
    }

    #[test]
    fn test_kind_flags() {
        assert!(!ChartKind::Speed.needs_reference());
        assert!(ChartKind::TimeDelta.needs_reference());
        assert!(ChartKind::SpeedDelta.needs_reference());
        assert!(ChartKind::DeltaRate.needs_reference());

        assert!(ChartKind::Speed.higher_is_better());
        assert!(ChartKind::SpeedDelta.higher_is_better());
        assert!(!ChartKind::TimeDelta.higher_is_better());
        assert!(!ChartKind::DeltaRate.higher_is_better());
    }

    #[test]
    fn test_delta_series_against_reference() {
        // Same path, the current lap takes twice as long at half the speed
        let reference_lap = straight_lap(10, 100.0, 100.0);
        let current_lap = straight_lap(10, 200.0, 50.0);
        let reference_speed = build_lap_series(&reference_lap, None).remove(0);

        let series = build_lap_series(&current_lap, Some(&reference_speed));
        assert_eq!(series.len(), 4);

        let time_delta = series.iter().find(|s| s.kind == ChartKind::TimeDelta).unwrap();
        // At sample i the current lap is i * 100 ms behind
        for (i, point) in time_delta.points.iter().enumerate() {
            assert!((point.value - i as f64 * 100.0).abs() < 1e-6);
        }

        let speed_delta = series.iter().find(|s| s.kind == ChartKind::SpeedDelta).unwrap();
        for point in &speed_delta.points {
            assert!((point.value + 50.0).abs() < 1e-6);
        }

        let delta_rate = series.iter().find(|s| s.kind == ChartKind::DeltaRate).unwrap();
        assert_eq!(delta_rate.points[0].value, 0.0);
        for point in &delta_rate.points[1..] {
            assert!((point.value - 100.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_no_reference_no_delta_series() {
        let lap = straight_lap(10, 100.0, 100.0);
        let series = build_lap_series(&lap, None);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].kind, ChartKind::Speed);
    }
}
