//! The lap model: an ordered run of samples with lap-relative fields,
//! stats, per-sector timing and comparable series.
//!
//! A lap owns its samples. Lap-relative time and distance are always derived
//! by a full re-walk of the sample list, so splicing synthesized sector
//! points in (see [`crate::sectors`]) just repeats the walk over the longer
//! list instead of patching running totals.

use serde::{Deserialize, Serialize};

use crate::projection::haversine_distance;
use crate::sample::Sample;
use crate::series::{ChartKind, Series};

/// Display colors assigned to laps round-robin by index.
pub const LAP_COLORS: &[&str] = &[
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6", "#bcf60c",
    "#008080", "#9a6324",
];

/// Timing data for one sector of one lap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorTime {
    /// Sector index, 0-based
    pub sector: usize,
    /// Elapsed time in the sector in milliseconds
    pub time_ms: f64,
    /// Index of the sample opening the sector within the lap
    pub start_index: usize,
    /// Index of the sample closing the sector within the lap
    pub end_index: usize,
}

/// Summary statistics for one lap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapStats {
    /// Total lap distance in meters
    pub distance_m: f64,
    /// Total lap time in milliseconds
    pub time_ms: f64,
    /// Maximum speed over the lap in km/h
    pub max_speed_kmh: f64,
    /// Lap time formatted as `M:SS.mmm`
    pub formatted_time: String,
}

/// One lap: a contiguous run of samples between start/finish crossings.
#[derive(Debug, Clone)]
pub struct Lap {
    index: usize,
    color: &'static str,
    samples: Vec<Sample>,
    sectors: Vec<SectorTime>,
    series: Vec<Series>,
}

impl Lap {
    /// Build a lap from a segmentation buffer and recompute its lap-relative
    /// fields. The first sample gets zero time and distance from lap start.
    pub fn new(index: usize, samples: Vec<Sample>) -> Self {
        let mut lap = Self {
            index,
            color: LAP_COLORS[index % LAP_COLORS.len()],
            samples,
            sectors: Vec::new(),
            series: Vec::new(),
        };
        lap.recompute_relative_fields();
        lap
    }

    /// 0-based lap index within the recording.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Display color for this lap.
    pub fn color(&self) -> &'static str {
        self.color
    }

    /// The lap's samples in time order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Total lap time in milliseconds.
    pub fn total_time_ms(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.lap_time_ms)
    }

    /// Total lap distance in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.lap_distance_m)
    }

    /// Summary statistics for display.
    pub fn stats(&self) -> LapStats {
        let time_ms = self.total_time_ms();
        LapStats {
            distance_m: self.total_distance_m(),
            time_ms,
            max_speed_kmh: self
                .samples
                .iter()
                .map(|s| s.speed_kmh)
                .fold(f64::MIN, f64::max)
                .max(0.0),
            formatted_time: format_time_ms(time_ms),
        }
    }

    /// Per-sector timing. Sectors whose bounding crossings were never
    /// detected are absent from the list.
    pub fn sector_data(&self) -> &[SectorTime] {
        &self.sectors
    }

    /// Diagnostic: do the sector times fail to add up to the lap time?
    ///
    /// True when sectors exist but their sum deviates from the total lap time
    /// by more than `tolerance_ms` (which includes the case of a sector whose
    /// crossing was never found). Display-only; computed values are never
    /// corrected.
    pub fn sector_sum_mismatch(&self, tolerance_ms: f64) -> bool {
        if self.sectors.is_empty() {
            return false;
        }
        let sum: f64 = self.sectors.iter().map(|s| s.time_ms).sum();
        (sum - self.total_time_ms()).abs() > tolerance_ms
    }

    /// The named series of this lap, if built.
    pub fn chart(&self, kind: ChartKind) -> Option<&Series> {
        self.series.iter().find(|s| s.kind == kind)
    }

    pub(crate) fn set_series(&mut self, series: Vec<Series>) {
        self.series = series;
    }

    pub(crate) fn set_sectors(&mut self, sectors: Vec<SectorTime>) {
        self.sectors = sectors;
    }

    /// Derive a new lap value preserving identity but replacing samples.
    /// Used by sector injection; series are dropped for the engine to rebuild.
    pub(crate) fn replaced_with(&self, samples: Vec<Sample>) -> Lap {
        let mut lap = Lap {
            index: self.index,
            color: self.color,
            samples,
            sectors: Vec::new(),
            series: Vec::new(),
        };
        lap.recompute_relative_fields();
        lap
    }

    /// Re-walk the sample list and rebuild every pair-derived and
    /// lap-relative field from scratch.
    pub(crate) fn recompute_relative_fields(&mut self) {
        for i in 0..self.samples.len() {
            if i == 0 {
                let first = &mut self.samples[0];
                first.elapsed_ms = 0.0;
                first.step_distance_m = 0.0;
                first.lap_time_ms = 0.0;
                first.lap_distance_m = 0.0;
                continue;
            }
            let (head, tail) = self.samples.split_at_mut(i);
            let prev = &head[i - 1];
            let curr = &mut tail[0];
            curr.elapsed_ms = curr.timestamp_ms - prev.timestamp_ms;
            curr.step_distance_m = haversine_distance(&prev.gps(), &curr.gps());
            curr.lap_time_ms = prev.lap_time_ms + curr.elapsed_ms;
            curr.lap_distance_m = prev.lap_distance_m + curr.step_distance_m;
        }
    }
}

/// Format a lap time in milliseconds as `M:SS.mmm`.
pub fn format_time_ms(time_ms: f64) -> String {
    let total_ms = time_ms.round().max(0.0) as u64;
    let minutes = total_ms / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{}:{:02}.{:03}", minutes, seconds, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{enrich, project};
    use crate::GpsPoint;

    fn eastward_lap(n: usize) -> Lap {
        let mut samples: Vec<Sample> = (0..n)
            .map(|i| {
                Sample::new(
                    9,
                    5000.0 + i as f64 * 100.0,
                    47.2195,
                    14.7646 + i as f64 * 1e-4,
                    100.0 + i as f64,
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
    fn test_relative_fields() {
        let lap = eastward_lap(10);
        let samples = lap.samples();

        assert_eq!(samples[0].lap_time_ms, 0.0);
        assert_eq!(samples[0].lap_distance_m, 0.0);

        for pair in samples.windows(2) {
            assert!(pair[1].lap_time_ms > pair[0].lap_time_ms);
            assert!(pair[1].lap_distance_m > pair[0].lap_distance_m);
        }

        assert_eq!(lap.total_time_ms(), 900.0);
        assert!((lap.total_distance_m() - samples.last().unwrap().lap_distance_m).abs() < 1e-12);
    }

    #[test]
    fn test_stats() {
        let lap = eastward_lap(10);
        let stats = lap.stats();
        assert_eq!(stats.time_ms, 900.0);
        assert_eq!(stats.max_speed_kmh, 109.0);
        assert_eq!(stats.formatted_time, "0:00.900");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time_ms(83_456.0), "1:23.456");
        assert_eq!(format_time_ms(60_000.0), "1:00.000");
        assert_eq!(format_time_ms(59_999.4), "0:59.999");
        assert_eq!(format_time_ms(605_008.0), "10:05.008");
    }

    #[test]
    fn test_sector_sum_mismatch() {
        let mut lap = eastward_lap(10);
        assert!(!lap.sector_sum_mismatch(10.0));

        lap.set_sectors(vec![
            SectorTime {
                sector: 0,
                time_ms: 450.0,
                start_index: 0,
                end_index: 5,
            },
            SectorTime {
                sector: 1,
                time_ms: 450.0,
                start_index: 5,
                end_index: 9,
            },
        ]);
        assert!(!lap.sector_sum_mismatch(10.0));

        lap.set_sectors(vec![SectorTime {
            sector: 0,
            time_ms: 450.0,
            start_index: 0,
            end_index: 5,
        }]);
        assert!(lap.sector_sum_mismatch(10.0));
    }

    #[test]
    fn test_colors_cycle() {
        assert_eq!(Lap::new(0, Vec::new()).color(), LAP_COLORS[0]);
        assert_eq!(
            Lap::new(LAP_COLORS.len() + 2, Vec::new()).color(),
            LAP_COLORS[2]
        );
    }
}
