//! # Lap Engine
//!
//! Stateful analysis engine that keeps one recording's derived lap model in
//! memory. Construction runs the whole pipeline once, synchronously:
//! projection → enrichment → start/finish detection → lap segmentation →
//! reference-lap selection → sector boundary derivation → sector-point
//! injection → series build. Afterwards the UI only reads laps, stats,
//! sector data and series from the engine, and mutates lap visibility.
//!
//! Visibility is presentation state and lives here, not on the laps; core
//! selection functions receive it as an explicit eligibility predicate.
//! Every visibility mutation rebuilds all series because the reference
//! (fastest visible) lap may have changed.

use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::detection::{detect_start_finish, DetectionLine};
use crate::error::LapTraceError;
use crate::filtering::{fastest_lap, outlier_flags};
use crate::lap::Lap;
use crate::sample::{enrich, project, Sample};
use crate::sectors::{compute_sector_boundaries, SectorBoundary};
use crate::segmentation::split_into_laps;
use crate::series::{build_lap_series, Series};
use crate::{AnalysisConfig, Bounds, GpsPoint, Result};

/// Track-level data derived from the recording.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TrackData {
    /// Track name from the recording metadata, if any
    pub name: Option<String>,
    /// Track length in meters (the reference lap's total distance)
    pub total_length_m: f64,
    /// The detected start/finish line
    pub start_finish: DetectionLine,
    /// The fixed sector boundaries
    pub sector_boundaries: Vec<SectorBoundary>,
}

/// The main stateful analysis engine for one recording.
pub struct LapEngine {
    config: AnalysisConfig,
    bounds: Option<Bounds>,
    origin: GpsPoint,
    start_finish: Option<DetectionLine>,
    sector_boundaries: Vec<SectorBoundary>,
    laps: Vec<Lap>,
    visibility: Vec<bool>,
    track_data: Option<TrackData>,
}

impl LapEngine {
    /// Analyze a recording.
    ///
    /// Every stage degrades rather than fails: a short or stationary
    /// recording yields a single lap with no track data, and a recording
    /// with no samples yields no laps at all.
    pub fn new(
        mut samples: Vec<Sample>,
        track_name: Option<String>,
        config: AnalysisConfig,
    ) -> Self {
        let points: Vec<GpsPoint> = samples.iter().map(|s| s.gps()).collect();
        let bounds = Bounds::from_points(&points);
        let origin = bounds
            .map(|b| b.min_corner())
            .unwrap_or_else(|| GpsPoint::new(0.0, 0.0));

        project(&mut samples, &origin);
        enrich(&mut samples);

        let start_finish = detect_start_finish(&samples, &config);
        if start_finish.is_none() {
            info!("No start/finish line; treating the recording as one lap");
        }

        let sample_count = samples.len();
        let buffers = split_into_laps(&samples, start_finish.as_ref(), &config, &origin);
        let mut laps: Vec<Lap> = buffers
            .into_iter()
            .enumerate()
            .map(|(index, buffer)| Lap::new(index, buffer))
            .collect();
        info!("Segmented {} samples into {} laps", sample_count, laps.len());

        let visibility = vec![true; laps.len()];

        // Sector boundaries come from the fastest lap with everything
        // visible, then are injected uniformly into every lap.
        let mut sector_boundaries = Vec::new();
        if start_finish.is_some() {
            if let Some(reference) = fastest_lap(&laps, |_| true) {
                sector_boundaries = compute_sector_boundaries(&laps[reference], &config, &origin);
            }
        }
        if !sector_boundaries.is_empty() {
            laps = laps
                .iter()
                .map(|lap| lap.with_injected_sectors(&sector_boundaries, &origin))
                .collect();
            for lap in &laps {
                if lap.sector_sum_mismatch(config.sector_sum_tolerance_ms) {
                    warn!(
                        "Lap {}: sector times do not add up to the lap time",
                        lap.index()
                    );
                }
            }
        }

        let track_data = match (&start_finish, laps.is_empty()) {
            (Some(line), false) => {
                let reference = fastest_lap(&laps, |_| true).unwrap_or(0);
                Some(TrackData {
                    name: track_name,
                    total_length_m: laps[reference].total_distance_m(),
                    start_finish: line.clone(),
                    sector_boundaries: sector_boundaries.clone(),
                })
            }
            _ => None,
        };

        let mut engine = Self {
            config,
            bounds,
            origin,
            start_finish,
            sector_boundaries,
            laps,
            visibility,
            track_data,
        };
        engine.recompute_series();
        engine
    }

    // ========================================================================
    // Recording-level data
    // ========================================================================

    /// Bounding box of the recording, if it has any samples.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Origin of the local metric plane (the bounds' minimum corner).
    pub fn origin(&self) -> GpsPoint {
        self.origin
    }

    /// Track-level data; present once a start/finish line and at least one
    /// lap exist.
    pub fn track_data(&self) -> Option<&TrackData> {
        self.track_data.as_ref()
    }

    /// The detected start/finish line, if any.
    pub fn start_finish_line(&self) -> Option<&DetectionLine> {
        self.start_finish.as_ref()
    }

    /// The fixed sector boundaries (empty when no reference lap exists).
    pub fn sector_boundaries(&self) -> &[SectorBoundary] {
        &self.sector_boundaries
    }

    // ========================================================================
    // Laps
    // ========================================================================

    /// All laps in recording order.
    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    /// One lap by index.
    pub fn lap(&self, index: usize) -> Result<&Lap> {
        self.laps.get(index).ok_or(LapTraceError::LapIndexOutOfRange {
            index,
            lap_count: self.laps.len(),
        })
    }

    /// The currently visible laps.
    pub fn visible_laps(&self) -> Vec<&Lap> {
        self.laps
            .iter()
            .filter(|lap| self.visibility[lap.index()])
            .collect()
    }

    /// Whether a lap is currently visible.
    pub fn is_lap_visible(&self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        Ok(self.visibility[index])
    }

    /// Index of the fastest visible lap, if any.
    pub fn fastest_visible_lap(&self) -> Option<usize> {
        fastest_lap(&self.laps, |i| self.visibility[i])
    }

    /// Whether a lap's time deviates from the median of all laps by more
    /// than `tolerance_pct`. With fewer than three laps no lap is ever an
    /// outlier. Classification never alters segmentation or sector data.
    pub fn is_outlier(&self, index: usize, tolerance_pct: f64) -> Result<bool> {
        self.check_index(index)?;
        let flags = outlier_flags(
            &self.laps,
            tolerance_pct,
            self.config.min_laps_for_outliers,
        );
        Ok(flags[index])
    }

    // ========================================================================
    // Visibility (triggers series recomputation)
    // ========================================================================

    /// Hide every outlier lap and show the rest.
    pub fn apply_time_heuristics(&mut self, tolerance_pct: f64) {
        let flags = outlier_flags(
            &self.laps,
            tolerance_pct,
            self.config.min_laps_for_outliers,
        );
        for (i, outlier) in flags.into_iter().enumerate() {
            self.visibility[i] = !outlier;
        }
        self.recompute_series();
    }

    /// Show or hide every lap at once.
    pub fn set_all_laps_visibility(&mut self, visible: bool) {
        self.visibility.fill(visible);
        self.recompute_series();
    }

    /// Flip one lap's visibility; returns the new state.
    pub fn toggle_lap_visibility(&mut self, index: usize) -> Result<bool> {
        self.check_index(index)?;
        self.visibility[index] = !self.visibility[index];
        self.recompute_series();
        Ok(self.visibility[index])
    }

    // ========================================================================
    // Series
    // ========================================================================

    /// Rebuild every lap's series against the current reference lap.
    ///
    /// With no visible reference only the raw speed series exists and the
    /// delta series are absent.
    fn recompute_series(&mut self) {
        let reference_speed: Option<Series> = self
            .fastest_visible_lap()
            .map(|i| build_lap_series(&self.laps[i], None).remove(0));
        debug!(
            "Rebuilding series for {} laps (reference: {:?})",
            self.laps.len(),
            self.fastest_visible_lap()
        );

        #[cfg(feature = "parallel")]
        let all_series: Vec<Vec<Series>> = self
            .laps
            .par_iter()
            .map(|lap| build_lap_series(lap, reference_speed.as_ref()))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let all_series: Vec<Vec<Series>> = self
            .laps
            .iter()
            .map(|lap| build_lap_series(lap, reference_speed.as_ref()))
            .collect();

        for (lap, series) in self.laps.iter_mut().zip(all_series) {
            lap.set_series(series);
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.laps.len() {
            return Err(LapTraceError::LapIndexOutOfRange {
                index,
                lap_count: self.laps.len(),
            });
        }
        Ok(())
    }
}
