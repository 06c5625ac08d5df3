//! # laptrace
//!
//! Lap and sector segmentation for GPS racing telemetry recordings.
//!
//! This library ingests one recording from a GPS data logger (timestamped
//! position, speed, heading samples) and derives a structured lap model:
//! where the vehicle crossed the start/finish line, how the recording splits
//! into laps, how each lap subdivides into four distance-based sectors, and
//! how any two laps compare point-for-point along a shared distance, time, or
//! normalized-position axis.
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel per-lap series rebuilds with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use laptrace::{AnalysisConfig, LapEngine, Sample};
//!
//! // Ten fixes heading north at 80 km/h, 10 Hz
//! let samples: Vec<Sample> = (0..10)
//!     .map(|i| {
//!         Sample::new(9, i as f64 * 100.0, 47.2195 + i as f64 * 1e-5, 14.7646, 80.0, 0.0, 650.0)
//!     })
//!     .collect();
//!
//! let engine = LapEngine::new(samples, Some("Red Bull Ring".into()), AnalysisConfig::default());
//!
//! // Too short for start/finish detection: the recording is a single lap
//! assert_eq!(engine.laps().len(), 1);
//! assert!(engine.track_data().is_none());
//! ```
//!
//! The engine is a plain value: construct it once per recording, then read
//! laps, stats, sector data and series from it. Visibility mutators rebuild
//! every lap's delta series against the (possibly new) fastest visible lap.

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{LapTraceError, Result};

// 2D vector primitives and segment intersection
pub mod geometry;

// Local planar projection and haversine distance
pub mod projection;

// GPS samples, enrichment, boundary-sample interpolation
pub mod sample;
pub use sample::Sample;

// Detection lines and the start/finish detector
pub mod detection;
pub use detection::{detect_start_finish, DetectionLine};

// Lap segmentation engine
pub mod segmentation;
pub use segmentation::split_into_laps;

// Lap model, stats, sector timing data
pub mod lap;
pub use lap::{Lap, LapStats, SectorTime};

// Sector boundary computation and propagation
pub mod sectors;
pub use sectors::{compute_sector_boundaries, SectorBoundary};

// Comparable series and multi-key interpolation
pub mod series;
pub use series::{ChartKind, Series, SeriesPoint};

// Median lap time, outlier classification, reference-lap selection
pub mod filtering;
pub use filtering::{fastest_lap, is_outlier_time, median_lap_time};

// Stateful analysis engine (laps, visibility, track data)
pub mod engine;
pub use engine::{LapEngine, TrackData};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude in decimal degrees.
///
/// # Example
/// ```
/// use laptrace::GpsPoint;
/// let point = GpsPoint::new(47.2195, 14.7646); // Spielberg
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a recording in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points. Returns `None` for an empty slice.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lng - self.min_lng
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Minimum corner, used as the origin of the local metric plane.
    pub fn min_corner(&self) -> GpsPoint {
        GpsPoint::new(self.min_lat, self.min_lng)
    }
}

/// Configuration for the analysis pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Samples excluded at each end of the recording when scanning for the
    /// maximum-speed point. Default: 20
    pub edge_margin_samples: usize,

    /// Distance walked backward from the maximum-speed point to collect the
    /// direction vectors averaged into the crossing direction.
    /// Default: 20.0 meters
    pub direction_window_m: f64,

    /// Half-width of the start/finish detection line (full width is twice
    /// this). Sector boundary lines use half of it. Default: 20.0 meters
    pub line_half_width_m: f64,

    /// Minimum recording length for start/finish detection. Shorter
    /// recordings become a single lap. Default: 50
    pub min_detection_samples: usize,

    /// Minimum samples accumulated in the current lap before a crossing may
    /// split it. Guards against a noisy pass near the line registering as two
    /// crossings a few samples apart. Default: 50
    pub min_lap_samples: usize,

    /// Number of distance-based sectors per lap. Default: 4
    pub sector_count: usize,

    /// Tolerance for the sector-sum-vs-lap-time consistency diagnostic.
    /// Display-only; never alters computed values. Default: 10.0 ms
    pub sector_sum_tolerance_ms: f64,

    /// Default deviation from the median lap time beyond which a lap is
    /// classified an outlier. Default: 15.0 percent
    pub outlier_tolerance_pct: f64,

    /// Minimum number of laps for outlier classification to be meaningful.
    /// With fewer laps no lap is ever an outlier. Default: 3
    pub min_laps_for_outliers: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            edge_margin_samples: 20,
            direction_window_m: 20.0,
            line_half_width_m: 20.0,
            min_detection_samples: 50,
            min_lap_samples: 50,
            sector_count: 4,
            sector_sum_tolerance_ms: 10.0,
            outlier_tolerance_pct: 15.0,
            min_laps_for_outliers: 3,
        }
    }
}
