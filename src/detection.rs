//! Detection lines and the start/finish line detector.
//!
//! A detection line is a finite segment laid perpendicular to the direction of
//! travel, wide enough to catch every pass of the trajectory. The start/finish
//! line is anchored at the fastest point of the recording on the assumption
//! that a racing logger records its top speed on the main straight, which on
//! nearly every circuit crosses start/finish.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::sample::Sample;
use crate::{AnalysisConfig, GpsPoint};

/// A finite crossing-detection segment (start/finish or sector boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionLine {
    /// Anchor coordinate in GPS space
    pub anchor_gps: GpsPoint,
    /// Anchor position in the local metric plane
    pub anchor: Vec2,
    /// Unit travel direction at the anchor
    pub direction: Vec2,
    /// Unit line direction (perpendicular to travel)
    pub perpendicular: Vec2,
    /// Half the physical width of the line in meters
    pub half_width_m: f64,
}

impl DetectionLine {
    /// The two endpoints of the finite segment: `anchor ± perpendicular × half_width`.
    pub fn endpoints(&self) -> (Vec2, Vec2) {
        (
            self.anchor.sub(self.perpendicular.scaled(self.half_width_m)),
            self.anchor.add(self.perpendicular.scaled(self.half_width_m)),
        )
    }
}

/// Locate the start/finish line of a recording.
///
/// Scans for the maximum recorded speed away from the sequence edges, walks
/// backward until at least `direction_window_m` of travel has been covered,
/// averages the pair directions over that window into a smoothed crossing
/// direction, and materializes a line of fixed width perpendicular to it,
/// anchored at the maximum-speed sample.
///
/// Returns `None` when the recording is too short or the window yields no
/// usable direction; the caller must then treat the whole recording as a
/// single lap.
pub fn detect_start_finish(samples: &[Sample], config: &AnalysisConfig) -> Option<DetectionLine> {
    if samples.len() < config.min_detection_samples {
        return None;
    }

    let margin = config.edge_margin_samples;
    if samples.len() <= margin * 2 {
        return None;
    }

    let mut max_index = margin;
    let mut max_speed = f64::MIN;
    for (i, sample) in samples.iter().enumerate().take(samples.len() - margin).skip(margin) {
        if sample.speed_kmh > max_speed {
            max_speed = sample.speed_kmh;
            max_index = i;
        }
    }

    // Walk backward until the direction window distance is covered
    let mut start_index = max_index;
    let mut covered = 0.0;
    while start_index > 0 && covered < config.direction_window_m {
        covered += samples[start_index].step_distance_m;
        start_index -= 1;
    }

    if start_index >= max_index {
        return None;
    }

    let mut sum = Vec2::default();
    for sample in &samples[start_index + 1..=max_index] {
        sum = sum.add(sample.direction);
    }
    let direction = sum.normalized();
    if direction == Vec2::default() {
        return None;
    }

    let anchor_sample = &samples[max_index];
    debug!(
        "Start/finish anchored at sample {} ({:.1} km/h), window {}..={}",
        max_index, max_speed, start_index + 1, max_index
    );

    Some(DetectionLine {
        anchor_gps: anchor_sample.gps(),
        anchor: anchor_sample.position,
        direction,
        perpendicular: direction.perpendicular(),
        half_width_m: config.line_half_width_m,
    })
}
