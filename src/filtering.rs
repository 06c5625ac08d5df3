//! Statistical lap filtering: median time, outlier classification, and
//! reference-lap selection.
//!
//! Which laps "count" is always an explicit parameter (an eligibility
//! predicate or a tolerance), never shared mutable state: the engine owns
//! visibility and passes it in. Outlier status only ever influences default
//! visibility in the presentation layer; segmentation and sector data are
//! never altered by it.

use crate::lap::Lap;

/// Median of the positive lap times, or `None` when there are none.
///
/// An even count averages the two middle values.
pub fn median_lap_time(laps: &[Lap]) -> Option<f64> {
    let mut times: Vec<f64> = laps
        .iter()
        .map(|lap| lap.total_time_ms())
        .filter(|&t| t > 0.0)
        .collect();
    if times.is_empty() {
        return None;
    }
    times.sort_by(f64::total_cmp);

    let mid = times.len() / 2;
    if times.len() % 2 == 0 {
        Some((times[mid - 1] + times[mid]) / 2.0)
    } else {
        Some(times[mid])
    }
}

/// Whether a lap time deviates from the median by more than the tolerance.
pub fn is_outlier_time(time_ms: f64, median_ms: f64, tolerance_pct: f64) -> bool {
    (time_ms - median_ms).abs() > median_ms * tolerance_pct / 100.0
}

/// Outlier classification for every lap.
///
/// Classification needs at least `min_laps` laps to be meaningful; below
/// that, no lap is ever an outlier regardless of spread. Laps with
/// non-positive time are excluded from the median but always classified
/// as outliers themselves.
pub fn outlier_flags(laps: &[Lap], tolerance_pct: f64, min_laps: usize) -> Vec<bool> {
    if laps.len() < min_laps {
        return vec![false; laps.len()];
    }
    let median = match median_lap_time(laps) {
        Some(median) => median,
        None => return vec![false; laps.len()],
    };

    laps.iter()
        .map(|lap| {
            let time = lap.total_time_ms();
            time <= 0.0 || is_outlier_time(time, median, tolerance_pct)
        })
        .collect()
}

/// Index of the fastest lap among those the predicate accepts.
///
/// The fastest lap is the minimum positive total time; ties go to the lower
/// index, and a lap with non-positive time is never selected.
pub fn fastest_lap<F>(laps: &[Lap], eligible: F) -> Option<usize>
where
    F: Fn(usize) -> bool,
{
    let mut best: Option<(usize, f64)> = None;
    for lap in laps {
        if !eligible(lap.index()) {
            continue;
        }
        let time = lap.total_time_ms();
        if time <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, best_time)| time < best_time) {
            best = Some((lap.index(), time));
        }
    }
    best.map(|(index, _)| index)
}
