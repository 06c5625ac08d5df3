//! Lap segmentation: splitting the sample stream at start/finish crossings.
//!
//! A single forward pass tests every consecutive sample pair against the
//! detection segment. Each accepted crossing synthesizes a boundary sample
//! that closes the outgoing lap and seeds the next one, so adjacent laps
//! share an identical endpoint and no time or distance is lost at the split.

use log::debug;

use crate::detection::DetectionLine;
use crate::geometry::segment_intersection;
use crate::sample::Sample;
use crate::{AnalysisConfig, GpsPoint};

/// Split a recording into lap sample buffers.
///
/// For every consecutive raw-sample pair the segment to the detection line is
/// tested with [`segment_intersection`]. A hit splits the stream only when at
/// least `min_lap_samples` have accumulated since the last split; a noisy
/// pass near the line would otherwise register as two crossings a few samples
/// apart and produce a near-zero-length lap.
///
/// The final in-progress buffer becomes the last lap unconditionally, unless
/// it holds fewer than two samples. With no detection line, or a line the
/// trajectory never crosses, the entire recording is one lap.
pub fn split_into_laps(
    samples: &[Sample],
    line: Option<&DetectionLine>,
    config: &AnalysisConfig,
    origin: &GpsPoint,
) -> Vec<Vec<Sample>> {
    if samples.len() < 2 {
        return Vec::new();
    }

    let line = match line {
        Some(line) => line,
        None => return vec![samples.to_vec()],
    };
    let (q1, q2) = line.endpoints();

    let mut laps: Vec<Vec<Sample>> = Vec::new();
    let mut buffer: Vec<Sample> = vec![samples[0].clone()];

    for i in 1..samples.len() {
        let p1 = &samples[i - 1];
        let p2 = &samples[i];

        if buffer.len() >= config.min_lap_samples {
            if let Some(t) = segment_intersection(p1.position, p2.position, q1, q2) {
                let boundary = Sample::interpolate_between(p1, p2, t, origin);
                buffer.push(boundary.clone());
                laps.push(std::mem::take(&mut buffer));
                buffer.push(boundary);
            }
        }

        buffer.push(p2.clone());
    }

    if buffer.len() >= 2 {
        laps.push(buffer);
    }

    debug!("Segmentation produced {} laps", laps.len());
    laps
}
