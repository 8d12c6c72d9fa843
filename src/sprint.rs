use serde::{Deserialize, Serialize};

use crate::rows::{SprintEvent, TrackingSample};

/// Detection threshold plus the validation bands a candidate has to clear.
/// Bands are inclusive on both ends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintConfig {
    pub threshold_kmh: f64,
    /// A dip below threshold of at most this many frames inside an otherwise
    /// above-threshold run is bridged instead of splitting the sprint.
    pub gap_tolerance_frames: usize,
    pub min_frames: usize,
    pub min_speed_samples: usize,
    pub min_distance_m: f64,
    pub avg_speed_band_kmh: (f64, f64),
    pub peak_speed_band_kmh: (f64, f64),
    /// Peak speed is this quantile of the run's smoothed speeds, not the raw
    /// maximum, so one optimistic frame cannot carry the validation.
    pub peak_quantile: f64,
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            threshold_kmh: 24.5,
            gap_tolerance_frames: 2,
            min_frames: 6,
            min_speed_samples: 4,
            min_distance_m: 7.0,
            avg_speed_band_kmh: (24.5, 29.0),
            peak_speed_band_kmh: (26.0, 33.0),
            peak_quantile: 0.90,
        }
    }
}

/// Scan one player/period's smoothed speed signal and emit validated sprints.
///
/// Detection and validation are separate on purpose: coarse thresholding
/// collects candidates, range checks throw out sensor noise without touching
/// legitimate short high-intensity efforts. A failed candidate is dropped
/// silently; absence is the signal.
pub fn detect_sprints(
    samples: &[TrackingSample],
    speeds: &[f64],
    cfg: &SprintConfig,
    fps: u32,
) -> Vec<SprintEvent> {
    debug_assert_eq!(samples.len(), speeds.len());
    let mut events = Vec::new();
    let mut run_start: Option<usize> = None;
    let mut last_above = 0usize;
    let mut gap = 0usize;

    for (i, &speed) in speeds.iter().enumerate() {
        if speed >= cfg.threshold_kmh {
            if run_start.is_none() {
                run_start = Some(i);
            }
            last_above = i;
            gap = 0;
        } else if let Some(start) = run_start {
            gap += 1;
            if gap > cfg.gap_tolerance_frames {
                if let Some(event) = validate(samples, speeds, start, last_above, cfg, fps) {
                    events.push(event);
                }
                run_start = None;
                gap = 0;
            }
        }
    }
    if let Some(start) = run_start {
        if let Some(event) = validate(samples, speeds, start, last_above, cfg, fps) {
            events.push(event);
        }
    }

    events
}

fn validate(
    samples: &[TrackingSample],
    speeds: &[f64],
    start_idx: usize,
    end_idx: usize,
    cfg: &SprintConfig,
    fps: u32,
) -> Option<SprintEvent> {
    let span = end_idx - start_idx + 1;
    if span < cfg.min_frames || span < cfg.min_speed_samples {
        return None;
    }

    let start_frame = samples[start_idx].frame;
    let end_frame = samples[end_idx].frame;
    let run = &speeds[start_idx..=end_idx];

    let avg_speed_kmh = run.iter().sum::<f64>() / run.len() as f64;
    let max_speed_kmh = quantile(run, cfg.peak_quantile);

    let duration_s = (end_frame - start_frame + 1) as f64 / fps as f64;
    let distance_m = (avg_speed_kmh / 3.6) * duration_s;

    let (avg_lo, avg_hi) = cfg.avg_speed_band_kmh;
    let (peak_lo, peak_hi) = cfg.peak_speed_band_kmh;
    if avg_speed_kmh < avg_lo || avg_speed_kmh > avg_hi {
        return None;
    }
    if max_speed_kmh < peak_lo || max_speed_kmh > peak_hi {
        return None;
    }
    if distance_m < cfg.min_distance_m {
        return None;
    }

    let anchor = &samples[start_idx];
    Some(SprintEvent {
        match_id: anchor.match_id.clone(),
        player_id: anchor.player_id,
        period: anchor.period,
        start_frame,
        end_frame,
        mid_frame: (start_frame + end_frame) / 2,
        duration_s,
        distance_m,
        avg_speed_kmh,
        max_speed_kmh,
    })
}

/// Linearly interpolated quantile over an unsorted slice.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
    }
}
