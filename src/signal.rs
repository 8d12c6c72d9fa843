use serde::{Deserialize, Serialize};

use crate::rows::TrackingSample;

/// Tuning for the speed-signal preprocessor. Windows are expressed in seconds
/// so the time-domain smoothing width stays constant across sampling rates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub fps: u32,
    /// Displacement over one frame interval above this is a tracking glitch,
    /// not motion; the sample is masked.
    pub teleport_threshold_m: f64,
    pub speed_cap_kmh: f64,
    pub median_window_s: f64,
    pub mean_window_s: f64,
    /// Player/periods with fewer frames than this are skipped outright.
    pub min_valid_frames: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            fps: 10,
            teleport_threshold_m: 1.0,
            speed_cap_kmh: 32.0,
            median_window_s: 1.1,
            mean_window_s: 0.7,
            min_valid_frames: 11,
        }
    }
}

impl SignalConfig {
    pub fn median_window_frames(&self) -> usize {
        odd_window(self.median_window_s, self.fps)
    }

    pub fn mean_window_frames(&self) -> usize {
        odd_window(self.mean_window_s, self.fps)
    }
}

fn odd_window(seconds: f64, fps: u32) -> usize {
    let mut w = (seconds * fps as f64).round() as usize;
    if w % 2 == 0 {
        w += 1;
    }
    w.max(1)
}

/// Turn ordered positions for one player/period into a smoothed per-frame
/// speed signal (km/h). Returns None when the span is too short to smooth.
///
/// Samples must be sorted by frame. Masked frames (teleports, non-adjacent
/// frame gaps, the first frame) contribute nothing to the smoothing windows
/// but still receive a smoothed value from their neighborhood, so the output
/// is dense over the whole span.
pub fn smooth_speed_signal(samples: &[TrackingSample], cfg: &SignalConfig) -> Option<Vec<f64>> {
    if samples.len() < cfg.min_valid_frames {
        return None;
    }

    let n = samples.len();
    let mut raw: Vec<Option<f64>> = vec![None; n];
    for i in 1..n {
        let prev = &samples[i - 1];
        let cur = &samples[i];
        if cur.frame - prev.frame != 1 {
            continue;
        }
        let dist = (cur.x - prev.x).hypot(cur.y - prev.y);
        if dist > cfg.teleport_threshold_m {
            continue;
        }
        let speed_kmh = dist * cfg.fps as f64 * 3.6;
        raw[i] = Some(speed_kmh.min(cfg.speed_cap_kmh));
    }

    if raw.iter().all(|v| v.is_none()) {
        return None;
    }

    let medians = rolling_median(&raw, cfg.median_window_frames());
    Some(rolling_mean(&medians, cfg.mean_window_frames()))
}

fn rolling_median(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = window / 2;
    let mut out = vec![None; n];
    let mut buf: Vec<f64> = Vec::with_capacity(window);
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        buf.clear();
        buf.extend(values[lo..hi].iter().flatten());
        if buf.is_empty() {
            continue;
        }
        buf.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = buf.len() / 2;
        out[i] = Some(if buf.len() % 2 == 1 {
            buf[mid]
        } else {
            (buf[mid - 1] + buf[mid]) / 2.0
        });
    }
    out
}

fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = window / 2;
    let mut out = vec![0.0; n];
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in values[lo..hi].iter().flatten() {
            sum += v;
            count += 1;
        }
        if count > 0 {
            out[i] = sum / count as f64;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples_from_steps(steps: &[f64]) -> Vec<TrackingSample> {
        // Walk along x with the given per-frame displacements (meters).
        let mut x = 0.0;
        let mut out = Vec::with_capacity(steps.len() + 1);
        for (i, step) in std::iter::once(&0.0).chain(steps.iter()).enumerate() {
            x += step;
            out.push(TrackingSample {
                match_id: "m1".to_string(),
                player_id: 7,
                period: 1,
                frame: i as i64,
                timestamp_s: i as f64 / 10.0,
                x,
                y: 0.0,
            });
        }
        out
    }

    #[test]
    fn short_span_is_skipped() {
        let cfg = SignalConfig::default();
        let samples = samples_from_steps(&[0.1; 5]);
        assert!(smooth_speed_signal(&samples, &cfg).is_none());
    }

    #[test]
    fn constant_walk_smooths_to_constant_speed() {
        let cfg = SignalConfig::default();
        // 0.2 m per frame at 10 fps = 2 m/s = 7.2 km/h.
        let samples = samples_from_steps(&[0.2; 40]);
        let speeds = smooth_speed_signal(&samples, &cfg).expect("long enough span");
        assert_eq!(speeds.len(), samples.len());
        for v in &speeds[5..35] {
            assert!((v - 7.2).abs() < 1e-9, "expected 7.2 km/h, got {v}");
        }
    }

    #[test]
    fn teleport_is_masked_not_propagated() {
        let cfg = SignalConfig::default();
        let mut steps = vec![0.2; 40];
        steps[20] = 5.0; // 5 m in one frame: impossible
        let samples = samples_from_steps(&steps);
        let speeds = smooth_speed_signal(&samples, &cfg).expect("span long enough");
        let max = speeds.iter().cloned().fold(0.0_f64, f64::max);
        assert!(max < 10.0, "teleport leaked into signal: max {max}");
    }

    #[test]
    fn isolated_spike_removed_by_median() {
        let cfg = SignalConfig::default();
        let mut steps = vec![0.2; 40];
        steps[20] = 0.8; // 28.8 km/h single-frame spike, below teleport cutoff
        let samples = samples_from_steps(&steps);
        let speeds = smooth_speed_signal(&samples, &cfg).expect("span long enough");
        let max = speeds.iter().cloned().fold(0.0_f64, f64::max);
        assert!(max < 12.0, "single-frame spike survived smoothing: max {max}");
    }

    #[test]
    fn speed_is_capped_before_smoothing() {
        let cfg = SignalConfig::default();
        // 0.95 m/frame = 34.2 km/h, below the 1.0 m teleport cutoff but above cap.
        let samples = samples_from_steps(&[0.95; 40]);
        let speeds = smooth_speed_signal(&samples, &cfg).expect("span long enough");
        for v in &speeds[5..35] {
            assert!(*v <= cfg.speed_cap_kmh + 1e-9);
        }
    }

    #[test]
    fn frame_gap_masks_displacement() {
        let cfg = SignalConfig::default();
        let mut samples = samples_from_steps(&[0.2; 40]);
        // Remove a frame so the neighbors are 2 frames apart.
        samples.remove(20);
        let speeds = smooth_speed_signal(&samples, &cfg).expect("span long enough");
        assert_eq!(speeds.len(), 40);
        let max = speeds.iter().cloned().fold(0.0_f64, f64::max);
        assert!(max < 10.0);
    }

    #[test]
    fn window_frames_track_sampling_rate() {
        let cfg = SignalConfig::default();
        assert_eq!(cfg.median_window_frames(), 11);
        assert_eq!(cfg.mean_window_frames(), 7);
        let cfg25 = SignalConfig {
            fps: 25,
            ..SignalConfig::default()
        };
        // 1.1 s at 25 fps rounds to 28, forced odd.
        assert_eq!(cfg25.median_window_frames(), 29);
        assert_eq!(cfg25.mean_window_frames(), 17);
    }
}
