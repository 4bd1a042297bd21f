//! Engine progress parsing and ETA estimation.
//!
//! The engine emits a line-oriented key-value stream on its progress
//! channel (`-progress pipe:2`). Only the elapsed-processed-time markers
//! matter here; everything else is ignored without being treated as an
//! error.

use std::time::Instant;

/// Fraction below which the ETA estimate is too noisy to publish.
const ETA_FLOOR: f64 = 0.05;

/// Progress is capped below 100% until the process actually exits; the final
/// percent covers container finalization after the last frame.
const PROGRESS_CAP: f64 = 0.99;

/// A normalized progress reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Whole percent, 0-99 while the engine runs.
    pub progress: u8,
    /// Estimated seconds remaining, 0 until the estimate stabilizes.
    pub eta: u64,
}

/// Extract a processed-time marker (microseconds) from one progress line.
///
/// Accepts `out_time_us=` and its `out_time_ms=` alias (which ffmpeg also
/// reports in microseconds). Any other line yields `None`.
pub fn parse_out_time_us(line: &str) -> Option<i64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => value.parse::<i64>().ok().filter(|us| *us >= 0),
        _ => None,
    }
}

/// Incremental progress/ETA estimator for one render.
#[derive(Debug)]
pub struct ProgressTracker {
    /// Render duration in seconds, the progress denominator.
    duration: f64,
    started: Instant,
}

impl ProgressTracker {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration: duration_secs.max(1.0),
            started: Instant::now(),
        }
    }

    /// Fold in a processed-time marker and produce a normalized reading.
    pub fn update(&self, out_time_us: i64) -> ProgressUpdate {
        self.update_with_elapsed(out_time_us, self.started.elapsed().as_secs_f64())
    }

    /// Same as [`update`](Self::update) with an explicit wall-clock elapsed,
    /// so the estimator itself stays deterministic.
    pub fn update_with_elapsed(&self, out_time_us: i64, elapsed_secs: f64) -> ProgressUpdate {
        let processed = out_time_us.max(0) as f64 / 1_000_000.0;
        let fraction = (processed / self.duration).min(PROGRESS_CAP);

        let eta = if fraction > ETA_FLOOR {
            (elapsed_secs / fraction - elapsed_secs).round().max(0.0) as u64
        } else {
            0
        };

        ProgressUpdate {
            progress: (fraction * 100.0).round() as u8,
            eta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_out_time_lines() {
        assert_eq!(parse_out_time_us("out_time_us=1500000"), Some(1_500_000));
        assert_eq!(parse_out_time_us("out_time_ms=1500000"), Some(1_500_000));
        assert_eq!(parse_out_time_us(" out_time_us=42 "), Some(42));
    }

    #[test]
    fn test_ignores_other_lines() {
        assert_eq!(parse_out_time_us("frame=120"), None);
        assert_eq!(parse_out_time_us("speed=1.5x"), None);
        assert_eq!(parse_out_time_us("progress=continue"), None);
        assert_eq!(parse_out_time_us("garbage"), None);
        assert_eq!(parse_out_time_us("out_time_us=notanumber"), None);
        assert_eq!(parse_out_time_us("out_time_us=-5"), None);
        assert_eq!(parse_out_time_us(""), None);
    }

    #[test]
    fn test_progress_monotone_and_capped() {
        let tracker = ProgressTracker::new(10.0);

        let mut last = 0u8;
        for us in [0i64, 1_000_000, 2_500_000, 5_000_000, 9_900_000, 20_000_000] {
            let update = tracker.update_with_elapsed(us, 1.0);
            assert!(update.progress >= last);
            assert!(update.progress <= 99, "capped below 100 until exit");
            last = update.progress;
        }
        assert_eq!(last, 99);
    }

    #[test]
    fn test_eta_estimation() {
        let tracker = ProgressTracker::new(10.0);

        // Half done after 4 wall-clock seconds: about 4 seconds to go.
        let update = tracker.update_with_elapsed(5_000_000, 4.0);
        assert_eq!(update.progress, 50);
        assert_eq!(update.eta, 4);
    }

    #[test]
    fn test_eta_suppressed_below_floor() {
        let tracker = ProgressTracker::new(100.0);

        // 2% done: estimate is too noisy, report 0.
        let update = tracker.update_with_elapsed(2_000_000, 10.0);
        assert_eq!(update.progress, 2);
        assert_eq!(update.eta, 0);
    }

    #[test]
    fn test_short_duration_clamped() {
        // Sub-second renders use a 1 second denominator.
        let tracker = ProgressTracker::new(0.2);
        let update = tracker.update_with_elapsed(500_000, 0.1);
        assert_eq!(update.progress, 50);
    }
}
