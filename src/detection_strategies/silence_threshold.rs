//! Silence threshold detection - the fallback when track durations are unknown.
//!
//! Looks for long runs of low energy relative to the median level of the
//! whole timeline. Surface noise means vinyl never reaches true silence, so
//! this is noticeably less reliable than guided detection.

use tracing::debug;

use super::{segments_from_boundaries, BoundaryLocator};
use crate::audio_analysis::{median, median_filter};
use crate::config::AnalysisParams;
use crate::segment::{SilenceGap, TrackSegment};
use crate::timeline::GlobalTimeline;

/// Reference level used when the timeline has no energy at all.
const FALLBACK_MEDIAN_RMS: f64 = 0.001;

pub struct SilenceThresholdLocator {
    threshold_factor: f64,
    min_silence_sec: f64,
    margin_sec: f64,
    median_kernel: usize,
}

impl SilenceThresholdLocator {
    pub fn new(
        threshold_factor: f64,
        min_silence_sec: f64,
        margin_sec: f64,
        median_kernel: usize,
    ) -> Self {
        Self {
            threshold_factor,
            min_silence_sec,
            margin_sec,
            median_kernel,
        }
    }

    pub fn from_params(params: &AnalysisParams) -> Self {
        Self::new(
            params.threshold_factor,
            params.min_silence_sec,
            params.margin_sec,
            params.median_kernel,
        )
    }

    /// Find inner silence gaps on the timeline.
    ///
    /// Energy is median filtered first to suppress clicks. Runs below
    /// `threshold_factor * median(positive smoothed energy)` that last at
    /// least `min_silence_sec` are kept, unless they reach into the margin
    /// at either end of the timeline (lead-in and lead-out groove noise).
    pub fn detect_silences(&self, timeline: &GlobalTimeline) -> Vec<SilenceGap> {
        let energy = timeline.energy();
        if energy.is_empty() {
            return Vec::new();
        }

        let smoothed = if energy.len() > self.median_kernel {
            median_filter(energy, self.median_kernel)
        } else {
            energy.to_vec()
        };

        let positive: Vec<f32> = smoothed.iter().copied().filter(|&e| e > 0.0).collect();
        let level = median(&positive)
            .map(f64::from)
            .unwrap_or(FALLBACK_MEDIAN_RMS);
        let threshold = self.threshold_factor * level;
        let min_windows = ((self.min_silence_sec / timeline.window_sec()).round() as usize).max(1);

        let spans = timeline.spans();
        let total = timeline.total_duration();
        let mut gaps = Vec::new();
        let mut run_start: Option<usize> = None;

        for i in 0..=smoothed.len() {
            let silent = i < smoothed.len() && (smoothed[i] as f64) < threshold;
            match (silent, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    run_start = None;
                    if i - start < min_windows {
                        continue;
                    }
                    let gap = SilenceGap {
                        start: spans[start].start,
                        end: spans[i - 1].end,
                    };
                    if gap.start < self.margin_sec || gap.end > total - self.margin_sec {
                        debug!(start = gap.start, end = gap.end, "ignoring edge silence");
                        continue;
                    }
                    gaps.push(gap);
                }
                _ => {}
            }
        }

        debug!(
            threshold,
            median = level,
            gaps = gaps.len(),
            "silence detection finished"
        );
        gaps
    }
}

impl BoundaryLocator for SilenceThresholdLocator {
    fn locate(&self, timeline: &GlobalTimeline) -> Vec<TrackSegment> {
        let mut boundaries = vec![0.0];
        boundaries.extend(self.detect_silences(timeline).iter().map(SilenceGap::midpoint));
        boundaries.push(timeline.total_duration());

        let ranges: Vec<(f64, f64)> = boundaries.windows(2).map(|w| (w[0], w[1])).collect();
        segments_from_boundaries(timeline, &ranges)
    }

    fn name(&self) -> &str {
        "Silence threshold"
    }
}
