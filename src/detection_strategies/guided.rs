//! Guided detection - uses expected track durations to place boundaries.
//!
//! Each track end is predicted from the previous *found* end plus the
//! track's expected length, then snapped to the quietest region within a
//! search window around that prediction. Anchoring on the found end keeps
//! timing errors from accumulating across a side.

use tracing::debug;

use super::{segments_from_boundaries, BoundaryLocator};
use crate::audio_analysis::amplitude_to_db;
use crate::config::AnalysisParams;
use crate::segment::{SilenceGap, TrackSegment};
use crate::timeline::GlobalTimeline;

/// Per-track search record of the duration-first locator.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCandidate {
    pub predicted_end: f64,
    /// Searched range `(start, end)` after clamping to the timeline
    pub search_window: (f64, f64),
    /// Quietest region found; `None` for the final track, which always runs
    /// to the end of the audio
    pub chosen_region: Option<SilenceGap>,
    /// Mean RMS of the chosen region
    pub region_energy: f64,
    pub derived_start: f64,
    pub end: f64,
}

pub struct DurationFirstLocator {
    expected_durations: Vec<f64>,
    search_radius_sec: f64,
    region_sec: f64,
}

impl DurationFirstLocator {
    pub fn new(expected_durations: Vec<f64>, search_radius_sec: f64, region_sec: f64) -> Self {
        Self {
            expected_durations,
            search_radius_sec,
            region_sec,
        }
    }

    pub fn from_params(expected_durations: Vec<f64>, params: &AnalysisParams) -> Self {
        Self::new(expected_durations, params.search_radius_sec, params.region_sec)
    }

    pub fn expected_durations(&self) -> &[f64] {
        &self.expected_durations
    }

    /// Run the per-track search and return one candidate per expected track.
    pub fn candidates(&self, timeline: &GlobalTimeline) -> Vec<BoundaryCandidate> {
        let total = timeline.total_duration();
        let last = self.expected_durations.len().saturating_sub(1);
        let mut cursor = 0.0;
        let mut candidates = Vec::with_capacity(self.expected_durations.len());

        for (i, &expected) in self.expected_durations.iter().enumerate() {
            let predicted_end = cursor + expected;
            let search_window = self.search_window(predicted_end, cursor, total);

            let (chosen_region, region_energy, end) = if i == last {
                (None, 0.0, total)
            } else {
                let (region, energy) = self.quietest_region(timeline, search_window);
                (Some(region), energy, region.midpoint())
            };

            // Never start before the previous track ended
            let derived_start = (end - expected).max(cursor);

            debug!(
                track = i + 1,
                predicted_end,
                window_start = search_window.0,
                window_end = search_window.1,
                end,
                drift = end - predicted_end,
                region_db = amplitude_to_db(region_energy),
                "placed track boundary"
            );

            candidates.push(BoundaryCandidate {
                predicted_end,
                search_window,
                chosen_region,
                region_energy,
                derived_start,
                end,
            });
            cursor = end;
        }

        candidates
    }

    /// `[predicted_end - radius, predicted_end + radius]` clamped to the
    /// audio still ahead of the cursor. If that collapses, the whole
    /// remainder is searched.
    fn search_window(&self, predicted_end: f64, cursor: f64, total: f64) -> (f64, f64) {
        let start = (predicted_end - self.search_radius_sec).max(cursor).max(0.0);
        let end = (predicted_end + self.search_radius_sec).min(total);
        if end > start {
            (start, end)
        } else {
            (cursor.min(total), total)
        }
    }

    /// Slide a fixed-width region over the window in RMS-window steps and
    /// return the one with the lowest mean energy. Ties go to the earliest
    /// region. A window narrower than the region is its own single candidate.
    fn quietest_region(&self, timeline: &GlobalTimeline, window: (f64, f64)) -> (SilenceGap, f64) {
        let (window_start, window_end) = window;
        let energy = timeline.energy();
        let spans = timeline.spans();

        let region_windows = ((self.region_sec / timeline.window_sec()).round() as usize).max(1);
        let lo = timeline.window_index_at(window_start);
        let hi = spans.partition_point(|s| s.end <= window_end).max(lo);

        if hi - lo < region_windows {
            let mean = mean_energy(&energy[lo..hi]).unwrap_or(0.0);
            let whole = SilenceGap {
                start: window_start,
                end: window_end,
            };
            return (whole, mean);
        }

        let mut best_index = lo;
        let mut best_energy = f64::INFINITY;
        for i in lo..=hi - region_windows {
            if let Some(mean) = mean_energy(&energy[i..i + region_windows]) {
                if mean < best_energy {
                    best_energy = mean;
                    best_index = i;
                }
            }
        }

        let region = SilenceGap {
            start: spans[best_index].start,
            end: spans[best_index + region_windows - 1].end,
        };
        (region, best_energy)
    }
}

fn mean_energy(values: &[f32]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    Some(sum / values.len() as f64)
}

impl BoundaryLocator for DurationFirstLocator {
    fn locate(&self, timeline: &GlobalTimeline) -> Vec<TrackSegment> {
        let ranges: Vec<(f64, f64)> = self
            .candidates(timeline)
            .iter()
            .map(|c| (c.derived_start, c.end))
            .collect();
        segments_from_boundaries(timeline, &ranges)
    }

    fn name(&self) -> &str {
        "Guided (expected durations)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::file_energy;

    /// Loud signal in 0.5s windows with quiet windows at the given indices.
    fn timeline_with_quiet(files: &[(&str, usize)], quiet: &[usize]) -> GlobalTimeline {
        let mut offset = 0;
        let entries = files
            .iter()
            .map(|&(name, windows)| {
                let rms = (offset..offset + windows)
                    .map(|i| if quiet.contains(&i) { 0.01 } else { 1.0 })
                    .collect();
                offset += windows;
                file_energy(name, rms, 0.5)
            })
            .collect();
        GlobalTimeline::from_energy(entries, 0.5).unwrap()
    }

    #[test]
    fn test_drift_correction_uses_found_end() {
        // Quiet at 64.5-65.5s and 125.5-126.5s, 190s total
        let timeline = timeline_with_quiet(&[("side.wav", 380)], &[129, 130, 251, 252]);
        let locator = DurationFirstLocator::new(vec![60.0, 60.0, 60.0], 15.0, 1.0);

        let candidates = locator.candidates(&timeline);
        assert_eq!(candidates.len(), 3);

        assert_eq!(candidates[0].predicted_end, 60.0);
        assert_eq!(candidates[0].end, 65.0);
        assert_eq!(candidates[0].derived_start, 5.0);

        // Next prediction is anchored on the found end, not on 120
        assert_eq!(candidates[1].predicted_end, 125.0);
        assert_eq!(candidates[1].search_window, (110.0, 140.0));
        assert_eq!(candidates[1].end, 126.0);
        assert_eq!(candidates[1].derived_start, 66.0);

        assert_eq!(candidates[2].predicted_end, 186.0);
        assert_eq!(candidates[2].chosen_region, None);
        assert_eq!(candidates[2].end, 190.0);
    }

    #[test]
    fn test_segments_are_ordered_and_end_at_total() {
        let timeline = timeline_with_quiet(&[("side.wav", 380)], &[129, 130, 251, 252]);
        let locator = DurationFirstLocator::new(vec![60.0, 60.0, 60.0], 15.0, 1.0);
        let segments = locator.locate(&timeline);

        assert_eq!(segments.len(), 3);
        for (i, s) in segments.iter().enumerate() {
            assert_eq!(s.track_number, i as u32 + 1);
            assert!(s.start < s.end);
        }
        for pair in segments.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(segments[2].end, timeline.total_duration());
    }

    #[test]
    fn test_tie_goes_to_earliest_region() {
        // Two equally quiet regions inside the same search window
        let timeline = timeline_with_quiet(&[("side.wav", 200)], &[110, 111, 130, 131]);
        let locator = DurationFirstLocator::new(vec![60.0, 40.0], 15.0, 1.0);
        let candidates = locator.candidates(&timeline);
        assert_eq!(candidates[0].end, 55.5);
    }

    #[test]
    fn test_search_crosses_file_boundary() {
        // Boundary at 62s lives in the second file
        let timeline = timeline_with_quiet(&[("a.wav", 120), ("b.wav", 120)], &[123, 124]);
        let locator = DurationFirstLocator::new(vec![60.0, 60.0], 15.0, 1.0);
        let segments = locator.locate(&timeline);

        assert_eq!(segments[0].end, 62.0);
        assert_eq!(
            segments[0].source_files,
            vec![
                std::path::PathBuf::from("a.wav"),
                std::path::PathBuf::from("b.wav")
            ]
        );
        assert!(segments[0].spans_files());
        assert_eq!(segments[1].end, 120.0);
    }

    #[test]
    fn test_prediction_past_end_searches_remainder() {
        // 40s of audio but durations add up to far more
        let timeline = timeline_with_quiet(&[("side.wav", 80)], &[]);
        let locator = DurationFirstLocator::new(vec![100.0, 100.0], 15.0, 1.0);
        let candidates = locator.candidates(&timeline);

        assert_eq!(candidates[0].search_window, (0.0, 40.0));
        assert!(candidates[0].end > 0.0 && candidates[0].end < 40.0);
        assert_eq!(candidates[1].end, 40.0);
        assert!(candidates[1].derived_start < candidates[1].end);
    }

    #[test]
    fn test_remainder_shorter_than_region_is_single_candidate() {
        let timeline = timeline_with_quiet(&[("side.wav", 80)], &[]);
        let locator = DurationFirstLocator::new(vec![39.8, 10.0], 15.0, 1.0);
        let candidates = locator.candidates(&timeline);
        // Window is [24.8, 40.0]; region search still succeeds
        assert!(candidates[0].chosen_region.is_some());

        let locator = DurationFirstLocator::new(vec![100.0, 10.0], 15.0, 50.0);
        let candidates = locator.candidates(&timeline);
        let region = candidates[0].chosen_region.unwrap();
        assert_eq!((region.start, region.end), (0.0, 40.0));
        assert_eq!(candidates[0].end, 20.0);
    }
}
