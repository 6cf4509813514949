//! Choosing how to split a timeline into tracks.
//!
//! The choice only depends on the number of source files and on what the
//! caller knows about the album:
//! 1. As many files as expected tracks: every file is one track
//! 2. Every track duration known: guided (duration-first) search
//! 3. Otherwise: silence threshold fallback

use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalysisParams;
use crate::detection_strategies::{
    segments_from_boundaries, BoundaryLocator, DurationFirstLocator, SilenceThresholdLocator,
};
use crate::error::{Result, SplitError};
use crate::segment::{apply_track_names, TrackSegment};
use crate::timeline::GlobalTimeline;

/// What the caller already knows about the album, typically from a catalog lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedTracks {
    /// Explicit target track count
    pub track_count: Option<usize>,
    /// Expected duration per track in seconds, `None` where unknown
    pub durations: Vec<Option<f64>>,
    pub names: Vec<String>,
}

impl ExpectedTracks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_durations(durations: Vec<Option<f64>>) -> Self {
        Self {
            durations,
            ..Self::default()
        }
    }

    /// Durations in milliseconds, as catalogs usually report them.
    pub fn from_millis(durations_ms: &[Option<u64>]) -> Self {
        Self::from_durations(
            durations_ms
                .iter()
                .map(|d| d.map(|ms| ms as f64 / 1000.0))
                .collect(),
        )
    }

    pub fn with_track_count(mut self, count: usize) -> Self {
        self.track_count = Some(count);
        self
    }

    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Number of tracks the album should have, if anything says so.
    pub fn target_count(&self) -> Option<usize> {
        self.track_count
            .or_else(|| (!self.durations.is_empty()).then_some(self.durations.len()))
            .or_else(|| (!self.names.is_empty()).then_some(self.names.len()))
    }

    /// All durations, if one positive duration is known for every target track.
    pub fn known_durations(&self) -> Option<Vec<f64>> {
        let target = self.target_count()?;
        if target == 0 || self.durations.len() != target {
            return None;
        }
        self.durations
            .iter()
            .map(|d| d.filter(|v| v.is_finite() && *v > 0.0))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMethod {
    /// Each source file is one track, no search performed
    OneToOne,
    DurationFirst,
    /// Fallback; boundaries need review
    SilenceThreshold,
}

impl SegmentationMethod {
    pub fn is_reliable(&self) -> bool {
        !matches!(self, SegmentationMethod::SilenceThreshold)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SegmentationMethod::OneToOne => "one file per track",
            SegmentationMethod::DurationFirst => "duration-first",
            SegmentationMethod::SilenceThreshold => "silence threshold (unverified)",
        }
    }
}

/// The selected way of splitting one timeline.
pub enum Strategy {
    OneToOne,
    DurationFirst(DurationFirstLocator),
    SilenceThreshold(SilenceThresholdLocator),
}

impl Strategy {
    pub fn method(&self) -> SegmentationMethod {
        match self {
            Strategy::OneToOne => SegmentationMethod::OneToOne,
            Strategy::DurationFirst(_) => SegmentationMethod::DurationFirst,
            Strategy::SilenceThreshold(_) => SegmentationMethod::SilenceThreshold,
        }
    }

    pub fn locator(&self) -> Option<&dyn BoundaryLocator> {
        match self {
            Strategy::OneToOne => None,
            Strategy::DurationFirst(locator) => Some(locator as &dyn BoundaryLocator),
            Strategy::SilenceThreshold(locator) => Some(locator as &dyn BoundaryLocator),
        }
    }
}

/// Pick the strategy for a recording made of `file_count` files.
pub fn choose_strategy(
    file_count: usize,
    expected: &ExpectedTracks,
    params: &AnalysisParams,
) -> Strategy {
    if expected.target_count() == Some(file_count) {
        return Strategy::OneToOne;
    }
    match expected.known_durations() {
        Some(durations) => {
            Strategy::DurationFirst(DurationFirstLocator::from_params(durations, params))
        }
        None => Strategy::SilenceThreshold(SilenceThresholdLocator::from_params(params)),
    }
}

/// Proposed track list for one timeline, ready for review.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentPlan {
    pub method: SegmentationMethod,
    pub total_duration: f64,
    pub segments: Vec<TrackSegment>,
}

impl SegmentPlan {
    pub fn is_reliable(&self) -> bool {
        self.method.is_reliable()
    }

    /// Track numbers of segments that cross a file boundary and will be
    /// truncated on extraction.
    pub fn cross_file_tracks(&self) -> Vec<u32> {
        self.segments
            .iter()
            .filter(|s| s.spans_files())
            .map(|s| s.track_number)
            .collect()
    }
}

/// Propose track segments for an assembled timeline.
///
/// # Errors
/// `SegmentCountMismatch` when the silence fallback finds a different number
/// of tracks than the caller expects. The proposed segments travel with the
/// error so they can be adjusted by hand.
pub fn propose_segments(
    timeline: &GlobalTimeline,
    expected: &ExpectedTracks,
    params: &AnalysisParams,
) -> Result<SegmentPlan> {
    let strategy = choose_strategy(timeline.file_count(), expected, params);
    let method = strategy.method();

    let mut segments = match strategy.locator() {
        None => {
            let ranges: Vec<(f64, f64)> = timeline
                .profiles()
                .iter()
                .map(|p| (p.global_offset, p.global_end()))
                .collect();
            segments_from_boundaries(timeline, &ranges)
        }
        Some(locator) => {
            info!(strategy = locator.name(), "searching for track boundaries");
            locator.locate(timeline)
        }
    };
    apply_track_names(&mut segments, &expected.names);

    if method == SegmentationMethod::SilenceThreshold {
        warn!(
            found = segments.len(),
            "track durations unknown, boundaries come from silence detection and need review"
        );
        if let Some(target) = expected.target_count() {
            if target != segments.len() {
                return Err(SplitError::SegmentCountMismatch {
                    expected: target,
                    found: segments.len(),
                    segments,
                });
            }
        }
    }

    let plan = SegmentPlan {
        method,
        total_duration: timeline.total_duration(),
        segments,
    };
    for track in plan.cross_file_tracks() {
        warn!(
            track,
            "track spans two source files; extraction will stop at the end of the first file"
        );
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::file_energy;
    use std::path::PathBuf;

    fn loud(name: &str, seconds: usize) -> crate::timeline::FileEnergy {
        file_energy(name, vec![0.5; seconds * 2], 0.5)
    }

    fn with_quiet(name: &str, seconds: usize, quiet: &[(usize, usize)]) -> crate::timeline::FileEnergy {
        let rms = (0..seconds * 2)
            .map(|i| {
                if quiet.iter().any(|&(s, e)| i >= s * 2 && i < e * 2) {
                    0.001
                } else {
                    0.5
                }
            })
            .collect();
        file_energy(name, rms, 0.5)
    }

    #[test]
    fn test_known_durations() {
        let expected = ExpectedTracks::from_millis(&[Some(180_000), Some(200_500)]);
        assert_eq!(expected.target_count(), Some(2));
        assert_eq!(expected.known_durations(), Some(vec![180.0, 200.5]));

        let partial = ExpectedTracks::from_durations(vec![Some(180.0), None]);
        assert_eq!(partial.known_durations(), None);

        // count and duration list disagree
        let short = ExpectedTracks::from_durations(vec![Some(180.0)]).with_track_count(2);
        assert_eq!(short.known_durations(), None);

        assert_eq!(ExpectedTracks::new().target_count(), None);
    }

    #[test]
    fn test_choose_strategy() {
        let params = AnalysisParams::default();

        let expected = ExpectedTracks::new().with_track_count(3);
        assert_eq!(choose_strategy(3, &expected, &params).method(), SegmentationMethod::OneToOne);

        let expected = ExpectedTracks::from_durations(vec![Some(60.0), Some(60.0), Some(60.0)]);
        assert_eq!(
            choose_strategy(1, &expected, &params).method(),
            SegmentationMethod::DurationFirst
        );

        let expected = ExpectedTracks::from_durations(vec![Some(60.0), None, Some(60.0)]);
        assert_eq!(
            choose_strategy(1, &expected, &params).method(),
            SegmentationMethod::SilenceThreshold
        );
        assert_eq!(
            choose_strategy(2, &ExpectedTracks::new(), &params).method(),
            SegmentationMethod::SilenceThreshold
        );
    }

    #[test]
    fn test_one_to_one_skips_search() {
        let timeline = GlobalTimeline::from_energy(
            vec![loud("01.wav", 100), loud("02.wav", 150), loud("03.wav", 90)],
            0.5,
        )
        .unwrap();
        // Durations deliberately disagree with the files; they must be ignored
        let expected = ExpectedTracks::from_durations(vec![Some(10.0), Some(10.0), Some(320.0)])
            .with_names(vec!["A".into(), "B".into(), "C".into()]);

        let plan = propose_segments(&timeline, &expected, &AnalysisParams::default()).unwrap();
        assert_eq!(plan.method, SegmentationMethod::OneToOne);
        assert_eq!(plan.segments.len(), 3);

        let ranges: Vec<(f64, f64)> = plan.segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(ranges, vec![(0.0, 100.0), (100.0, 250.0), (250.0, 340.0)]);
        assert_eq!(plan.segments[1].source_files, vec![PathBuf::from("02.wav")]);
        assert_eq!(plan.segments[2].track_name, "C");
        assert!(plan.cross_file_tracks().is_empty());
    }

    #[test]
    fn test_duration_first_plan() {
        let timeline = GlobalTimeline::from_energy(
            vec![with_quiet("side.wav", 190, &[(64, 66), (125, 127)])],
            0.5,
        )
        .unwrap();
        let expected = ExpectedTracks::from_durations(vec![Some(60.0), Some(60.0), Some(60.0)]);

        let plan = propose_segments(&timeline, &expected, &AnalysisParams::default()).unwrap();
        assert_eq!(plan.method, SegmentationMethod::DurationFirst);
        assert!(plan.is_reliable());
        assert_eq!(plan.segments.len(), 3);
        assert_eq!(plan.segments[2].end, 190.0);
    }

    #[test]
    fn test_silence_fallback_count_mismatch_is_reported() {
        let timeline = GlobalTimeline::from_energy(
            vec![with_quiet("side.wav", 120, &[(40, 42)])],
            0.5,
        )
        .unwrap();
        let expected = ExpectedTracks::new().with_track_count(3);

        match propose_segments(&timeline, &expected, &AnalysisParams::default()) {
            Err(SplitError::SegmentCountMismatch {
                expected,
                found,
                segments,
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
                assert_eq!(segments.len(), 2);
            }
            other => panic!("expected count mismatch, got {:?}", other.map(|p| p.method)),
        }
    }

    #[test]
    fn test_silence_fallback_without_target() {
        let timeline = GlobalTimeline::from_energy(
            vec![with_quiet("side.wav", 120, &[(40, 42), (80, 82)])],
            0.5,
        )
        .unwrap();

        let plan =
            propose_segments(&timeline, &ExpectedTracks::new(), &AnalysisParams::default()).unwrap();
        assert_eq!(plan.method, SegmentationMethod::SilenceThreshold);
        assert!(!plan.is_reliable());
        assert_eq!(plan.segments.len(), 3);
        assert_eq!(plan.segments[1].start, 41.0);
    }
}
