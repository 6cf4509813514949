//! Boundary locators that turn a global energy timeline into track segments.
//!
//! - Guided (duration-first): predicts each track end from its expected
//!   duration and snaps it to the quietest nearby region
//! - Silence threshold: finds long low-energy runs relative to the median
//!   level, used when durations are unknown

pub mod guided;
pub mod silence_threshold;

pub use guided::{BoundaryCandidate, DurationFirstLocator};
pub use silence_threshold::SilenceThresholdLocator;

use crate::segment::TrackSegment;
use crate::timeline::GlobalTimeline;

/// Common trait for boundary location strategies
pub trait BoundaryLocator {
    /// Split the timeline into contiguous, numbered track segments.
    fn locate(&self, timeline: &GlobalTimeline) -> Vec<TrackSegment>;

    /// Get the strategy name
    fn name(&self) -> &str;
}

/// Build numbered segments from `(start, end)` pairs in track order.
pub(crate) fn segments_from_boundaries(
    timeline: &GlobalTimeline,
    boundaries: &[(f64, f64)],
) -> Vec<TrackSegment> {
    boundaries
        .iter()
        .enumerate()
        .map(|(i, &(start, end))| TrackSegment {
            source_files: timeline.files_in_range(start, end),
            start,
            end,
            track_number: i as u32 + 1,
            track_name: String::new(),
        })
        .collect()
}
