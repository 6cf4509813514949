//! Top-level operations: propose segments for an album, then materialize them.
//!
//! The two steps are independent so a caller can review (and edit) the
//! proposed segments in between.

use std::path::Path;
use tracing::info;

use crate::config::AnalysisParams;
use crate::decision::{propose_segments, ExpectedTracks, SegmentPlan};
use crate::error::Result;
use crate::extractor::{extract_all, ExtractionReport};
use crate::segment::TrackSegment;
use crate::timeline::GlobalTimeline;

/// Timeline and proposed segments of one album.
#[derive(Debug, Clone)]
pub struct AlbumAnalysis {
    pub timeline: GlobalTimeline,
    pub plan: SegmentPlan,
}

/// Analyze the files of one album, in the given order, and propose segments.
pub fn analyze_album<P: AsRef<Path>>(
    paths: &[P],
    expected: &ExpectedTracks,
    params: &AnalysisParams,
) -> Result<AlbumAnalysis> {
    params.validate()?;
    let timeline = GlobalTimeline::assemble(paths, params.window_sec)?;
    let plan = propose_segments(&timeline, expected, params)?;

    info!(
        method = plan.method.as_str(),
        tracks = plan.segments.len(),
        "proposed segmentation"
    );
    Ok(AlbumAnalysis { timeline, plan })
}

/// Write approved segments into `out_dir`, one result per segment.
pub fn extract_segments(
    timeline: &GlobalTimeline,
    segments: &[TrackSegment],
    out_dir: &Path,
) -> Result<Vec<Result<ExtractionReport>>> {
    extract_all(timeline, segments, out_dir)
}
