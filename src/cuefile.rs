//! CUE sheet export for a proposed segmentation.
//!
//! A multi-file recording gets one `FILE` entry per source file, and each
//! track's `INDEX 01` is given in the local time of the file it starts in.
//! Plans from the silence fallback are written as `.guess.cue` so they are
//! not mistaken for duration-checked boundaries.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::decision::{SegmentPlan, SegmentationMethod};
use crate::timeline::GlobalTimeline;

/// Format seconds as CUE `MM:SS:FF` (75 frames per second).
pub fn format_cue_time(seconds: f64) -> String {
    let total_frames = (seconds.max(0.0) * 75.0).round() as u64;
    let minutes = total_frames / (75 * 60);
    let secs = (total_frames / 75) % 60;
    let frames = total_frames % 75;
    format!("{:02}:{:02}:{:02}", minutes, secs, frames)
}

/// Generate CUE file content from a segment plan.
///
/// # Arguments
/// * `timeline` - Timeline the plan was made from
/// * `plan` - Proposed segments
/// * `artist` - Artist name for the CUE sheet
/// * `title` - Album/release title for the CUE sheet
pub fn generate_cue_sheet(
    timeline: &GlobalTimeline,
    plan: &SegmentPlan,
    artist: &str,
    title: &str,
) -> String {
    let mut cue = String::new();
    cue.push_str("REM GENERATOR \"vinylsplit\"\n");
    cue.push_str(&format!("REM METHOD \"{}\"\n", plan.method.as_str()));
    cue.push_str(&format!("PERFORMER \"{}\"\n", artist));
    cue.push_str(&format!("TITLE \"{}\"\n", title));

    let mut current_file: Option<usize> = None;
    for segment in &plan.segments {
        let (file_index, local_start) = timeline.localize(segment.start);
        if current_file != Some(file_index) {
            let path = &timeline.profiles()[file_index].path;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown.wav");
            cue.push_str(&format!("FILE \"{}\" WAVE\n", filename));
            current_file = Some(file_index);
        }

        cue.push_str(&format!("  TRACK {:02} AUDIO\n", segment.track_number));
        cue.push_str(&format!("    TITLE \"{}\"\n", segment.display_name()));
        cue.push_str(&format!("    PERFORMER \"{}\"\n", artist));
        cue.push_str(&format!("    INDEX 01 {}\n", format_cue_time(local_start)));
    }

    cue
}

/// Path of the CUE sheet for `base` (extension replaced).
pub fn cue_path(base: &Path, method: SegmentationMethod) -> PathBuf {
    let base_path = base.with_extension("");
    if method.is_reliable() {
        base_path.with_extension("cue")
    } else {
        PathBuf::from(format!("{}.guess.cue", base_path.display()))
    }
}

/// Write CUE content next to `base`, returning the path written.
pub fn write_cue_sheet(
    base: &Path,
    cue_content: &str,
    method: SegmentationMethod,
) -> Result<PathBuf, std::io::Error> {
    let path = cue_path(base, method);
    let mut file = File::create(&path)?;
    file.write_all(cue_content.as_bytes())?;
    Ok(path)
}
