//! Cutting proposed segments out of their WAV sources.
//!
//! Frames are copied verbatim, so the output keeps the channel count, sample
//! width and sample rate of its source. Each output is written to a
//! temporary file next to the destination and renamed into place, which
//! means an existing file is either fully replaced or left untouched.

use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::error::{Result, SplitError};
use crate::segment::TrackSegment;
use crate::timeline::GlobalTimeline;
use crate::wavfile;

/// Frame range of one segment inside its source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutPlan {
    pub file_index: usize,
    pub source: PathBuf,
    pub start_frame: u64,
    pub end_frame: u64,
    /// Audio past the end of the source file that will be missing from the
    /// output, in seconds
    pub truncated_seconds: f64,
}

/// Result of one successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub track_number: u32,
    pub output: PathBuf,
    pub source: PathBuf,
    pub start_frame: u64,
    pub end_frame: u64,
    pub truncated_seconds: f64,
}

impl ExtractionReport {
    pub fn is_truncated(&self) -> bool {
        self.truncated_seconds > 0.0
    }
}

/// Map a segment's global range onto frames of the file containing its start.
///
/// A range that runs past that file is clamped to the file end; the lost
/// part is reported in `truncated_seconds`.
pub fn plan_cut(timeline: &GlobalTimeline, segment: &TrackSegment) -> CutPlan {
    let (file_index, local_start) = timeline.localize(segment.start);
    let profile = &timeline.profiles()[file_index];
    let rate = profile.sample_rate as f64;
    let total_frames = (profile.duration * rate).round() as u64;

    let wanted_end = segment.end - profile.global_offset;
    let local_end = wanted_end.min(profile.duration);
    let overshoot = wanted_end - profile.duration;
    // Less than half a frame is rounding, not a cross-file span
    let truncated_seconds = if overshoot * rate >= 0.5 { overshoot } else { 0.0 };

    let start_frame = ((local_start.max(0.0) * rate).round() as u64).min(total_frames);
    let end_frame = ((local_end.max(0.0) * rate).round() as u64).clamp(start_frame, total_frames);

    CutPlan {
        file_index,
        source: profile.path.clone(),
        start_frame,
        end_frame,
        truncated_seconds,
    }
}

/// Write one segment to `output`.
///
/// # Errors
/// `ExtractionIo` when the source cannot be read (non-WAV sources are
/// reported as `Unsupported`) or the output cannot be written. No partial
/// file is left at `output` in either case.
pub fn extract_segment(
    timeline: &GlobalTimeline,
    segment: &TrackSegment,
    output: &Path,
) -> Result<ExtractionReport> {
    let cut = plan_cut(timeline, segment);
    if cut.truncated_seconds > 0.0 {
        warn!(
            track = segment.track_number,
            source = %cut.source.display(),
            missing_seconds = cut.truncated_seconds,
            "track crosses into the next file; output is truncated at the end of its first file"
        );
    }

    copy_frames(&cut.source, output, cut.start_frame, cut.end_frame).map_err(|source| {
        SplitError::ExtractionIo {
            track_number: segment.track_number,
            path: output.to_path_buf(),
            source,
        }
    })?;

    info!(
        track = segment.track_number,
        output = %output.display(),
        frames = cut.end_frame - cut.start_frame,
        "extracted track"
    );

    Ok(ExtractionReport {
        track_number: segment.track_number,
        output: output.to_path_buf(),
        source: cut.source,
        start_frame: cut.start_frame,
        end_frame: cut.end_frame,
        truncated_seconds: cut.truncated_seconds,
    })
}

/// Extract every segment into `out_dir`, named `"NN - Name.wav"`.
///
/// A failing segment does not stop the others; each gets its own result.
pub fn extract_all(
    timeline: &GlobalTimeline,
    segments: &[TrackSegment],
    out_dir: &Path,
) -> Result<Vec<Result<ExtractionReport>>> {
    fs::create_dir_all(out_dir)?;
    Ok(segments
        .iter()
        .map(|segment| {
            let output = out_dir.join(segment.output_file_name(segments.len()));
            extract_segment(timeline, segment, &output)
        })
        .collect())
}

fn copy_frames(source: &Path, output: &Path, start_frame: u64, end_frame: u64) -> io::Result<()> {
    let is_wav = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
        .unwrap_or(false);
    if !is_wav {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("only WAV sources can be cut: {}", source.display()),
        ));
    }

    let mut reader = BufReader::new(File::open(source)?);
    let header = wavfile::read_wav_header(&mut reader)?;
    let align = header.block_align() as u64;
    let end_frame = end_frame.min(header.frame_count());
    let start_frame = start_frame.min(end_frame);

    let data_len = (end_frame - start_frame) * align;
    let header_len = 21 + header.fmt_chunk.len() as u64;
    let data_size = u32::try_from(data_len)
        .ok()
        .filter(|&n| n as u64 + header_len <= u32::MAX as u64)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "segment too large for WAV"))?;

    reader.seek(SeekFrom::Start(header.data_offset + start_frame * align))?;

    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        wavfile::write_wav_header_with_fmt(&mut writer, &header.fmt_chunk, data_size)?;
        let copied = io::copy(&mut reader.by_ref().take(data_len), &mut writer)?;
        if copied != data_len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("source ended after {} of {} bytes", copied, data_len),
            ));
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(output).map_err(|e| e.error)?;

    Ok(())
}
