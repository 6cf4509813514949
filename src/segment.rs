//! Track segments, silence gaps and the helpers used to review a proposed split.

use serde::Serialize;
use std::path::PathBuf;

/// Segments shorter than this fraction of the median are flagged as scraps.
const SHORT_SEGMENT_FRACTION: f64 = 0.3;
/// ...and only if they are also shorter than this many seconds.
const SHORT_SEGMENT_MAX_SEC: f64 = 15.0;

/// A detected quiet interval on the global timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SilenceGap {
    pub start: f64,
    pub end: f64,
}

impl SilenceGap {
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One track of the album as a range of global time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSegment {
    /// Source files the range overlaps, in timeline order. Extraction only
    /// uses the first one.
    pub source_files: Vec<PathBuf>,
    pub start: f64,
    pub end: f64,
    pub track_number: u32,
    pub track_name: String,
}

impl TrackSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// True when the range covers more than one source file.
    pub fn spans_files(&self) -> bool {
        self.source_files.len() > 1
    }

    /// The track name, or "Track N" when none was given.
    pub fn display_name(&self) -> String {
        if self.track_name.trim().is_empty() {
            format!("Track {}", self.track_number)
        } else {
            self.track_name.clone()
        }
    }

    /// Output file name such as `"03 - Song.wav"`, zero padded to the width of
    /// `track_count`.
    pub fn output_file_name(&self, track_count: usize) -> String {
        let pad = track_count.max(1).to_string().len();
        let name: String = self
            .display_name()
            .chars()
            .map(|c| match c {
                '/' | '\\' | '\0' => '_',
                c => c,
            })
            .collect();
        format!("{:0pad$} - {}.wav", self.track_number, name, pad = pad)
    }
}

/// Indices of suspiciously short segments (typically lead-in or lead-out scraps).
pub fn find_short_segments(segments: &[TrackSegment]) -> Vec<usize> {
    let mut durations: Vec<f64> = segments.iter().map(TrackSegment::duration).collect();
    if durations.is_empty() {
        return Vec::new();
    }
    durations.sort_by(|a, b| a.total_cmp(b));
    let median = durations[durations.len() / 2];
    let threshold = median * SHORT_SEGMENT_FRACTION;

    segments
        .iter()
        .enumerate()
        .filter(|(_, s)| s.duration() < threshold && s.duration() < SHORT_SEGMENT_MAX_SEC)
        .map(|(i, _)| i)
        .collect()
}

/// Remove the given segment indices and renumber the rest from 1.
pub fn drop_segments(segments: Vec<TrackSegment>, indices: &[usize]) -> Vec<TrackSegment> {
    segments
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !indices.contains(i))
        .map(|(_, s)| s)
        .enumerate()
        .map(|(i, mut s)| {
            s.track_number = i as u32 + 1;
            s
        })
        .collect()
}

/// Name segments in order. Extra names are ignored; segments without a
/// name keep their current one.
pub fn apply_track_names(segments: &mut [TrackSegment], names: &[String]) {
    for (segment, name) in segments.iter_mut().zip(names) {
        segment.track_name = name.clone();
    }
}
