//! Global energy timeline across all files of one recording.
//!
//! Files are concatenated in the order the caller gives them. Each file keeps
//! its own RMS windows; the timeline indexes all windows by global time so
//! the locators can search across file boundaries.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::audio_analysis::{compute_rms_windows, samples_per_window};
use crate::error::{Result, SplitError};
use crate::sample_reader::read_samples;

/// Per-file energy data prior to placement on the timeline.
#[derive(Debug, Clone)]
pub struct FileEnergy {
    pub path: PathBuf,
    pub rms: Vec<f32>,
    /// Samples per RMS window, as cut by `compute_rms_windows`
    pub window_samples: usize,
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Energy profile of one source file placed on the timeline.
#[derive(Debug, Clone)]
pub struct FileEnergyProfile {
    pub path: PathBuf,
    pub rms: Vec<f32>,
    pub window_sec: f64,
    pub window_samples: usize,
    pub duration: f64,
    /// Start of this file on the global timeline
    pub global_offset: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl FileEnergyProfile {
    pub fn global_end(&self) -> f64 {
        self.global_offset + self.duration
    }

    /// Exact duration of one RMS window of this file.
    ///
    /// Differs from `window_sec` when the sample rate does not divide it
    /// evenly (11025 Hz at 0.05s gives 551 samples).
    pub fn window_duration(&self) -> f64 {
        self.window_samples as f64 / self.sample_rate as f64
    }
}

/// Global time span of one RMS window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSpan {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone)]
pub struct GlobalTimeline {
    profiles: Vec<FileEnergyProfile>,
    energy: Vec<f32>,
    spans: Vec<WindowSpan>,
    window_sec: f64,
    total_duration: f64,
}

impl GlobalTimeline {
    /// Decode every file, compute its RMS windows and assemble the timeline.
    ///
    /// Decoded samples are dropped as soon as a file's windows are computed.
    ///
    /// # Errors
    /// * `EmptyInput` - no files were given
    /// * `Decode` - any file could not be decoded
    pub fn assemble<P: AsRef<Path>>(paths: &[P], window_sec: f64) -> Result<Self> {
        if paths.is_empty() {
            return Err(SplitError::EmptyInput);
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let stream = read_samples(path)?;
            files.push(FileEnergy {
                path: path.to_path_buf(),
                rms: compute_rms_windows(&stream.samples, stream.sample_rate, window_sec),
                window_samples: samples_per_window(stream.sample_rate, window_sec),
                duration: stream.duration_seconds(),
                sample_rate: stream.sample_rate,
                channels: stream.channels,
                bits_per_sample: stream.bits_per_sample,
            });
        }

        let timeline = Self::from_energy(files, window_sec)?;
        info!(
            files = timeline.file_count(),
            total_duration = timeline.total_duration(),
            windows = timeline.window_count(),
            "assembled timeline"
        );
        Ok(timeline)
    }

    /// Place pre-computed per-file energy on a timeline, in the given order.
    ///
    /// Window `j` of a file covers its samples from `j * window_samples`, so
    /// spans follow the audio even when a window is not a whole number of
    /// samples long.
    pub fn from_energy(files: Vec<FileEnergy>, window_sec: f64) -> Result<Self> {
        if files.is_empty() {
            return Err(SplitError::EmptyInput);
        }

        let mut profiles = Vec::with_capacity(files.len());
        let mut energy = Vec::new();
        let mut spans = Vec::new();
        let mut offset = 0.0;

        for file in files {
            if file.sample_rate == 0 || file.window_samples == 0 {
                return Err(SplitError::decode(
                    &file.path,
                    "Sample rate and window size must be non-zero",
                ));
            }
            let rate = file.sample_rate as f64;
            let file_end = offset + file.duration;
            for (j, &value) in file.rms.iter().enumerate() {
                let first_sample = (j * file.window_samples) as f64;
                let start = offset + first_sample / rate;
                let end = offset + (first_sample + file.window_samples as f64) / rate;
                energy.push(value);
                spans.push(WindowSpan {
                    start,
                    end: end.min(file_end),
                });
            }

            profiles.push(FileEnergyProfile {
                path: file.path,
                rms: file.rms,
                window_sec,
                window_samples: file.window_samples,
                duration: file.duration,
                global_offset: offset,
                sample_rate: file.sample_rate,
                channels: file.channels,
                bits_per_sample: file.bits_per_sample,
            });
            offset += file.duration;
        }

        Ok(GlobalTimeline {
            profiles,
            energy,
            spans,
            window_sec,
            total_duration: offset,
        })
    }

    pub fn profiles(&self) -> &[FileEnergyProfile] {
        &self.profiles
    }

    pub fn file_count(&self) -> usize {
        self.profiles.len()
    }

    /// Concatenated RMS values of all files.
    pub fn energy(&self) -> &[f32] {
        &self.energy
    }

    pub fn spans(&self) -> &[WindowSpan] {
        &self.spans
    }

    pub fn window_count(&self) -> usize {
        self.energy.len()
    }

    pub fn window_sec(&self) -> f64 {
        self.window_sec
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    /// Map a global time to `(file_index, local_time)`.
    ///
    /// The file is the last one whose offset is at or before `global_time`.
    /// Times before zero map to the first file, times past the end to the
    /// last file (with a local time beyond its duration).
    pub fn localize(&self, global_time: f64) -> (usize, f64) {
        let index = self
            .profiles
            .partition_point(|p| p.global_offset <= global_time)
            .saturating_sub(1);
        (index, global_time - self.profiles[index].global_offset)
    }

    /// Inverse of [`localize`](Self::localize).
    pub fn globalize(&self, file_index: usize, local_time: f64) -> f64 {
        self.profiles[file_index].global_offset + local_time
    }

    /// Index of the first window starting at or after `time`.
    pub fn window_index_at(&self, time: f64) -> usize {
        self.spans.partition_point(|s| s.start < time)
    }

    /// Files overlapped by the range `[start, end)`, in timeline order.
    pub fn files_in_range(&self, start: f64, end: f64) -> Vec<PathBuf> {
        let files: Vec<PathBuf> = self
            .profiles
            .iter()
            .filter(|p| p.global_offset < end && p.global_end() > start)
            .map(|p| p.path.clone())
            .collect();
        if files.is_empty() {
            let (index, _) = self.localize(start);
            return vec![self.profiles[index].path.clone()];
        }
        files
    }
}

#[cfg(test)]
pub(crate) fn file_energy(name: &str, rms: Vec<f32>, window_sec: f64) -> FileEnergy {
    FileEnergy {
        path: PathBuf::from(name),
        duration: rms.len() as f64 * window_sec,
        rms,
        window_samples: samples_per_window(44100, window_sec),
        sample_rate: 44100,
        channels: 2,
        bits_per_sample: 16,
    }
}
