//! Audio analysis utilities for RMS computation and energy smoothing.

/// Number of samples covered by one RMS window (at least one).
pub fn samples_per_window(sample_rate: u32, window_sec: f64) -> usize {
    ((sample_rate as f64 * window_sec).round() as usize).max(1)
}

/// Root-mean-square of a block of samples, 0 for an empty block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt() as f32
}

/// Compute one RMS value per window over a mono stream.
///
/// Windows start at sample 0. The trailing partial window is kept, so the
/// result has `ceil(samples.len() / samples_per_window)` entries.
///
/// # Arguments
/// * `samples` - Normalized mono samples
/// * `sample_rate` - Sample rate of the stream
/// * `window_sec` - Window duration in seconds
pub fn compute_rms_windows(samples: &[f32], sample_rate: u32, window_sec: f64) -> Vec<f32> {
    samples
        .chunks(samples_per_window(sample_rate, window_sec))
        .map(rms)
        .collect()
}

/// Running median filter.
///
/// Uses `kernel / 2` neighbours on each side; near the edges the window
/// shrinks instead of padding. A kernel of 1 (or less) returns the input.
pub fn median_filter(values: &[f32], kernel: usize) -> Vec<f32> {
    let half = kernel / 2;
    if half == 0 {
        return values.to_vec();
    }

    let len = values.len();
    let mut scratch = Vec::with_capacity(2 * half + 1);
    (0..len)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(len);
            scratch.clear();
            scratch.extend_from_slice(&values[start..end]);
            median_in_place(&mut scratch).unwrap_or(0.0)
        })
        .collect()
}

/// Median of a set of values (mean of the two middle values for even counts).
pub fn median(values: &[f32]) -> Option<f32> {
    median_in_place(&mut values.to_vec())
}

fn median_in_place(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Convert a linear amplitude to dBFS, floored at -80 dB.
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        (20.0 * amplitude.log10()).max(-80.0)
    } else {
        -80.0
    }
}
