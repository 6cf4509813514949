//! Decoding of source files into normalized mono sample streams.
//!
//! WAV files are decoded directly from their PCM payload so that 16, 24 and
//! 32 bit integer data map onto `[-1, 1]` by dividing by the bit depth's full
//! scale. Other lossless containers (FLAC) go through symphonia.

use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::error::{Result, SplitError};
use crate::wavfile::{self, WAVE_FORMAT_EXTENSIBLE, WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM};

/// Decoded, normalized mono signal of one source file.
#[derive(Debug, Clone)]
pub struct SampleStream {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count before downmixing
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl SampleStream {
    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Full-scale magnitude for a signed integer bit depth.
pub fn full_scale(bits_per_sample: u16) -> Option<f64> {
    match bits_per_sample {
        16 => Some(32768.0),
        24 => Some(8388608.0),
        32 => Some(2147483648.0),
        _ => None,
    }
}

/// Decode one packed little-endian 24-bit sample.
pub fn decode_i24(bytes: [u8; 3]) -> i32 {
    let sign = if bytes[2] & 0x80 != 0 { 0xff } else { 0x00 };
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], sign])
}

/// Decode interleaved integer PCM into normalized mono samples.
///
/// Channels are averaged per frame. A trailing partial frame is ignored.
pub fn decode_pcm(
    data: &[u8],
    bits_per_sample: u16,
    channels: u16,
) -> std::result::Result<Vec<f32>, String> {
    let max_value = full_scale(bits_per_sample)
        .ok_or_else(|| format!("Unsupported bit depth: {}", bits_per_sample))?;
    if channels == 0 {
        return Err("File declares zero channels".to_string());
    }

    let width = bits_per_sample as usize / 8;
    let frame_size = width * channels as usize;

    let samples = data
        .chunks_exact(frame_size)
        .map(|frame| {
            let sum: f64 = frame
                .chunks_exact(width)
                .map(|s| {
                    let value = match width {
                        2 => LittleEndian::read_i16(s) as i32,
                        3 => decode_i24([s[0], s[1], s[2]]),
                        _ => LittleEndian::read_i32(s),
                    };
                    value as f64 / max_value
                })
                .sum();
            (sum / channels as f64) as f32
        })
        .collect();

    Ok(samples)
}

/// Read a source file into a normalized mono stream.
///
/// # Errors
/// `SplitError::Decode` when the file cannot be read, uses an unsupported
/// sample format, or contains no frames.
pub fn read_samples(path: &Path) -> Result<SampleStream> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
        .unwrap_or(false);

    let stream = if is_wav {
        read_wav(path)?
    } else {
        read_with_symphonia(path)?
    };

    if stream.samples.is_empty() {
        return Err(SplitError::decode(path, "File contains no audio frames"));
    }

    debug!(
        path = %path.display(),
        sample_rate = stream.sample_rate,
        channels = stream.channels,
        bits = stream.bits_per_sample,
        duration = stream.duration_seconds(),
        "decoded source file"
    );

    Ok(stream)
}

fn read_wav(path: &Path) -> Result<SampleStream> {
    let io_err = |e: io::Error| SplitError::decode(path, e.to_string());

    let file = File::open(path).map_err(io_err)?;
    let mut reader = BufReader::new(file);
    let header = wavfile::read_wav_header(&mut reader).map_err(io_err)?;

    match header.audio_format {
        WAVE_FORMAT_PCM | WAVE_FORMAT_EXTENSIBLE => {}
        WAVE_FORMAT_IEEE_FLOAT => {
            return Err(SplitError::decode(path, "IEEE float WAV is not supported"));
        }
        other => {
            return Err(SplitError::decode(
                path,
                format!("Unsupported WAV format tag 0x{:04x}", other),
            ));
        }
    }
    if header.sample_rate == 0 {
        return Err(SplitError::decode(path, "Sample rate is zero"));
    }

    let mut data = Vec::with_capacity(header.data_size as usize);
    reader
        .take(header.data_size)
        .read_to_end(&mut data)
        .map_err(io_err)?;

    let samples = decode_pcm(&data, header.bits_per_sample, header.num_channels)
        .map_err(|reason| SplitError::decode(path, reason))?;

    Ok(SampleStream {
        samples,
        sample_rate: header.sample_rate,
        channels: header.num_channels,
        bits_per_sample: header.bits_per_sample,
    })
}

fn read_with_symphonia(path: &Path) -> Result<SampleStream> {
    let file = File::open(path).map_err(|e| SplitError::decode(path, e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| SplitError::decode(path, format!("Failed to probe file: {}", e)))?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SplitError::decode(path, "No audio tracks found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| SplitError::decode(path, "Sample rate not specified in file"))?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(1);
    let bits_per_sample = track.codec_params.bits_per_sample.unwrap_or(0) as u16;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| SplitError::decode(path, format!("Failed to create decoder: {}", e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(SplitError::decode(path, e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let frame_channels = spec.channels.count().max(1);
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend(
                    buf.samples()
                        .chunks_exact(frame_channels)
                        .map(|frame| frame.iter().sum::<f32>() / frame_channels as f32),
                );
            }
            // Corrupt packets are skipped, not fatal
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = %path.display(), "skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(SplitError::decode(path, e.to_string())),
        }
    }

    Ok(SampleStream {
        samples,
        sample_rate,
        channels,
        bits_per_sample,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::write_pcm_wav;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_decode_i24_sign_extension() {
        assert_eq!(decode_i24([0x00, 0x00, 0x00]), 0);
        assert_eq!(decode_i24([0xff, 0xff, 0x7f]), 8_388_607);
        assert_eq!(decode_i24([0x00, 0x00, 0x80]), -8_388_608);
        assert_eq!(decode_i24([0xff, 0xff, 0xff]), -1);
        assert_eq!(decode_i24([0x34, 0x12, 0x00]), 0x1234);
    }

    #[test]
    fn test_24bit_values_survive_normalization() {
        let values: Vec<i32> = vec![
            0, 1, -1, 4_194_304, -4_194_304, 8_388_607, -8_388_608, 123_456, -654_321,
        ];
        let mut data = Vec::new();
        for v in &values {
            data.extend_from_slice(&v.to_le_bytes()[..3]);
        }

        let decoded = decode_pcm(&data, 24, 1).unwrap();
        assert_eq!(decoded.len(), values.len());
        for (sample, &original) in decoded.iter().zip(&values) {
            let restored = *sample as f64 * 8_388_608.0;
            assert!((restored - original as f64).abs() <= 1.0);
        }
    }

    #[test]
    fn test_stereo_is_averaged() {
        let mut data = Vec::new();
        for v in [16384i16, 0, -16384, -16384] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let decoded = decode_pcm(&data, 16, 2).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_relative_eq!(decoded[0], 0.25);
        assert_relative_eq!(decoded[1], -0.5);
    }

    #[test]
    fn test_32bit_full_scale() {
        let mut data = Vec::new();
        data.extend_from_slice(&i32::MIN.to_le_bytes());
        data.extend_from_slice(&(i32::MAX / 2).to_le_bytes());
        let decoded = decode_pcm(&data, 32, 1).unwrap();
        assert_relative_eq!(decoded[0], -1.0);
        assert_relative_eq!(decoded[1], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        assert!(decode_pcm(&[0u8; 4], 8, 1).is_err());
    }

    #[test]
    fn test_read_wav_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("side_a.wav");
        let frames: Vec<i32> = (0..800).flat_map(|i| [i * 100, -(i * 100)]).collect();
        write_pcm_wav(&path, 8000, 2, 24, &frames);

        let stream = read_samples(&path).unwrap();
        assert_eq!(stream.sample_rate, 8000);
        assert_eq!(stream.channels, 2);
        assert_eq!(stream.bits_per_sample, 24);
        assert_eq!(stream.frames(), 800);
        assert_relative_eq!(stream.duration_seconds(), 0.1);
        // left and right cancel out
        assert!(stream.samples.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_zero_frames_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        write_pcm_wav(&path, 44100, 2, 16, &[]);

        assert!(matches!(
            read_samples(&path),
            Err(SplitError::Decode { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_samples(&dir.path().join("nope.wav")),
            Err(SplitError::Decode { .. })
        ));
    }
}
