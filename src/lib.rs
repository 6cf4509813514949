pub mod album;
pub mod audio_analysis;
pub mod config;
pub mod cuefile;
pub mod decision;
pub mod detection_strategies;
pub mod error;
pub mod extractor;
pub mod sample_reader;
pub mod segment;
pub mod timeline;
pub mod wavfile;

pub use album::{analyze_album, extract_segments, AlbumAnalysis};
pub use config::{AnalysisParams, Config};
pub use decision::{
    choose_strategy, propose_segments, ExpectedTracks, SegmentPlan, SegmentationMethod, Strategy,
};
pub use detection_strategies::{BoundaryLocator, DurationFirstLocator, SilenceThresholdLocator};
pub use error::{Result, SplitError};
pub use extractor::{extract_segment, ExtractionReport};
pub use sample_reader::{read_samples, SampleStream};
pub use segment::{SilenceGap, TrackSegment};
pub use timeline::{FileEnergyProfile, GlobalTimeline};

#[cfg(test)]
pub(crate) mod test_util {
    use byteorder::{LittleEndian, WriteBytesExt};
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    use crate::wavfile::{write_wav_header, write_wav_header_with_fmt, WAVE_FORMAT_EXTENSIBLE};

    /// Write interleaved integer samples as a PCM WAV file.
    pub fn write_pcm_wav(path: &Path, rate: u32, channels: u16, bits: u16, samples: &[i32]) {
        let width = bits as usize / 8;
        let mut data = Vec::with_capacity(samples.len() * width);
        for &s in samples {
            data.extend_from_slice(&s.to_le_bytes()[..width]);
        }

        let mut file = File::create(path).unwrap();
        write_wav_header(&mut file, data.len() as u32, rate, channels, bits).unwrap();
        file.write_all(&data).unwrap();
    }

    /// 40-byte WAVE_FORMAT_EXTENSIBLE fmt body for 24-bit integer PCM.
    pub fn extensible_fmt(rate: u32, channels: u16, valid_bits: u16, mask: u32) -> Vec<u8> {
        let block_align = channels * 3;
        let mut fmt = Vec::with_capacity(40);
        fmt.write_u16::<LittleEndian>(WAVE_FORMAT_EXTENSIBLE).unwrap();
        fmt.write_u16::<LittleEndian>(channels).unwrap();
        fmt.write_u32::<LittleEndian>(rate).unwrap();
        fmt.write_u32::<LittleEndian>(rate * block_align as u32).unwrap();
        fmt.write_u16::<LittleEndian>(block_align).unwrap();
        fmt.write_u16::<LittleEndian>(24).unwrap();
        fmt.write_u16::<LittleEndian>(22).unwrap(); // cbSize
        fmt.write_u16::<LittleEndian>(valid_bits).unwrap();
        fmt.write_u32::<LittleEndian>(mask).unwrap();
        // KSDATAFORMAT_SUBTYPE_PCM
        fmt.extend_from_slice(&[
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38,
            0x9B, 0x71,
        ]);
        fmt
    }

    /// Write 24-bit samples under an extensible header.
    pub fn write_extensible_wav(path: &Path, fmt: &[u8], samples: &[i32]) {
        let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()[..3].to_vec()).collect();
        let mut file = File::create(path).unwrap();
        write_wav_header_with_fmt(&mut file, fmt, data.len() as u32).unwrap();
        file.write_all(&data).unwrap();
    }
}
