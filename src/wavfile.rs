//! WAV file I/O utilities for reading and writing RIFF/WAVE headers.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// WAV file header information
#[derive(Debug, Clone, PartialEq)]
pub struct WavHeader {
    pub audio_format: u16,
    pub sample_rate: u32,
    pub num_channels: u16,
    pub bits_per_sample: u16,
    /// Byte offset of the first sample in the file
    pub data_offset: u64,
    pub data_size: u64,
    /// Body of the `fmt ` chunk as stored in the file, extension included
    pub fmt_chunk: Vec<u8>,
}

impl WavHeader {
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize + 7) / 8
    }

    pub fn block_align(&self) -> usize {
        self.bytes_per_sample() * self.num_channels as usize
    }

    pub fn frame_count(&self) -> u64 {
        match self.block_align() {
            0 => 0,
            align => self.data_size / align as u64,
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Read and parse a WAV file header.
///
/// Walks the RIFF chunk list until the `data` chunk, picking up `fmt ` on the
/// way. On return the reader is positioned at the first sample. A data size
/// larger than the remaining stream (common for recordings that were never
/// finalized) is clamped to what is actually there.
pub fn read_wav_header<R: Read + Seek>(reader: &mut R) -> io::Result<WavHeader> {
    let mut riff = [0u8; 12];
    reader.read_exact(&mut riff)?;

    if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
        return Err(invalid("Not a valid WAV file"));
    }

    let mut fmt_chunk: Option<Vec<u8>> = None;

    loop {
        let mut chunk_id = [0u8; 4];
        if reader.read_exact(&mut chunk_id).is_err() {
            return Err(invalid("Could not find data chunk"));
        }
        let chunk_size = reader.read_u32::<LittleEndian>()? as u64;

        match &chunk_id {
            b"fmt " => {
                if chunk_size < 16 {
                    return Err(invalid("fmt chunk too short"));
                }
                if chunk_size > 1024 {
                    return Err(invalid("fmt chunk too long"));
                }
                let mut body = vec![0u8; chunk_size as usize];
                reader.read_exact(&mut body)?;
                // pad byte of odd-sized chunks
                reader.seek(SeekFrom::Current((chunk_size & 1) as i64))?;
                fmt_chunk = Some(body);
            }
            b"data" => {
                let fmt_chunk = fmt_chunk.ok_or_else(|| invalid("data chunk before fmt chunk"))?;

                let data_offset = reader.stream_position()?;
                let stream_end = reader.seek(SeekFrom::End(0))?;
                reader.seek(SeekFrom::Start(data_offset))?;
                let available = stream_end.saturating_sub(data_offset);

                return Ok(WavHeader {
                    audio_format: LittleEndian::read_u16(&fmt_chunk[0..2]),
                    num_channels: LittleEndian::read_u16(&fmt_chunk[2..4]),
                    sample_rate: LittleEndian::read_u32(&fmt_chunk[4..8]),
                    bits_per_sample: LittleEndian::read_u16(&fmt_chunk[14..16]),
                    data_offset,
                    data_size: chunk_size.min(available),
                    fmt_chunk,
                });
            }
            _ => {
                reader.seek(SeekFrom::Current((chunk_size + (chunk_size & 1)) as i64))?;
            }
        }
    }
}

/// Write a canonical 44-byte PCM WAV header.
pub fn write_wav_header<W: Write>(
    writer: &mut W,
    data_size: u32,
    rate: u32,
    channels: u16,
    bits_per_sample: u16,
) -> io::Result<()> {
    let bytes_per_sample = (bits_per_sample + 7) / 8;
    let block_align = channels * bytes_per_sample;

    let mut fmt = [0u8; 16];
    LittleEndian::write_u16(&mut fmt[0..2], WAVE_FORMAT_PCM);
    LittleEndian::write_u16(&mut fmt[2..4], channels);
    LittleEndian::write_u32(&mut fmt[4..8], rate);
    LittleEndian::write_u32(&mut fmt[8..12], rate * block_align as u32);
    LittleEndian::write_u16(&mut fmt[12..14], block_align);
    LittleEndian::write_u16(&mut fmt[14..16], bits_per_sample);

    write_wav_header_with_fmt(writer, &fmt, data_size)
}

/// Write a WAV header around an existing `fmt ` chunk body.
///
/// Used to keep extensible headers (channel mask, valid bits) intact when
/// copying audio out of a source file.
pub fn write_wav_header_with_fmt<W: Write>(
    writer: &mut W,
    fmt_chunk: &[u8],
    data_size: u32,
) -> io::Result<()> {
    let fmt_size = u32::try_from(fmt_chunk.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "fmt chunk too large"))?;
    let fmt_pad = fmt_size & 1;

    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(
        data_size.saturating_add(20 + fmt_size + fmt_pad),
    )?;
    writer.write_all(b"WAVE")?;
    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(fmt_size)?;
    writer.write_all(fmt_chunk)?;
    if fmt_pad == 1 {
        writer.write_u8(0)?;
    }
    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_size)?;
    Ok(())
}
