//! Minimal RIFF/WAVE container codec for 16-bit linear PCM.

use crate::error::{Result, Robot36Error};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

pub const WAV_HEADER_SIZE: usize = 44;
pub const PCM_FORMAT: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

const PREAMBLE_SIZE: usize = 12;
const CHUNK_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct WavData {
    /// First-channel samples.
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    /// Channel count declared by the container, before downmixing.
    pub channels: u16,
}

#[derive(Debug, Clone, Copy)]
struct FormatChunk {
    channels: u16,
    sample_rate: u32,
}

pub fn parse(bytes: &[u8]) -> Result<WavData> {
    if bytes.len() < PREAMBLE_SIZE || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(Robot36Error::MalformedContainer(
            "missing RIFF/WAVE preamble".into(),
        ));
    }

    let mut pos = PREAMBLE_SIZE;
    let mut format: Option<FormatChunk> = None;

    while pos + CHUNK_HEADER_SIZE <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let size = (&bytes[pos + 4..pos + 8]).read_u32::<LittleEndian>()? as usize;
        let body = pos + CHUNK_HEADER_SIZE;
        let end = body.saturating_add(size).min(bytes.len());

        match id {
            b"fmt " => format = Some(parse_format(&bytes[body..end])?),
            b"data" => {
                let interleaved = read_samples(&bytes[body..end])?;
                let format = format.unwrap_or(FormatChunk {
                    channels: 1,
                    sample_rate: crate::SAMPLE_RATE,
                });
                if format.channels == 0 {
                    return Err(Robot36Error::MalformedContainer("zero channels".into()));
                }

                log::debug!(
                    "data chunk: {} samples, {} channel(s) at {} Hz",
                    interleaved.len(),
                    format.channels,
                    format.sample_rate
                );

                return Ok(WavData {
                    samples: first_channel(interleaved, format.channels),
                    sample_rate: format.sample_rate,
                    channels: format.channels,
                });
            }
            _ => log::trace!("skipping chunk {:?} ({} bytes)", String::from_utf8_lossy(id), size),
        }

        // RIFF chunks are word aligned
        pos = body.saturating_add(size).saturating_add(size & 1);
    }

    Err(Robot36Error::MalformedContainer("data chunk not found".into()))
}

fn parse_format(body: &[u8]) -> Result<FormatChunk> {
    let mut cursor = Cursor::new(body);
    let truncated = |_| Robot36Error::MalformedContainer("truncated fmt chunk".into());

    let audio_format = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
    let channels = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
    let sample_rate = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
    let _byte_rate = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
    let _block_align = cursor.read_u16::<LittleEndian>().map_err(truncated)?;
    let bits_per_sample = cursor.read_u16::<LittleEndian>().map_err(truncated)?;

    if audio_format != PCM_FORMAT || bits_per_sample != BITS_PER_SAMPLE {
        return Err(Robot36Error::UnsupportedFormat(format!(
            "format tag {}, {} bits per sample (only 16-bit PCM is supported)",
            audio_format, bits_per_sample
        )));
    }

    Ok(FormatChunk {
        channels,
        sample_rate,
    })
}

fn read_samples(data: &[u8]) -> Result<Vec<i16>> {
    let mut samples = vec![0i16; data.len() / 2];
    Cursor::new(data).read_i16_into::<LittleEndian>(&mut samples)?;
    Ok(samples)
}

/// Keeps every `channels`-th sample, i.e. only the first channel.
fn first_channel(interleaved: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return interleaved;
    }
    interleaved
        .chunks_exact(channels as usize)
        .map(|frame| frame[0])
        .collect()
}

pub fn serialize(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let block_align = channels as u32 * 2;
    let byte_rate = sample_rate * block_align;
    let data_size = (samples.len() * 2) as u32;

    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + samples.len() * 2);

    out.extend_from_slice(b"RIFF");
    out.write_u32::<LittleEndian>(WAV_HEADER_SIZE as u32 - 8 + data_size).unwrap();
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.write_u32::<LittleEndian>(16).unwrap();
    out.write_u16::<LittleEndian>(PCM_FORMAT).unwrap();
    out.write_u16::<LittleEndian>(channels).unwrap();
    out.write_u32::<LittleEndian>(sample_rate).unwrap();
    out.write_u32::<LittleEndian>(byte_rate).unwrap();
    out.write_u16::<LittleEndian>(block_align as u16).unwrap();
    out.write_u16::<LittleEndian>(BITS_PER_SAMPLE).unwrap();

    out.extend_from_slice(b"data");
    out.write_u32::<LittleEndian>(data_size).unwrap();

    for &sample in samples {
        out.write_i16::<LittleEndian>(sample).unwrap();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wav_roundtrip() {
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN, 1234, -4321];
        let bytes = serialize(&samples, 44100, 1);
        let parsed = parse(&bytes).unwrap();

        assert_eq!(parsed.samples, samples);
        assert_eq!(parsed.sample_rate, 44100);
        assert_eq!(parsed.channels, 1);
    }

    #[test]
    fn test_header_layout() {
        let bytes = serialize(&[1, 2, 3], 44100, 2);

        assert_eq!(bytes.len(), 44 + 6);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 42);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(bytes[20..22].try_into().unwrap()), 1);
        assert_eq!(u16::from_le_bytes(bytes[22..24].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 44100);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 176400);
        assert_eq!(u16::from_le_bytes(bytes[32..34].try_into().unwrap()), 4);
        assert_eq!(u16::from_le_bytes(bytes[34..36].try_into().unwrap()), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 6);
    }

    #[test]
    fn test_stereo_keeps_first_channel() {
        let interleaved = [10i16, -10, 20, -20, 30, -30];
        let parsed = parse(&serialize(&interleaved, 48000, 2)).unwrap();

        assert_eq!(parsed.samples, vec![10, 20, 30]);
        assert_eq!(parsed.channels, 2);
        assert_eq!(parsed.sample_rate, 48000);
    }

    #[test]
    fn test_skips_unknown_chunks() {
        let plain = serialize(&[7, 8, 9], 44100, 1);
        let mut bytes = plain[..36].to_vec();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 2, 3, 0]);
        bytes.extend_from_slice(&plain[36..]);

        assert_eq!(parse(&bytes).unwrap().samples, vec![7, 8, 9]);
    }

    #[test]
    fn test_rejects_non_pcm16() {
        let mut bytes = serialize(&[0; 4], 44100, 1);
        bytes[34] = 8;
        assert!(matches!(parse(&bytes), Err(Robot36Error::UnsupportedFormat(_))));

        let mut bytes = serialize(&[0; 4], 44100, 1);
        bytes[20] = 3;
        assert!(matches!(parse(&bytes), Err(Robot36Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_oversized_data_chunk_is_clamped() {
        let bytes = serialize(&[1, 2, 3, 4], 44100, 1);
        // declared size still says 8 bytes; one full sample plus a stray byte remain
        let parsed = parse(&bytes[..47]).unwrap();
        assert_eq!(parsed.samples, vec![1]);

        let mut bytes = serialize(&[5, 6], 44100, 1);
        bytes[40..44].copy_from_slice(&1000u32.to_le_bytes());
        assert_eq!(parse(&bytes).unwrap().samples, vec![5, 6]);
    }

    #[test]
    fn test_rejects_zero_channels() {
        let mut bytes = serialize(&[0; 4], 44100, 1);
        bytes[22..24].copy_from_slice(&0u16.to_le_bytes());
        assert!(matches!(
            parse(&bytes),
            Err(Robot36Error::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_short_fmt_chunk_is_truncated() {
        let plain = serialize(&[7, 8], 44100, 1);
        // fmt declares 14 bytes, so bits-per-sample lies outside the chunk
        let mut bytes = plain[..16].to_vec();
        bytes.extend_from_slice(&14u32.to_le_bytes());
        bytes.extend_from_slice(&plain[20..34]);
        bytes.extend_from_slice(&plain[36..]);

        match parse(&bytes) {
            Err(Robot36Error::MalformedContainer(msg)) => assert!(msg.contains("fmt")),
            other => panic!("expected truncated fmt chunk, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_chunk() {
        let bytes = serialize(&[0; 4], 44100, 1);
        assert!(matches!(
            parse(&bytes[..36]),
            Err(Robot36Error::MalformedContainer(_))
        ));
        assert!(matches!(
            parse(b"not a wav file"),
            Err(Robot36Error::MalformedContainer(_))
        ));
    }
}
