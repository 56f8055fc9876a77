//! Byte-level encode and decode operations.

use crate::demodulation::{DecodeReport, Robot36Demodulator};
use crate::error::Result;
use crate::modulation::Robot36Modulator;
use crate::raster::{load_rgb, Frame, YuvPlanes};
use crate::signal::Signal;
use crate::wav;
use crate::Config;

#[derive(Debug, Clone)]
pub struct Decoded {
    pub frame: Frame,
    pub report: DecodeReport,
}

impl Decoded {
    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.frame.to_png()
    }
}

/// Any picture the `image` crate can read → mono 16-bit PCM WAV.
pub fn encode_image(image_bytes: &[u8], config: &Config) -> Result<Vec<u8>> {
    let rgb = load_rgb(image_bytes)?;
    let planes = YuvPlanes::from_image(&rgb);
    encode_planes(&planes, config)
}

/// Packed 320x240 RGB → WAV, for callers that did their own resizing.
pub fn encode_rgb(rgb: &[u8], width: usize, height: usize, config: &Config) -> Result<Vec<u8>> {
    let planes = YuvPlanes::from_rgb(rgb, width, height)?;
    encode_planes(&planes, config)
}

fn encode_planes(planes: &YuvPlanes, config: &Config) -> Result<Vec<u8>> {
    let signal = Robot36Modulator::new(config.clone()).modulate(planes)?;
    Ok(wav::serialize(&signal.to_pcm16(), signal.sample_rate, 1))
}

/// WAV bytes → luma frame plus decode diagnostics.
pub fn decode_wav(wav_bytes: &[u8], config: &Config) -> Result<Decoded> {
    let data = wav::parse(wav_bytes)?;
    let signal = Signal::from_pcm16(&data.samples, data.sample_rate);
    log::debug!(
        "decoding {} samples ({:.2} s)",
        signal.len(),
        signal.duration_secs()
    );

    let (frame, report) = Robot36Demodulator::new(config.clone()).demodulate(&signal);
    Ok(Decoded { frame, report })
}
