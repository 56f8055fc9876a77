use crate::error::{Result, Robot36Error};
use crate::protocol::{
    segment_samples, transmission_samples, Tone, CHROMA_MS, HSYNC_MS, IMAGE_HEIGHT, IMAGE_WIDTH,
    LUMA_MS, PORCH_FREQUENCY, PORCH_MS, SEPARATOR_HIGH_FREQUENCY, SEPARATOR_HIGH_MS,
    SEPARATOR_LOW_FREQUENCY, SEPARATOR_LOW_MS, SYNC_FREQUENCY,
};
use crate::raster::{decimate, YuvPlanes};
use crate::signal::Signal;
use crate::spectral::intensity_to_frequency;
use crate::vis::{header_tones, VisCode};
use crate::Config;
use std::f64::consts::TAU;

/// Phase-continuous oscillator that appends tone segments to one buffer.
///
/// The phase carries over between segments and is wrapped once per segment.
#[derive(Debug, Clone)]
pub struct ToneWriter {
    samples: Vec<f32>,
    phase: f64,
    sample_rate: u32,
    volume: f32,
}

impl ToneWriter {
    pub fn new(sample_rate: u32, volume: f32) -> Self {
        Self::with_capacity(sample_rate, volume, 0)
    }

    pub fn with_capacity(sample_rate: u32, volume: f32, capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            phase: 0.0,
            sample_rate,
            volume,
        }
    }

    #[inline]
    fn push(&mut self, frequency: f32) {
        self.samples.push(self.phase.sin() as f32 * self.volume);
        self.phase += TAU * frequency as f64 / self.sample_rate as f64;
    }

    fn wrap_phase(&mut self) {
        self.phase = self.phase.rem_euclid(TAU);
    }

    pub fn append_tone(&mut self, tone: Tone) {
        let count = segment_samples(tone.duration_ms, self.sample_rate);
        for _ in 0..count {
            self.push(tone.frequency);
        }
        self.wrap_phase();
    }

    /// Sweeps `line` across `duration_ms`, picking the nearest source value
    /// by proportional position for every output sample.
    pub fn append_scanline(&mut self, line: &[f32], duration_ms: f64) {
        let count = segment_samples(duration_ms, self.sample_rate);
        if line.is_empty() {
            return;
        }
        for i in 0..count {
            let idx = (i * line.len() / count).min(line.len() - 1);
            self.push(intensity_to_frequency(line[idx]));
        }
        self.wrap_phase();
    }

    /// Appends zeros without disturbing the phase.
    pub fn append_silence(&mut self, count: usize) {
        self.samples.resize(self.samples.len() + count, 0.0);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn finish(self) -> Signal {
        Signal::new(self.samples, self.sample_rate)
    }
}

pub struct Robot36Modulator {
    config: Config,
}

impl Robot36Modulator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn write_header(&self, writer: &mut ToneWriter, code: VisCode) {
        for tone in header_tones(code) {
            writer.append_tone(tone);
        }
    }

    /// Sync, porch, luma, separators, then V on even lines and U on odd ones.
    pub fn write_line(&self, writer: &mut ToneWriter, planes: &YuvPlanes, y: usize) {
        writer.append_tone(Tone::new(SYNC_FREQUENCY, HSYNC_MS));
        writer.append_tone(Tone::new(PORCH_FREQUENCY, PORCH_MS));
        writer.append_scanline(planes.luma_row(y), LUMA_MS);
        writer.append_tone(Tone::new(SEPARATOR_LOW_FREQUENCY, SEPARATOR_LOW_MS));
        writer.append_tone(Tone::new(SEPARATOR_HIGH_FREQUENCY, SEPARATOR_HIGH_MS));

        let chroma = if y % 2 == 0 {
            planes.v_row(y)
        } else {
            planes.u_row(y)
        };
        writer.append_scanline(&decimate(chroma), CHROMA_MS);
    }

    pub fn modulate(&self, planes: &YuvPlanes) -> Result<Signal> {
        if planes.width != IMAGE_WIDTH || planes.height != IMAGE_HEIGHT {
            return Err(Robot36Error::InvalidRaster(format!(
                "Robot36 needs {}x{}, got {}x{}",
                IMAGE_WIDTH, IMAGE_HEIGHT, planes.width, planes.height
            )));
        }

        let rate = self.config.sample_rate;
        let mut writer =
            ToneWriter::with_capacity(rate, self.config.volume, transmission_samples(rate));

        self.write_header(&mut writer, VisCode::ROBOT36);
        for y in 0..planes.height {
            self.write_line(&mut writer, planes, y);
        }

        log::debug!(
            "modulated {} lines into {} samples ({:.2} s)",
            planes.height,
            writer.len(),
            writer.len() as f32 / rate as f32
        );

        Ok(writer.finish())
    }
}
