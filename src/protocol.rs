//! Robot36 timing and tone constants.

pub const IMAGE_WIDTH: usize = 320;
pub const IMAGE_HEIGHT: usize = 240;

pub const BLACK_FREQUENCY: f32 = 1500.0;
pub const WHITE_FREQUENCY: f32 = 2300.0;
pub const SYNC_FREQUENCY: f32 = 1200.0;
pub const PORCH_FREQUENCY: f32 = 1500.0;
pub const SEPARATOR_LOW_FREQUENCY: f32 = 1500.0;
pub const SEPARATOR_HIGH_FREQUENCY: f32 = 1900.0;
pub const LEADER_FREQUENCY: f32 = 1900.0;
pub const VIS_ONE_FREQUENCY: f32 = 1100.0;
pub const VIS_ZERO_FREQUENCY: f32 = 1300.0;

pub const LEADER_MS: f64 = 300.0;
pub const LEADER_BREAK_MS: f64 = 10.0;
pub const VIS_BIT_MS: f64 = 30.0;

pub const HSYNC_MS: f64 = 9.0;
pub const PORCH_MS: f64 = 3.0;
pub const LUMA_MS: f64 = 88.064;
pub const SEPARATOR_LOW_MS: f64 = 4.5;
pub const SEPARATOR_HIGH_MS: f64 = 1.5;
pub const CHROMA_MS: f64 = 44.032;
pub const LINE_MS: f64 = 150.096;

/// A constant-frequency segment of the transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency: f32,
    pub duration_ms: f64,
}

impl Tone {
    pub const fn new(frequency: f32, duration_ms: f64) -> Self {
        Self {
            frequency,
            duration_ms,
        }
    }
}

/// Number of samples a synthesized segment of `ms` occupies (truncated).
pub fn segment_samples(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0).floor() as usize
}

/// Nominal sample count of a protocol interval, rounded to the nearest sample.
pub fn nominal_samples(ms: f64, sample_rate: u32) -> usize {
    (ms * sample_rate as f64 / 1000.0).round() as usize
}

/// Per-line timing as seen by the decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineTiming {
    pub hsync: usize,
    pub porch: usize,
    pub luma: usize,
    pub line: usize,
}

impl LineTiming {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            hsync: nominal_samples(HSYNC_MS, sample_rate),
            porch: nominal_samples(PORCH_MS, sample_rate),
            luma: nominal_samples(LUMA_MS, sample_rate),
            line: nominal_samples(LINE_MS, sample_rate),
        }
    }

    /// Offset from the start of a sync burst to the first luma sample.
    pub fn luma_offset(&self) -> usize {
        self.hsync + self.porch
    }
}

/// Samples the encoder emits for the calibration header and VIS code.
pub fn header_samples(sample_rate: u32) -> usize {
    2 * segment_samples(LEADER_MS, sample_rate)
        + segment_samples(LEADER_BREAK_MS, sample_rate)
        + 10 * segment_samples(VIS_BIT_MS, sample_rate)
}

/// Samples the encoder emits for one scanline.
pub fn line_samples(sample_rate: u32) -> usize {
    [HSYNC_MS, PORCH_MS, LUMA_MS, SEPARATOR_LOW_MS, SEPARATOR_HIGH_MS, CHROMA_MS]
        .iter()
        .map(|&ms| segment_samples(ms, sample_rate))
        .sum()
}

/// Total length of an encoded transmission in samples.
pub fn transmission_samples(sample_rate: u32) -> usize {
    header_samples(sample_rate) + IMAGE_HEIGHT * line_samples(sample_rate)
}
