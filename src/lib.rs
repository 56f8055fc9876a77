pub mod protocol;
pub mod error;
pub mod wav;
pub mod signal;
pub mod spectral;
pub mod vis;
pub mod sync;
pub mod raster;
pub mod modulation;
pub mod demodulation;
pub mod codec;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use protocol::*;
pub use error::*;
pub use signal::Signal;
pub use vis::VisCode;
pub use raster::{Frame, YuvPlanes};
pub use modulation::Robot36Modulator;
pub use demodulation::{DecodeReport, Robot36Demodulator};
pub use codec::{decode_wav, encode_image, Decoded};

pub const SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_SYNC_THRESHOLD: f32 = 0.08;
pub const DEFAULT_SYNC_WINDOW: usize = 256;
pub const DEFAULT_SYNC_STRIDE: usize = 100;
pub const MIN_SYNC_PULSES: usize = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub sample_rate: u32,
    pub volume: f32,
    /// Minimum normalized Goertzel power for a sync candidate.
    pub sync_threshold: f32,
    pub sync_window: usize,
    pub sync_stride: usize,
    pub search_start_secs: f64,
    pub min_sync_pulses: usize,
    /// Where the fixed-timing grid starts when sync detection fails.
    pub fallback_start_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            volume: 1.0,
            sync_threshold: DEFAULT_SYNC_THRESHOLD,
            sync_window: DEFAULT_SYNC_WINDOW,
            sync_stride: DEFAULT_SYNC_STRIDE,
            search_start_secs: 0.3,
            min_sync_pulses: MIN_SYNC_PULSES,
            fallback_start_secs: 1.2,
        }
    }
}

impl Config {
    /// Same tuning, different sample rate.
    pub fn with_sample_rate(&self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self.clone()
        }
    }

    pub fn search_start(&self) -> usize {
        (self.search_start_secs * self.sample_rate as f64).round() as usize
    }

    pub fn fallback_start(&self) -> usize {
        (self.fallback_start_secs * self.sample_rate as f64).round() as usize
    }
}
