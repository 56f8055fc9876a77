use crate::protocol::{LineTiming, IMAGE_HEIGHT, IMAGE_WIDTH};
use crate::raster::Frame;
use crate::signal::Signal;
use crate::spectral::{detect_frequency, frequency_to_intensity};
use crate::sync::{RefinementStats, SyncLocator};
use crate::vis::VisCode;
use crate::Config;
use rayon::prelude::*;

/// Diagnostics gathered while decoding one signal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    pub sample_rate: u32,
    /// Mode announced by the VIS header, if one was found and passed parity.
    pub vis_code: Option<VisCode>,
    pub header_end: Option<usize>,
    pub sync_pulses: usize,
    /// Set when too few pulses were found and fixed timing was used instead.
    pub fallback: bool,
    pub refinement: RefinementStats,
    pub lines_decoded: usize,
}

/// Where each line starts, and how that was determined.
#[derive(Debug, Clone, PartialEq)]
pub enum TimingGrid {
    Synced(Vec<f64>),
    Fixed(Vec<f64>),
}

impl TimingGrid {
    pub fn positions(&self) -> &[f64] {
        match self {
            TimingGrid::Synced(positions) | TimingGrid::Fixed(positions) => positions,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TimingGrid::Fixed(_))
    }
}

pub struct Robot36Demodulator {
    config: Config,
}

impl Robot36Demodulator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Recovers the line grid, falling back to fixed timing when sync
    /// detection is unreliable.
    pub fn timing_grid(&self, signal: &Signal) -> (TimingGrid, DecodeReport) {
        let config = self.config_for(signal);
        let scan = SyncLocator::new(config.clone()).locate(&signal.samples);

        let mut report = DecodeReport {
            sample_rate: signal.sample_rate,
            vis_code: scan.header.and_then(|header| header.code),
            header_end: scan.header.map(|header| header.end),
            sync_pulses: scan.detected.len(),
            refinement: scan.stats,
            ..Default::default()
        };

        if let Some(code) = report.vis_code.filter(|&code| code != VisCode::ROBOT36) {
            log::warn!("VIS code {:#04x} is not Robot36, decoding anyway", code.get());
        }

        if scan.detected.len() < config.min_sync_pulses {
            log::warn!(
                "insufficient sync detected ({} pulses), using fixed timing",
                scan.detected.len()
            );
            report.fallback = true;
            return (fixed_grid(&config), report);
        }

        (TimingGrid::Synced(scan.refined), report)
    }

    pub fn demodulate(&self, signal: &Signal) -> (Frame, DecodeReport) {
        let (grid, mut report) = self.timing_grid(signal);
        let (frame, lines) = self.decode_lines(signal, grid.positions());
        report.lines_decoded = lines;

        log::info!(
            "decoded {} lines ({} timing)",
            lines,
            if grid.is_fallback() { "fixed" } else { "sync" }
        );
        (frame, report)
    }

    /// Fills one frame row per grid entry until the luma scan would run off
    /// the end of the signal. Rows are independent and decoded in parallel.
    pub fn decode_lines(&self, signal: &Signal, grid: &[f64]) -> (Frame, usize) {
        let timing = LineTiming::new(signal.sample_rate);
        let samples = &signal.samples;
        let luma_offset = timing.luma_offset() as f64;

        let lines = grid
            .iter()
            .take(IMAGE_HEIGHT)
            .take_while(|&&sync| sync + luma_offset + (timing.luma as f64) < samples.len() as f64)
            .count();

        let mut frame = Frame::robot36();
        frame
            .pixels
            .par_chunks_mut(IMAGE_WIDTH)
            .zip(grid[..lines].par_iter())
            .for_each(|(row, &sync)| {
                decode_row(samples, sync + luma_offset, &timing, signal.sample_rate, row);
            });

        (frame, lines)
    }

    fn config_for(&self, signal: &Signal) -> Config {
        if signal.sample_rate != self.config.sample_rate {
            log::warn!(
                "signal is sampled at {} Hz, expected {} Hz; timing follows the signal",
                signal.sample_rate,
                self.config.sample_rate
            );
        }
        self.config.with_sample_rate(signal.sample_rate)
    }
}

fn fixed_grid(config: &Config) -> TimingGrid {
    let start = config.fallback_start() as f64;
    let line = LineTiming::new(config.sample_rate).line as f64;
    TimingGrid::Fixed((0..IMAGE_HEIGHT).map(|n| start + n as f64 * line).collect())
}

fn decode_row(samples: &[f32], scan_start: f64, timing: &LineTiming, rate: u32, row: &mut [u8]) {
    let per_pixel = timing.luma as f64 / row.len() as f64;
    for (x, pixel) in row.iter_mut().enumerate() {
        let center = (scan_start + (x as f64 + 0.5) * per_pixel).floor() as usize;
        let freq = detect_frequency(samples, center, per_pixel.floor() as usize, rate);
        *pixel = frequency_to_intensity(freq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulation::Robot36Modulator;
    use crate::raster::YuvPlanes;

    const BANDS: [u8; 5] = [0, 62, 128, 191, 255];

    /// Horizontal bands of constant gray, 8 rows each.
    fn banded_planes() -> (YuvPlanes, Vec<u8>) {
        let luma: Vec<u8> = (0..IMAGE_WIDTH * IMAGE_HEIGHT)
            .map(|i| BANDS[(i / IMAGE_WIDTH / 8) % BANDS.len()])
            .collect();
        let rgb: Vec<u8> = luma.iter().flat_map(|&v| [v, v, v]).collect();
        let planes = YuvPlanes::from_rgb(&rgb, IMAGE_WIDTH, IMAGE_HEIGHT).unwrap();
        (planes, luma)
    }

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_with_sync() {
        let config = Config::default();
        let (planes, luma) = banded_planes();
        let signal = Robot36Modulator::new(config.clone()).modulate(&planes).unwrap();

        let (frame, report) = Robot36Demodulator::new(config).demodulate(&signal);

        assert!(!report.fallback);
        assert_eq!(report.vis_code, Some(VisCode::ROBOT36));
        assert!(report.sync_pulses >= 238, "only {} pulses", report.sync_pulses);
        assert_eq!(report.lines_decoded, IMAGE_HEIGHT);

        let close = frame
            .pixels
            .iter()
            .zip(&luma)
            .filter(|&(&got, &want)| got.abs_diff(want) <= 10)
            .count();
        let ratio = close as f32 / luma.len() as f32;
        assert!(ratio >= 0.95, "only {:.1}% of pixels within tolerance", ratio * 100.0);

        // every row lands on its own band, so no line is shifted vertically
        for y in 0..IMAGE_HEIGHT {
            let mut row = frame.row(y).to_vec();
            row.sort_unstable();
            let median = row[IMAGE_WIDTH / 2];
            let want = BANDS[(y / 8) % BANDS.len()];
            assert!(median.abs_diff(want) <= 10, "row {} median {}", y, median);
        }
    }

    #[test]
    fn test_follows_container_sample_rate() {
        let (planes, _) = banded_planes();
        let encoder_config = Config::default().with_sample_rate(48000);
        let signal = Robot36Modulator::new(encoder_config).modulate(&planes).unwrap();
        assert_eq!(signal.sample_rate, 48000);

        // tuned for 44.1 kHz, yet timing must follow the signal
        let (frame, report) = Robot36Demodulator::new(Config::default()).demodulate(&signal);

        assert_eq!(report.sample_rate, 48000);
        assert!(!report.fallback);
        assert_eq!(report.vis_code, Some(VisCode::ROBOT36));
        assert!(report.sync_pulses >= 238, "only {} pulses", report.sync_pulses);
        assert_eq!(report.lines_decoded, IMAGE_HEIGHT);
        assert_eq!(frame.get(IMAGE_WIDTH / 2, 0), 0);
    }

    #[test]
    fn test_silence_falls_back_to_fixed_timing() {
        let signal = Signal::new(vec![0.0; 44100 * 40], 44100);
        let (frame, report) = Robot36Demodulator::new(Config::default()).demodulate(&signal);

        assert!(report.fallback);
        assert_eq!(report.sync_pulses, 0);
        assert_eq!(frame.pixels.len(), IMAGE_WIDTH * IMAGE_HEIGHT);
        assert_eq!(report.lines_decoded, IMAGE_HEIGHT);
    }

    #[test]
    fn test_noise_falls_back_to_fixed_timing() {
        let signal = Signal::new(noise(44100 * 5, 7), 44100);
        let (frame, report) = Robot36Demodulator::new(Config::default()).demodulate(&signal);

        assert!(report.fallback);
        assert_eq!((frame.width, frame.height), (IMAGE_WIDTH, IMAGE_HEIGHT));
        // only the lines that fit into five seconds after the 1.2 s start
        assert!(report.lines_decoded < IMAGE_HEIGHT);
        let untouched = &frame.pixels[report.lines_decoded * IMAGE_WIDTH..];
        assert!(untouched.iter().all(|&p| p == 0));
        assert_eq!(frame.get(IMAGE_WIDTH - 1, IMAGE_HEIGHT - 1), 0);
    }

    #[test]
    fn test_fixed_grid_spacing() {
        let TimingGrid::Fixed(grid) = fixed_grid(&Config::default()) else {
            panic!("expected a fixed grid");
        };
        assert_eq!(grid.len(), IMAGE_HEIGHT);
        assert_eq!(grid[0], 52920.0);
        assert_eq!(grid[1] - grid[0], 6619.0);
    }

    #[test]
    fn test_decode_lines_stops_at_signal_end() {
        let signal = Signal::new(vec![0.0; 10_000], 44100);
        let demodulator = Robot36Demodulator::new(Config::default());

        let (_, lines) = demodulator.decode_lines(&signal, &[0.0, 6000.0, 9000.0]);
        assert_eq!(lines, 1);
    }
}
