//! Horizontal sync detection and timing recovery.

use crate::protocol::{
    LineTiming, BLACK_FREQUENCY, SEPARATOR_HIGH_FREQUENCY, SYNC_FREQUENCY,
};
use crate::spectral::goertzel_power;
use crate::vis::{locate_header, VisHeader};
use crate::Config;

const PEAK_SEARCH_RADIUS: usize = 50;
const PEAK_SEARCH_STEP: usize = 10;
const SPACING_SAMPLE_LINES: usize = 10;

/// How one detected pulse was reconciled with the expected line grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineFit {
    /// Within 5% of the expected position.
    Kept,
    /// Within 15%: pulled 10% towards the expected position.
    Blended,
    /// Further off: treated as a spurious trigger and replaced.
    Substituted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefinementStats {
    pub kept: usize,
    pub blended: usize,
    pub substituted: usize,
}

impl RefinementStats {
    fn record(mut self, fit: LineFit) -> Self {
        match fit {
            LineFit::Kept => self.kept += 1,
            LineFit::Blended => self.blended += 1,
            LineFit::Substituted => self.substituted += 1,
        }
        self
    }
}

/// Result of scanning one signal for sync pulses.
#[derive(Debug, Clone, Default)]
pub struct SyncScan {
    pub header: Option<VisHeader>,
    /// Raw pulse positions in detection order.
    pub detected: Vec<usize>,
    pub refined: Vec<f64>,
    pub stats: RefinementStats,
}

pub struct SyncLocator {
    config: Config,
    timing: LineTiming,
}

impl SyncLocator {
    pub fn new(config: Config) -> Self {
        let timing = LineTiming::new(config.sample_rate);
        Self { config, timing }
    }

    pub fn locate(&self, samples: &[f32]) -> SyncScan {
        let header = locate_header(samples, &self.config);
        // the leader break and the 1200 Hz VIS bits would otherwise pass as
        // line syncs, so scanning resumes after the stop bit
        let start = header
            .map_or(0, |header| header.end)
            .max(self.config.search_start());

        let detected = self.find_pulses(samples, start);
        log::info!("found {} sync pulses from sample {}", detected.len(), start);

        let (refined, stats) = refine_positions(&detected);
        SyncScan {
            header,
            detected,
            refined,
            stats,
        }
    }

    fn power(&self, samples: &[f32], pos: usize, freq: f32) -> f32 {
        goertzel_power(samples, pos, self.config.sync_window, freq, self.config.sample_rate)
    }

    fn is_sync(&self, samples: &[f32], pos: usize) -> bool {
        let sync = self.power(samples, pos, SYNC_FREQUENCY);
        sync > self.config.sync_threshold
            && sync > self.power(samples, pos, BLACK_FREQUENCY)
            && sync > self.power(samples, pos, SEPARATOR_HIGH_FREQUENCY)
    }

    /// Strided scan for 1200 Hz bursts, at most one per 80% of a line.
    pub fn find_pulses(&self, samples: &[f32], start: usize) -> Vec<usize> {
        let window = self.config.sync_window;
        let stride = self.config.sync_stride.max(1);
        let line = self.timing.line as f64;
        let min_gap = line * 0.8;
        let skip = (line * 0.7).floor() as usize;

        let mut positions = Vec::new();
        let mut last: Option<usize> = None;
        let mut i = start;

        while i + window < samples.len() {
            let too_close = last.is_some_and(|last| (i as f64 - last as f64) < min_gap);

            if !too_close && self.is_sync(samples, i) {
                let from = i.saturating_sub(PEAK_SEARCH_RADIUS).max(start);
                let fine = self.find_peak(samples, from, i + PEAK_SEARCH_RADIUS);
                log::trace!("sync candidate at {} refined to {}", i, fine);
                positions.push(fine);
                last = Some(fine);
                i += skip;
            }

            i += stride;
        }

        positions
    }

    /// Position in `from..=to` with the strongest sync-tone power.
    fn find_peak(&self, samples: &[f32], from: usize, to: usize) -> usize {
        let window = self.config.sync_window;
        let mut best_pos = from;
        let mut best_power = 0.0f32;

        for pos in (from..=to)
            .step_by(PEAK_SEARCH_STEP)
            .take_while(|&pos| pos + window < samples.len())
        {
            let power = self.power(samples, pos, SYNC_FREQUENCY);
            if power > best_power {
                best_power = power;
                best_pos = pos;
            }
        }

        best_pos
    }
}

/// Reconciles one detection with the position the grid predicts.
pub fn fit_line(detected: f64, expected: f64, spacing: f64) -> (f64, LineFit) {
    let deviation = (detected - expected).abs();
    if deviation < spacing * 0.05 {
        (detected, LineFit::Kept)
    } else if deviation < spacing * 0.15 {
        (detected * 0.9 + expected * 0.1, LineFit::Blended)
    } else {
        (expected, LineFit::Substituted)
    }
}

/// Mean gap between the first ten detections.
pub fn average_spacing(positions: &[usize]) -> Option<f64> {
    let head = &positions[..positions.len().min(SPACING_SAMPLE_LINES)];
    match head {
        [first, .., last] => Some((*last as f64 - *first as f64) / (head.len() - 1) as f64),
        _ => None,
    }
}

/// Snaps detections onto a consistent line grid.
///
/// Each expected position is projected from the previous *refined* one, so a
/// corrected line never drags its successors along.
pub fn refine_positions(positions: &[usize]) -> (Vec<f64>, RefinementStats) {
    let as_f64 = || positions.iter().map(|&p| p as f64).collect::<Vec<_>>();
    if positions.len() < 3 {
        return (as_f64(), RefinementStats::default());
    }
    let Some(spacing) = average_spacing(positions) else {
        return (as_f64(), RefinementStats::default());
    };
    log::debug!("average line spacing: {:.1} samples", spacing);

    let first = positions[0] as f64;
    let init = (vec![first], RefinementStats::default().record(LineFit::Kept));

    positions[1..]
        .iter()
        .enumerate()
        .fold(init, |(mut refined, stats), (n, &detected)| {
            let previous = refined[refined.len() - 1];
            let expected = previous + spacing;
            let (position, fit) = fit_line(detected as f64, expected, spacing);
            if fit == LineFit::Substituted {
                log::warn!(
                    "line {}: large sync deviation ({:.0} samples), using expected position",
                    n + 1,
                    (detected as f64 - expected).abs()
                );
            }
            refined.push(position);
            (refined, stats.record(fit))
        })
}
