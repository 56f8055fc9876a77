//! VIS (vertical interval signaling) header: the calibration leader and the
//! 7-bit mode code that precede the image.

use crate::protocol::{
    segment_samples, Tone, BLACK_FREQUENCY, LEADER_BREAK_MS, LEADER_FREQUENCY, LEADER_MS,
    SYNC_FREQUENCY, VIS_BIT_MS, VIS_ONE_FREQUENCY, VIS_ZERO_FREQUENCY,
};
use crate::spectral::goertzel_power;
use crate::Config;

pub const VIS_DATA_BITS: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisCode(u8);

impl VisCode {
    pub const ROBOT36: Self = Self(0x08);

    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value & 0x80 == 0 {
            Some(Self(value))
        } else {
            None
        }
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn get_bit(&self, bit: u8) -> bool {
        assert!(bit < VIS_DATA_BITS);
        (self.0 >> bit) & 1 != 0
    }

    /// Even parity: set when the code has an odd number of one bits.
    #[inline]
    pub fn parity(&self) -> bool {
        self.0.count_ones() % 2 == 1
    }

    /// Data bits, least significant first.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..VIS_DATA_BITS).map(move |bit| self.get_bit(bit))
    }
}

fn bit_tone(bit: bool) -> Tone {
    Tone::new(
        if bit { VIS_ONE_FREQUENCY } else { VIS_ZERO_FREQUENCY },
        VIS_BIT_MS,
    )
}

/// Leader, break, leader, then start bit, data bits, parity and stop bit.
pub fn header_tones(code: VisCode) -> Vec<Tone> {
    let mut tones = vec![
        Tone::new(LEADER_FREQUENCY, LEADER_MS),
        Tone::new(SYNC_FREQUENCY, LEADER_BREAK_MS),
        Tone::new(LEADER_FREQUENCY, LEADER_MS),
        Tone::new(SYNC_FREQUENCY, VIS_BIT_MS),
    ];
    tones.extend(code.bits().map(bit_tone));
    tones.push(bit_tone(code.parity()));
    tones.push(Tone::new(SYNC_FREQUENCY, VIS_BIT_MS));
    tones
}

/// A calibration header found in a captured signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisHeader {
    /// First sample of the leader break.
    pub break_start: usize,
    /// First sample after the stop bit, where line 0 begins.
    pub end: usize,
    /// Decoded mode, `None` when the parity bit disagrees.
    pub code: Option<VisCode>,
}

/// Searches for the leader/break/leader pattern and decodes the VIS code
/// that follows it.
pub fn locate_header(samples: &[f32], config: &Config) -> Option<VisHeader> {
    let rate = config.sample_rate;
    let window = config.sync_window;
    let stride = config.sync_stride.max(1);
    let leader = segment_samples(LEADER_MS, rate);
    let brk = segment_samples(LEADER_BREAK_MS, rate);
    let bit = segment_samples(VIS_BIT_MS, rate);
    let probe = leader / 2;

    let last = samples.len().checked_sub(brk + leader + 10 * bit)?;
    let dominates = |pos: usize, freq: f32| {
        let power = goertzel_power(samples, pos, window, freq, rate);
        power > config.sync_threshold
            && [SYNC_FREQUENCY, BLACK_FREQUENCY, LEADER_FREQUENCY]
                .iter()
                .filter(|&&other| other != freq)
                .all(|&other| power > goertzel_power(samples, pos, window, other, rate))
    };

    // the middle half of both leaders must be uninterrupted, which line syncs
    // (one every 150 ms) never are
    let span = leader / 4;
    let steady = |center: usize| {
        (center - span..=center + span)
            .step_by((window / 2).max(1))
            .all(|pos| dominates(pos, LEADER_FREQUENCY))
    };

    let candidate = (probe + span..=last).step_by(stride).find(|&i| {
        dominates(i, SYNC_FREQUENCY) && steady(i - probe) && steady(i + brk + probe)
    })?;

    let break_start = rising_edge(samples, candidate, config);
    let vis_start = break_start + brk + leader + bit;
    let end = vis_start + (VIS_DATA_BITS as usize + 2) * bit;

    let bits: Vec<bool> = (0..=VIS_DATA_BITS as usize)
        .map(|n| read_bit(samples, vis_start + n * bit, bit, rate))
        .collect();
    let value = bits[..VIS_DATA_BITS as usize]
        .iter()
        .enumerate()
        .fold(0u8, |acc, (n, &set)| acc | ((set as u8) << n));
    let code = VisCode::new(value).filter(|code| code.parity() == bits[VIS_DATA_BITS as usize]);

    match code {
        Some(code) => log::info!("VIS header at sample {}: code {:#04x}", break_start, code.get()),
        None => log::warn!(
            "VIS header at sample {}: parity mismatch for code {:#04x}",
            break_start,
            value
        ),
    }

    Some(VisHeader {
        break_start,
        end,
        code,
    })
}

/// Pins the break's leading edge down to a few samples: the first window
/// position whose sync power reaches 90% of the plateau, shifted back by the
/// overlap that 90% corresponds to.
fn rising_edge(samples: &[f32], candidate: usize, config: &Config) -> usize {
    let rate = config.sample_rate;
    let window = config.sync_window;
    let stride = config.sync_stride.max(1);
    let power = |pos: usize| goertzel_power(samples, pos, window, SYNC_FREQUENCY, rate);

    let plateau = (candidate..=candidate + 2 * stride)
        .step_by(10)
        .map(power)
        .fold(0.0f32, f32::max);
    let lag = (window as f32 * (1.0 - 0.9f32.sqrt())).round() as usize;

    (candidate.saturating_sub(window + stride)..=candidate + 2 * stride)
        .find(|&pos| power(pos) >= 0.9 * plateau)
        .map_or(candidate, |pos| pos + lag)
}

fn read_bit(samples: &[f32], start: usize, bit_len: usize, rate: u32) -> bool {
    let window = bit_len * 3 / 4;
    let offset = start + bit_len / 8;
    let one = goertzel_power(samples, offset, window, VIS_ONE_FREQUENCY, rate);
    let zero = goertzel_power(samples, offset, window, VIS_ZERO_FREQUENCY, rate);
    one > zero
}
