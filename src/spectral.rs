//! Frequency estimators used by the decoder.
//!
//! Both are pure functions over a read-only sample slice, so they can be
//! evaluated for many windows in parallel.

use crate::protocol::{BLACK_FREQUENCY, WHITE_FREQUENCY};
use std::f32::consts::PI;

pub const MIN_PITCH_WINDOW: usize = 60;
pub const MAX_PITCH_WINDOW: usize = 200;

/// Single-bin Goertzel power of `samples[start..start + window]` at
/// `target_freq`, normalized by `window²`.
///
/// A window that does not fit inside the signal yields zero power.
pub fn goertzel_power(
    samples: &[f32],
    start: usize,
    window: usize,
    target_freq: f32,
    sample_rate: u32,
) -> f32 {
    if window == 0 || start.checked_add(window).map_or(true, |end| end > samples.len()) {
        return 0.0;
    }

    let n = window as f32;
    let k = (n * target_freq / sample_rate as f32).round();
    let omega = 2.0 * PI * k / n;
    let cosine = omega.cos();
    let sine = omega.sin();
    let coeff = 2.0 * cosine;

    let mut q1 = 0.0f32;
    let mut q2 = 0.0f32;

    for &sample in &samples[start..start + window] {
        let q0 = coeff * q1 - q2 + sample;
        q2 = q1;
        q1 = q0;
    }

    let real = q1 - q2 * cosine;
    let imag = q2 * sine;

    (real * real + imag * imag) / (n * n)
}

/// Estimates the dominant tone around `center` by normalized autocorrelation.
///
/// The result is always inside the black..white subcarrier band. Windows
/// reaching outside the signal report black.
pub fn detect_frequency(samples: &[f32], center: usize, window_hint: usize, sample_rate: u32) -> f32 {
    let size = window_hint.clamp(MIN_PITCH_WINDOW, MAX_PITCH_WINDOW);
    let Some(start) = center.checked_sub(size / 2) else {
        return BLACK_FREQUENCY;
    };
    if start + size >= samples.len() {
        return BLACK_FREQUENCY;
    }
    let window = &samples[start..start + size];

    let rate = sample_rate as f32;
    let min_lag = ((rate / WHITE_FREQUENCY).floor() as usize).saturating_sub(2).max(1);
    let max_lag = (rate / BLACK_FREQUENCY).floor() as usize + 2;

    let mut best_lag = min_lag;
    let mut best_corr = f32::NEG_INFINITY;

    for lag in (min_lag..=max_lag).take_while(|&lag| 2 * lag < size) {
        let mut corr = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (&a, &b) in window.iter().zip(&window[lag..]) {
            corr += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        if norm_a > 0.0 && norm_b > 0.0 {
            corr /= (norm_a * norm_b).sqrt();
        }

        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    (rate / best_lag as f32).clamp(BLACK_FREQUENCY, WHITE_FREQUENCY)
}

/// Maps a subcarrier frequency onto a 0..=255 intensity.
pub fn frequency_to_intensity(freq: f32) -> u8 {
    if freq <= BLACK_FREQUENCY {
        0
    } else if freq >= WHITE_FREQUENCY {
        255
    } else {
        ((freq - BLACK_FREQUENCY) / (WHITE_FREQUENCY - BLACK_FREQUENCY) * 255.0).round() as u8
    }
}

/// Maps a 0..=255 intensity onto the subcarrier band.
pub fn intensity_to_frequency(value: f32) -> f32 {
    BLACK_FREQUENCY + value / 255.0 * (WHITE_FREQUENCY - BLACK_FREQUENCY)
}
