/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Hard sync without aliasing.
//!
//! The step table generator follows the Blip_Buffer library described on [this web site](http://www.slack.net/~ant/bl-synth).
//!
//! [BlipBuffer] accumulates amplitude steps placed at fractional sample positions and yields
//! a band-limited, integrated signal. Contrary to the frame based designs, the buffer has no
//! notion of a frame: every call to [BlipBuffer::read_samples] consumes exactly as many samples
//! as requested and carries the not yet consumed step tails forward. Thanks to this, splitting
//! one read into several smaller ones (with the steps placed at the same absolute positions)
//! produces an identical output.
use core::fmt;
use core::marker::PhantomData;
use std::collections::VecDeque;

const PI2: f64 = core::f64::consts::PI * 2.0;
/// A number of phase offsets to sample band-limited step at
const PHASE_COUNT: usize = 32;
/// A number of samples in each final band-limited step
const STEP_WIDTH: usize = 24;
/// The fixed-point precision of the step table
const STEP_BITS: u32 = 15;
const STEP_UNIT: i64 = 1 << STEP_BITS;
/// The number of samples the synthesized output lags behind the step positions.
pub const LATENCY: usize = STEP_WIDTH / 2;

/// A trait for implementing low-pass frequency filter limits for [BlipBuffer].
pub trait BandLimOpt {
    /// lower values filter more high frequency
    const LOW_PASS: f64 = 0.999;
}

/// A wide pass filter limits for [BlipBuffer].
#[derive(Debug)]
pub struct BandLimWide;
impl BandLimOpt for BandLimWide {}

/// A low-frequency pass filter limits for [BlipBuffer].
#[derive(Debug)]
pub struct BandLimLowTreb;
impl BandLimOpt for BandLimLowTreb {
    const LOW_PASS: f64 = 0.899;
}

/// Bandwidth-Limited Pulse Buffer with integer amplitudes.
///
/// Each added step is spread over `STEP_WIDTH` samples using a precomputed table of band-limited
/// steps, sampled at `PHASE_COUNT` sub-sample phases. Table entries of every phase sum to
/// exactly one fixed-point unit, so a step settles at exactly its amplitude: a buffer that
/// receives no steps produces exact silence and the output of a settled signal equals the sum of
/// all applied amplitudes.
pub struct BlipBuffer<O=BandLimWide> {
    steps: [[i32; STEP_WIDTH]; PHASE_COUNT],
    diffs: VecDeque<i64>,
    sum: i64,
    _options: PhantomData<O>
}

impl<O> fmt::Debug for BlipBuffer<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlipBuffer")
         .field("pending", &self.diffs.len())
         .field("sum", &(self.sum >> STEP_BITS))
         .finish_non_exhaustive()
    }
}

impl<O: BandLimOpt> Default for BlipBuffer<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: BandLimOpt> BlipBuffer<O> {
    /// Returns a new instance of `BlipBuffer`.
    pub fn new() -> Self {
        // Generate master band-limited step by adding sine components of a square wave
        let mut steps = [[0i32;STEP_WIDTH];PHASE_COUNT];
        const MASTER_SIZE: usize = STEP_WIDTH * PHASE_COUNT;
        let mut master = [0.5f64;MASTER_SIZE];
        let mut gain: f64 = 0.5 / 0.777; // adjust normal square wave's amplitude of ~0.777 to 0.5
        const SINE_SIZE: usize = 256 * PHASE_COUNT + 2;
        let max_harmonic: usize = SINE_SIZE / 2 / PHASE_COUNT;
        for h in (1..=max_harmonic).step_by(2) {
            let amplitude: f64 = gain / h as f64;
            let to_angle: f64 = PI2 / SINE_SIZE as f64 * h as f64;
            for (i, m) in master.iter_mut().enumerate() {
                *m += ( (i as isize - MASTER_SIZE as isize / 2) as f64 * to_angle ).sin() * amplitude;
            }
            gain *= O::LOW_PASS;
        }
        // Sample master step at several phases
        for (phase, step) in steps.iter_mut().enumerate() {
            let mut prev: f64 = 0.0;
            let mut total: i64 = 0;
            for (i, s) in step.iter_mut().enumerate() {
                let cur: f64 = master[i * PHASE_COUNT + (PHASE_COUNT - 1 - phase)];
                let delta = ((cur - prev) * STEP_UNIT as f64).round() as i32;
                prev = cur;
                total += delta as i64;
                *s = delta;
            }
            // each step should total exactly one unit
            let error = (STEP_UNIT - total) as i32;
            let half = error / 2;
            step[STEP_WIDTH / 2] += error - half;
            if phase < PHASE_COUNT / 2 {
                step[STEP_WIDTH / 2 - 1] += half;
            }
            else {
                step[STEP_WIDTH / 2 + 1] += half;
            }
        }

        BlipBuffer {
            steps,
            diffs: VecDeque::new(),
            sum: 0,
            _options: PhantomData
        }
    }
}

impl<O> BlipBuffer<O> {
    /// Drops all buffered steps and resets the integrated signal to zero.
    pub fn clear(&mut self) {
        self.diffs.clear();
        self.sum = 0;
    }
    /// Shrinks the excessive capacity of the buffer as much as possible.
    #[inline]
    pub fn shrink_to_fit(&mut self) {
        self.diffs.shrink_to_fit();
    }
    /// Returns `true` if no step tails are pending and the integrated signal is zero.
    pub fn is_silent(&self) -> bool {
        self.sum == 0 && self.diffs.iter().all(|&d| d == 0)
    }
    /// Adds an amplitude step at the fractional sample `offset`, measured from the next sample
    /// to be read.
    ///
    /// Negative offsets are clamped to `0`.
    #[inline]
    pub fn add_delta(&mut self, offset: f64, amplitude: i32) {
        let offset = offset.max(0.0);
        self.add_delta_at(offset.trunc() as usize, offset.fract(), amplitude)
    }
    /// Adds an amplitude step at sample `index` (measured from the next sample to be read)
    /// shifted by the fraction of a sample `fract` which should be in the range `[0.0, 1.0)`.
    pub fn add_delta_at(&mut self, index: usize, fract: f64, amplitude: i32) {
        if amplitude == 0 {
            return
        }
        let phase = ((fract * PHASE_COUNT as f64) as usize).min(PHASE_COUNT - 1);
        let end = index + STEP_WIDTH;
        if self.diffs.len() < end {
            self.diffs.resize(end, 0);
        }
        let amplitude = amplitude as i64;
        for (dp, &step) in self.diffs.range_mut(index..end)
                                     .zip(self.steps[phase].iter()) {
            *dp += step as i64 * amplitude;
        }
    }
    /// Renders `output.len()` samples and advances the read position by the same amount.
    ///
    /// Returns `true` if any of the rendered samples is non-zero.
    pub fn read_samples(&mut self, output: &mut [i32]) -> bool {
        let mut sum = self.sum;
        let mut nonzero = false;
        for p in output.iter_mut() {
            sum += self.diffs.pop_front().unwrap_or(0);
            let sample = (sum + STEP_UNIT / 2) >> STEP_BITS;
            let sample = sample.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
            nonzero |= sample != 0;
            *p = sample;
        }
        self.sum = sum;
        nonzero
    }
}
