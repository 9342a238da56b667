/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A signed 16-bit DAC voice.
//!
//! The emulated DAC register holds a piecewise-constant level. Writes to the register are queued
//! together with their emulated timestamps and are converted to band-limited steps only when the
//! mixer asks for the audio covering their time.
use core::fmt;
use std::collections::VecDeque;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use emusound_core::{
    audio::SoundDevice,
    clock::{EmuTime, EmuDuration, MAIN_CLOCK_HZ},
    error::{SoundError, SoundResult}
};
use crate::synth::{BlipBuffer, BandLimOpt, BandLimWide};

/// A single timestamped DAC register write.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimedWrite {
    pub time: EmuTime,
    pub value: i16,
}

/// Reconstructs the audio signal of a 16-bit signed DAC from its timed register writes.
pub struct DacVoice<O=BandLimWide> {
    name: String,
    queue: VecDeque<TimedWrite>,
    blip: BlipBuffer<O>,
    last_value: i16,
    last_write_time: EmuTime,
    output_rate: u32,
    sample_duration: EmuDuration,
}

impl<O> fmt::Debug for DacVoice<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DacVoice")
         .field("name", &self.name)
         .field("pending", &self.queue.len())
         .field("last_value", &self.last_value)
         .field("output_rate", &self.output_rate)
         .finish_non_exhaustive()
    }
}

impl<O: BandLimOpt> DacVoice<O> {
    /// Creates a new silent voice rendering audio at `output_rate` samples per second.
    ///
    /// # Panics
    /// Panics if `output_rate` is `0`.
    pub fn new<S: Into<String>>(name: S, output_rate: u32) -> Self {
        DacVoice {
            name: name.into(),
            queue: VecDeque::new(),
            blip: BlipBuffer::new(),
            last_value: 0,
            last_write_time: EmuTime::ZERO,
            output_rate,
            sample_duration: EmuDuration::from_hz(MAIN_CLOCK_HZ, output_rate),
        }
    }
}

impl<O> DacVoice<O> {
    /// Drops all pending writes and silences the voice.
    ///
    /// `time` becomes the earliest timestamp accepted by [DacVoice::write].
    pub fn reset(&mut self, time: EmuTime) {
        self.queue.clear();
        self.blip.clear();
        self.last_value = 0;
        self.last_write_time = time;
    }
    /// Queues a DAC register write at the given emulated `time`.
    ///
    /// Writes must be issued in a chronological order.
    ///
    /// # Panics
    /// In debug builds panics if `time` is earlier than the time of the previous write. Release
    /// builds log the violation and queue the write at the time of the previous one.
    pub fn write(&mut self, value: i16, time: EmuTime) {
        if let Err(err) = self.checked_write(value, time) {
            if cfg!(debug_assertions) {
                panic!("{}: {}", self.name, err);
            }
            error!("{}: {}", self.name, err);
            self.queue.push_back(TimedWrite { time: self.last_write_time, value });
        }
    }
    /// Queues a DAC register write at the given emulated `time`.
    ///
    /// Returns an error with [TimingViolation][emusound_core::error::SoundErrorKind::TimingViolation]
    /// if `time` is earlier than the time of the previous write. The write is discarded in this instance.
    pub fn checked_write(&mut self, value: i16, time: EmuTime) -> SoundResult<()> {
        if time < self.last_write_time {
            return Err(SoundError::timing_violation(
                format!("DAC write at {:?} precedes the previous write at {:?}",
                        time, self.last_write_time)))
        }
        self.last_write_time = time;
        self.queue.push_back(TimedWrite { time, value });
        Ok(())
    }
    /// Returns the most recently applied DAC level.
    #[inline]
    pub fn last_value(&self) -> i16 {
        self.last_value
    }
    /// Returns the number of queued writes that were not yet rendered.
    #[inline]
    pub fn pending_writes(&self) -> usize {
        self.queue.len()
    }
    /// Returns an iterator over the queued writes in chronological order.
    pub fn pending(&self) -> impl Iterator<Item=&TimedWrite> + ExactSizeIterator {
        self.queue.iter()
    }
    #[inline]
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
    /// Returns the nominal duration of a single output sample at the current output rate.
    #[inline]
    pub fn sample_duration(&self) -> EmuDuration {
        self.sample_duration
    }
    /// Converts writes timestamped before `end` to band-limited steps.
    ///
    /// Returns `true` if any non-zero step has been applied.
    fn drain_writes(&mut self, length: usize, start: EmuTime, sample_duration: EmuDuration) -> bool {
        let end = start + sample_duration * length as u64;
        let mut applied = false;
        while let Some(&TimedWrite { time, value }) = self.queue.front() {
            if time >= end {
                break
            }
            self.queue.pop_front();
            let (index, fract) = match time.checked_duration_since(start) {
                Some(offset) => {
                    let (index, rem) = offset.div_rem(sample_duration);
                    (index as usize, rem.div_duration(sample_duration))
                }
                // a late write, render it as soon as possible
                None => (0, 0.0)
            };
            let (index, fract) = if index < length {
                (index, fract)
            }
            else {
                (length - 1, 0.0)
            };
            let delta = value as i32 - self.last_value as i32;
            trace!("{}: {} -> {} at {}+{:.3}", self.name, self.last_value, value, index, fract);
            if delta != 0 {
                self.blip.add_delta_at(index, fract, delta);
                applied = true;
            }
            self.last_value = value;
        }
        applied
    }
}

impl<O> SoundDevice for DacVoice<O> {
    fn name(&self) -> &str {
        &self.name
    }
    /// Changes the output sample rate.
    ///
    /// Queued writes keep their timestamps and the already buffered steps are left intact, so
    /// the next rendered buffer continues the signal without a discontinuity.
    fn set_output_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 {
            warn!("{}: ignoring output rate 0", self.name);
            return
        }
        debug!("{}: output rate {} -> {}", self.name, self.output_rate, sample_rate);
        self.output_rate = sample_rate;
        self.sample_duration = EmuDuration::from_hz(MAIN_CLOCK_HZ, sample_rate);
    }
    /// Renders the DAC output into `buffer`.
    ///
    /// The output lags behind the writes by [LATENCY][crate::synth::LATENCY] samples: a write
    /// timestamped at the sample `n` of the window reaches half of its amplitude at the sample
    /// `n + LATENCY - 1` and settles completely after `n + 2 * LATENCY`.
    ///
    /// Writes timestamped at or after the end of the covered window are left in the queue for
    /// the next call.
    fn update_buffer(&mut self, buffer: &mut [i32], start: EmuTime, sample_duration: EmuDuration) -> bool {
        if buffer.is_empty() {
            return self.last_value != 0
        }
        let sample_duration = if sample_duration.is_zero() {
            self.sample_duration
        }
        else {
            sample_duration
        };
        let applied = self.drain_writes(buffer.len(), start, sample_duration);
        let produced = self.blip.read_samples(buffer);
        applied || produced || self.last_value != 0
    }
}
