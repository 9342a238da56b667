/*
    Copyright (C) 2020-2022  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! # Audio API.
mod sample;

use crate::clock::{EmuTime, EmuDuration};
pub use sample::{
    AudioSample,
    FromSample,
    IntoSample,
    pcm_u8_to_i16,
    pcm_i16_le
};

/// A trait for sound generating devices being polled by the mixer.
///
/// The mixer periodically requests a fixed number of samples covering a window of the emulated
/// time from every registered device. Devices render their output as signed 32-bit samples in the
/// 16-bit amplitude scale, so several devices can be summed without overflow.
///
/// The mixer is agnostic to the concrete kind of a device: a DAC voice reconstructing timed
/// register writes, a PCM sample player or any other generator.
pub trait SoundDevice {
    /// Returns the device name, used for diagnostics.
    fn name(&self) -> &str;
    /// Changes the host sample rate.
    ///
    /// Any state that depends on the sample rate should be recomputed without introducing
    /// discontinuities in the already buffered audio.
    fn set_output_rate(&mut self, sample_rate: u32);
    /// Fills the whole `buffer` with audio samples.
    ///
    /// Each sample `i` covers the emulated time window:
    /// `[start + i * sample_duration, start + (i + 1) * sample_duration)`.
    ///
    /// Consecutive calls must cover contiguous windows.
    ///
    /// A device may delay its output by a constant number of samples. Band-limited devices
    /// center each amplitude step on its timestamp and need the samples following it to shape
    /// the step, so the change becomes audible that many samples later: e.g. a DAC voice lags
    /// by 12 samples. The delay is the same for every buffer split, so devices stay in sync.
    ///
    /// Returns `true` if the produced samples are not all silent. The mixer may skip summing
    /// the buffer when `false` is returned.
    fn update_buffer(&mut self, buffer: &mut [i32], start: EmuTime, sample_duration: EmuDuration) -> bool;
}

impl<D: SoundDevice + ?Sized> SoundDevice for &mut D {
    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }
    #[inline]
    fn set_output_rate(&mut self, sample_rate: u32) {
        (**self).set_output_rate(sample_rate)
    }
    #[inline]
    fn update_buffer(&mut self, buffer: &mut [i32], start: EmuTime, sample_duration: EmuDuration) -> bool {
        (**self).update_buffer(buffer, start, sample_duration)
    }
}

impl<D: SoundDevice + ?Sized> SoundDevice for Box<D> {
    #[inline]
    fn name(&self) -> &str {
        (**self).name()
    }
    #[inline]
    fn set_output_rate(&mut self, sample_rate: u32) {
        (**self).set_output_rate(sample_rate)
    }
    #[inline]
    fn update_buffer(&mut self, buffer: &mut [i32], start: EmuTime, sample_duration: EmuDuration) -> bool {
        (**self).update_buffer(buffer, start, sample_duration)
    }
}

/// Fills `buffer` with silence.
#[inline]
pub fn fill_silence<T: AudioSample>(buffer: &mut [T]) {
    for p in buffer.iter_mut() {
        *p = T::silence();
    }
}
