/*
    Copyright (C) 2020-2023  Rafal Michalski

    This file is part of EMUSOUND, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! A fixed-ratio PCM sample player.
//!
//! Plays back pre-recorded 8-bit unsigned or 16-bit signed PCM data, resampled to the output
//! rate with the nearest-neighbour method. The playback position is kept as an exact rational
//! number: an integer source sample index and a remainder measured in `1/output_rate` units,
//! so long playback never drifts from the `input_frequency / output_rate` ratio.
use core::fmt;

#[allow(unused_imports)]
use log::{error, warn, info, debug, trace};

use emusound_core::{
    audio::{SoundDevice, pcm_u8_to_i16, pcm_i16_le},
    clock::{EmuTime, EmuDuration},
    error::{SoundError, SoundResult}
};

/// The Q15 fixed-point unity volume.
pub const VOLUME_UNITY: i32 = 1 << 15;

/// Supported PCM sample formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PcmFormat {
    /// Unsigned 8-bit samples with `0x80` as the zero point.
    U8,
    /// Signed 16-bit little-endian samples.
    I16Le,
}

impl PcmFormat {
    /// Returns the format for the given bit depth.
    pub fn from_bits(bits: u32) -> SoundResult<Self> {
        match bits {
            8 => Ok(PcmFormat::U8),
            16 => Ok(PcmFormat::I16Le),
            bits => Err(SoundError::unsupported_format(
                        format!("unsupported PCM bit depth: {}, should be 8 or 16", bits)))
        }
    }
    /// Returns the size of a single sample in bytes.
    #[inline]
    pub fn sample_size(self) -> usize {
        match self {
            PcmFormat::U8 => 1,
            PcmFormat::I16Le => 2,
        }
    }
    /// Decodes the sample at `index` from `source` into a centered 16-bit sample.
    #[inline]
    fn decode(self, source: &[u8], index: usize) -> Option<i16> {
        match self {
            PcmFormat::U8 => source.get(index).copied().map(pcm_u8_to_i16),
            PcmFormat::I16Le => {
                let offset = index * 2;
                source.get(offset..offset + 2).map(|s| pcm_i16_le(s[0], s[1]))
            }
        }
    }
}

fn check_source(source: &[u8], sample_count: usize, bits: u32, input_frequency: u32) -> SoundResult<PcmFormat> {
    let format = PcmFormat::from_bits(bits)?;
    if input_frequency == 0 {
        return Err(SoundError::invalid_argument("PCM input frequency must not be 0"))
    }
    if sample_count == 0 {
        return Err(SoundError::invalid_argument("PCM sample count must not be 0"))
    }
    if sample_count.checked_mul(format.sample_size()).map_or(true, |size| size > source.len()) {
        return Err(SoundError::invalid_argument(
            format!("PCM source of {} bytes is too short for {} samples of {} bits",
                    source.len(), sample_count, bits)))
    }
    Ok(format)
}

/// A rational playback position (or a step): `index + frac / output_rate` source samples.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
struct Phase {
    index: usize,
    frac: u64,
}

impl Phase {
    /// Returns `input_frequency / output_rate` as an exact phase step.
    fn ratio(input_frequency: u32, output_rate: u32) -> Self {
        let (input_frequency, output_rate) = (u64::from(input_frequency), u64::from(output_rate));
        Phase {
            index: (input_frequency / output_rate) as usize,
            frac: input_frequency % output_rate
        }
    }
    #[inline]
    fn advance(&mut self, step: Phase, output_rate: u32) {
        self.frac += step.frac;
        if self.frac >= u64::from(output_rate) {
            self.frac -= u64::from(output_rate);
            self.index += 1;
        }
        self.index = self.index.saturating_add(step.index);
    }
}

/// Plays a borrowed PCM sample buffer at a fixed resampling ratio.
pub struct SamplePlayer<'a> {
    name: String,
    source: &'a [u8],
    format: PcmFormat,
    input_frequency: u32,
    output_rate: u32,
    step: Phase,
    position: Phase,
    end: usize,
    volume: i32,
    playing: bool,
}

impl fmt::Debug for SamplePlayer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplePlayer")
         .field("name", &self.name)
         .field("format", &self.format)
         .field("input_frequency", &self.input_frequency)
         .field("output_rate", &self.output_rate)
         .field("position", &self.position.index)
         .field("end", &self.end)
         .field("playing", &self.playing)
         .finish_non_exhaustive()
    }
}

impl<'a> SamplePlayer<'a> {
    /// Creates an idle player rendering audio at `output_rate` samples per second.
    ///
    /// # Panics
    /// Panics if `output_rate` is `0`.
    pub fn new<S: Into<String>>(name: S, output_rate: u32) -> Self {
        assert!(output_rate != 0, "SamplePlayer: output rate must not be 0");
        SamplePlayer {
            name: name.into(),
            source: &[],
            format: PcmFormat::U8,
            input_frequency: output_rate,
            output_rate,
            step: Phase { index: 1, frac: 0 },
            position: Phase::default(),
            end: 0,
            volume: VOLUME_UNITY,
            playing: false,
        }
    }
    /// Stops playback.
    pub fn reset(&mut self) {
        self.playing = false;
        self.position = Phase::default();
    }
    /// Starts playback of `sample_count` samples from `source`, replacing any current playback.
    ///
    /// * `bits` must be `8` (unsigned samples) or `16` (signed little-endian samples).
    /// * `input_frequency` is the sample rate of the `source` data.
    ///
    /// The `source` stays borrowed until the player is dropped or another source is played.
    pub fn play(&mut self, source: &'a [u8], sample_count: usize, bits: u32, input_frequency: u32) -> SoundResult<()> {
        let format = check_source(source, sample_count, bits, input_frequency).map_err(|err| {
            warn!("{}: {}", self.name, err);
            err
        })?;
        debug!("{}: play {} samples, {} bits at {} Hz", self.name, sample_count, bits, input_frequency);
        self.source = source;
        self.format = format;
        self.input_frequency = input_frequency;
        self.end = sample_count;
        self.step = Phase::ratio(input_frequency, self.output_rate);
        self.position = Phase::default();
        self.playing = true;
        Ok(())
    }
    /// Returns `true` if the sample is still being played.
    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }
    /// Sets the volume of the samples rendered from now on.
    ///
    /// `level` is clamped to the range `[0.0, 1.0]`.
    pub fn set_volume(&mut self, level: f32) {
        let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) };
        self.volume = (level * VOLUME_UNITY as f32).round() as i32;
    }
    /// Returns the volume as a Q15 fixed-point factor.
    #[inline]
    pub fn volume(&self) -> i32 {
        self.volume
    }
    /// Changes the output sample rate.
    ///
    /// The playback position is kept, only the playback speed of the remaining samples changes.
    ///
    /// # Panics
    /// Panics if `output_rate` is `0`.
    pub fn set_sample_rate(&mut self, output_rate: u32) {
        assert!(output_rate != 0, "SamplePlayer: output rate must not be 0");
        // frac < old rate, both rates fit in u32, so the product fits in u64
        self.position.frac = self.position.frac * u64::from(output_rate) / u64::from(self.output_rate);
        self.output_rate = output_rate;
        self.step = Phase::ratio(self.input_frequency, output_rate);
    }
    /// Returns the index of the next source sample to be played.
    #[inline]
    pub fn position(&self) -> usize {
        self.position.index
    }
    #[inline]
    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
    /// Renders samples into `buffer` returning `true` if any of them is not silent.
    fn render(&mut self, buffer: &mut [i32]) -> bool {
        let mut nonsilent = false;
        let mut slots = buffer.iter_mut();
        while self.playing {
            let p = match slots.next() {
                Some(p) => p,
                None => break
            };
            let sample = match self.format.decode(self.source, self.position.index) {
                Some(sample) => (sample as i32 * self.volume) >> 15,
                None => {
                    error!("{}: read past the source at {}", self.name, self.position.index);
                    self.playing = false;
                    *p = 0;
                    break
                }
            };
            nonsilent |= sample != 0;
            *p = sample;
            self.position.advance(self.step, self.output_rate);
            if self.position.index >= self.end {
                trace!("{}: finished", self.name);
                self.playing = false;
            }
        }
        for p in slots {
            *p = 0;
        }
        nonsilent
    }
}

impl SoundDevice for SamplePlayer<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_output_rate(&mut self, sample_rate: u32) {
        if sample_rate == 0 {
            warn!("{}: ignoring output rate 0", self.name);
            return
        }
        debug!("{}: output rate {} -> {}", self.name, self.output_rate, sample_rate);
        self.set_sample_rate(sample_rate)
    }
    /// The player is not clocked by the emulation, so the time window is ignored.
    fn update_buffer(&mut self, buffer: &mut [i32], _start: EmuTime, _sample_duration: EmuDuration) -> bool {
        self.render(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emusound_core::error::SoundErrorKind;

    fn update(player: &mut SamplePlayer<'_>, len: usize) -> (Vec<i32>, bool) {
        let mut buf = vec![i32::MIN; len];
        let res = player.update_buffer(&mut buf, EmuTime::ZERO, EmuDuration::from_ticks(649));
        (buf, res)
    }

    #[test]
    fn plays_8bit_centered() {
        let source = [0u8, 64, 128, 255];
        let mut player = SamplePlayer::new("pcm", 44100);
        player.set_volume(1.0);
        player.play(&source, 4, 8, 44100).unwrap();
        assert!(player.is_playing());
        let (buf, res) = update(&mut player, 8);
        assert!(res);
        assert_eq!(buf, vec![-32768, -16384, 0, 32512, 0, 0, 0, 0]);
        assert!(!player.is_playing());
        let (buf, res) = update(&mut player, 8);
        assert!(!res);
        assert!(buf.iter().all(|&s| s == 0));
    }

    #[test]
    fn plays_16bit_native() {
        let source = [0xFFu8, 0x7F, 0x00, 0x80, 0x00, 0x00];
        let mut player = SamplePlayer::new("pcm", 22050);
        player.play(&source, 3, 16, 22050).unwrap();
        let (buf, res) = update(&mut player, 4);
        assert!(res);
        assert_eq!(buf, vec![32767, -32768, 0, 0]);
        assert!(!player.is_playing());
    }

    #[test]
    fn silent_samples_report_silence() {
        let source = [0x80u8; 16];
        let mut player = SamplePlayer::new("pcm", 8000);
        player.play(&source, 16, 8, 8000).unwrap();
        let (buf, res) = update(&mut player, 8);
        assert!(!res);
        assert!(buf.iter().all(|&s| s == 0));
        assert!(player.is_playing());
    }

    #[test]
    fn rejects_invalid_playback() {
        let source = [0u8; 8];
        let mut player = SamplePlayer::new("pcm", 44100);
        let err = player.play(&source, 8, 12, 8000).unwrap_err();
        assert_eq!(err.kind(), SoundErrorKind::UnsupportedFormat);
        let err = player.play(&source, 8, 8, 0).unwrap_err();
        assert_eq!(err.kind(), SoundErrorKind::InvalidArgument);
        let err = player.play(&source, 0, 8, 8000).unwrap_err();
        assert_eq!(err.kind(), SoundErrorKind::InvalidArgument);
        let err = player.play(&source, 5, 16, 8000).unwrap_err();
        assert_eq!(err.kind(), SoundErrorKind::InvalidArgument);
        assert!(!player.is_playing());
        player.play(&source, 4, 16, 8000).unwrap();
        assert!(player.is_playing());
    }

    fn count_played(sample_count: usize, input_frequency: u32, output_rate: u32) -> usize {
        let source = vec![0xC0u8; sample_count];
        let mut player = SamplePlayer::new("pcm", output_rate);
        player.play(&source, sample_count, 8, input_frequency).unwrap();
        let mut produced = 0;
        while player.is_playing() {
            let (buf, _) = update(&mut player, 1);
            assert_eq!(buf[0], 0x40 << 8);
            produced += 1;
        }
        produced
    }

    #[test]
    fn playback_length_follows_ratio() {
        assert_eq!(count_played(1000, 11025, 44100), 4000);
        assert_eq!(count_played(1000, 44100, 44100), 1000);
        assert_eq!(count_played(1000, 44100, 22050), 500);
        let expected = 100.0 * 44100.0 / 8000.0;
        let played = count_played(100, 8000, 44100) as f64;
        assert!((played - expected).abs() <= 1.0);
        let expected = 777.0 * 48000.0 / 44100.0;
        let played = count_played(777, 44100, 48000) as f64;
        assert!((played - expected).abs() <= 1.0);
    }

    #[test]
    fn position_does_not_drift() {
        let source = vec![0x80u8; 500_000];
        let mut player = SamplePlayer::new("pcm", 48000);
        player.play(&source, source.len(), 8, 44100).unwrap();
        let mut buf = vec![0; 4800];
        for _ in 0..100 {
            player.update_buffer(&mut buf, EmuTime::ZERO, EmuDuration::ZERO);
        }
        assert_eq!(player.position(), 441_000);
        assert!(player.is_playing());
    }

    #[test]
    fn volume_scales_later_samples() {
        let source: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
        let mut player = SamplePlayer::new("pcm", 8000);
        player.play(&source, 64, 8, 8000).unwrap();
        let (full, _) = update(&mut player, 64);

        for &level in [0.5f32, 0.25, 0.0].iter() {
            player.play(&source, 64, 8, 8000).unwrap();
            player.set_volume(level);
            let (scaled, _) = update(&mut player, 64);
            for (&f, &s) in full.iter().zip(scaled.iter()) {
                assert_eq!(s as f32, f as f32 * level);
            }
            player.set_volume(1.0);
        }

        player.play(&source, 64, 8, 8000).unwrap();
        let (first, _) = update(&mut player, 32);
        player.set_volume(0.5);
        let (second, _) = update(&mut player, 32);
        assert_eq!(&first[..], &full[..32]);
        for (&f, &s) in full[32..].iter().zip(second.iter()) {
            assert_eq!(s, f / 2);
        }
    }

    #[test]
    fn volume_is_clamped() {
        let mut player = SamplePlayer::new("pcm", 8000);
        player.set_volume(2.0);
        assert_eq!(player.volume(), VOLUME_UNITY);
        player.set_volume(-1.0);
        assert_eq!(player.volume(), 0);
        player.set_volume(f32::NAN);
        assert_eq!(player.volume(), 0);
    }

    #[test]
    fn rate_change_keeps_position() {
        let source: Vec<u8> = (0..16).map(|i| 0x80 + i as u8).collect();
        let mut player = SamplePlayer::new("pcm", 1000);
        player.play(&source, 16, 8, 1000).unwrap();
        let (buf, _) = update(&mut player, 3);
        assert_eq!(buf, vec![0, 256, 512]);
        assert_eq!(player.position(), 3);
        player.set_output_rate(2000);
        assert_eq!(player.position(), 3);
        let (buf, _) = update(&mut player, 6);
        assert_eq!(buf, vec![768, 768, 1024, 1024, 1280, 1280]);
        player.set_output_rate(0);
        assert_eq!(player.output_rate(), 2000);
    }

    #[test]
    fn reset_stops_playback() {
        let source = [0xFFu8; 10];
        let mut player = SamplePlayer::new("pcm", 1000);
        player.play(&source, 10, 8, 1000).unwrap();
        let (_, res) = update(&mut player, 2);
        assert!(res);
        player.reset();
        assert!(!player.is_playing());
        assert_eq!(player.position(), 0);
        let (buf, res) = update(&mut player, 4);
        assert!(!res);
        assert_eq!(buf, vec![0; 4]);
    }
}
